//! # cairn-core
//! Foundation types and traits for the Cairn wallet: transactions, scripts,
//! secp256k1 keys, BIP-143 signing and per-network constants.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod network;
pub mod script;
pub mod traits;
pub mod types;
pub mod wif;
