//! # cairn-wallet — HD keys, passphrase key codec and segwit spends.
//!
//! Derives spending keys from a seed along the BIP-44 path, protects raw
//! keys at rest under a passphrase, and builds signed P2WPKH transactions
//! against a UTXO ledger supplied through the `cairn-core` traits.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`path`] — child numbers, derivation paths, BIP-44 paths
//! - [`keys`] — Seed, ExtendedKey, BIP-32 derivation, KeyChain
//! - [`mnemonic`] — BIP-39 phrases and phrase → seed
//! - [`encryption`] — scrypt + AES-256 passphrase key codec
//! - [`config`] — `WalletConfig`
//! - [`coin_selection`] — order-preserving greedy selection
//! - [`builder`] — fee, change, sighash and signing
//! - [`wallet`] — High-level wallet composition

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod path;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{build_transaction, BuiltTransaction, Recipient, TransactionBuilder, UnsignedTransaction};
pub use coin_selection::{CoinSelection, CoinSelector};
pub use config::WalletConfig;
pub use encryption::{decrypt, encrypt, KdfParams};
pub use error::WalletError;
pub use keys::{ExtendedKey, KeyChain, Seed};
pub use path::{Bip44Path, ChildNumber, DerivationPath};
pub use wallet::{unlock_key, SendReceipt, Wallet, WalletBalance};
