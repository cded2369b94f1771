//! Trait interfaces for the wallet's external collaborators.
//!
//! - [`LedgerQuery`]: read-only view of the ledger (UTXOs, raw transactions)
//! - [`Broadcaster`]: submits signed transactions
//! - [`InputSigner`]: produces ECDSA signatures over input digests

use crate::crypto::PublicKey;
use crate::error::{CryptoError, LedgerError};
use crate::types::{Txid, UtxoRecord};

/// Read-only access to the ledger, typically a node's RPC endpoint.
pub trait LedgerQuery: Send + Sync {
    /// Unspent outputs locked to `script_pubkey`, in the ledger's order.
    ///
    /// Coin selection preserves this order, so implementations should return
    /// a stable ordering.
    fn list_unspent(&self, script_pubkey: &[u8]) -> Result<Vec<UtxoRecord>, LedgerError>;

    /// Raw serialized transaction by id. Returns `None` if unknown.
    fn raw_transaction(&self, txid: &Txid) -> Result<Option<Vec<u8>>, LedgerError>;
}

/// Submits fully signed transactions to the network.
pub trait Broadcaster: Send + Sync {
    /// Broadcast the serialized transaction, returning the id the ledger reports.
    fn broadcast(&self, raw_tx: &[u8]) -> Result<Txid, LedgerError>;
}

/// Signs BIP-143 digests for a single key.
///
/// Implemented by [`KeyPair`](crate::crypto::KeyPair); external signers
/// (hardware devices, remote key services) can stand in for it.
pub trait InputSigner: Send + Sync {
    fn public_key(&self) -> PublicKey;

    /// DER-encoded ECDSA signature over `digest`, without the sighash byte.
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError>;
}
