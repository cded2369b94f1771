//! Wallet error types.

use cairn_core::error::{CryptoError, EncodingError, LedgerError, TransactionError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Seed length outside the accepted 16..=64 byte range.
    #[error("invalid seed length: {0} bytes (expected 16..=64)")]
    InvalidSeedLength(usize),

    /// HMAC output produced a scalar that is zero or not below the curve order.
    #[error("derived key is invalid for this index")]
    InvalidChildKey,

    /// Hardened derivation attempted from a public-only extended key.
    #[error("hardened derivation requires a private key")]
    HardenedRequiresPrivateKey,

    /// Operation needs private key material but the key is public-only.
    #[error("private key required")]
    PrivateKeyRequired,

    /// Extended key depth would exceed 255.
    #[error("derivation depth exceeded")]
    DepthExceeded,

    /// A step of a derivation path failed.
    #[error("derivation failed at depth {depth}: {source}")]
    Derivation {
        /// 1-based position of the failing step.
        depth: usize,
        #[source]
        source: Box<WalletError>,
    },

    /// Unparseable derivation path string.
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// Encrypted key checksum does not match its payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Decoded encrypted key has the wrong length.
    #[error("decoded length invalid: expected {expected}, got {got}")]
    DecodedLengthInvalid {
        expected: usize,
        got: usize,
    },

    /// Text is not valid base58.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Encrypted key prefix is not one this codec produces.
    #[error("unsupported encrypted key format")]
    UnsupportedFormat,

    /// Insufficient funds to cover the transaction amount.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Available balance in base units.
        have: u64,
        /// Required amount in base units.
        need: u64,
    },

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Builder is missing its recipient or change script.
    #[error("transaction builder incomplete: {0}")]
    BuilderIncomplete(String),

    /// Signing or post-sign verification of an input failed.
    #[error("signature failure on input {index}: {reason}")]
    SignatureFailure { index: usize, reason: String },

    /// UTXO record could not be parsed or is not spendable by this wallet.
    #[error("malformed utxo: {0}")]
    MalformedUtxo(String),

    /// UTXO is locked to a different key than the signing key.
    #[error("utxo {0} is not locked to the signing key")]
    KeyMismatch(String),

    /// No stored key matches the requested script.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Key derivation function or cipher failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Cryptographic error from cairn-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Key encoding error from cairn-core.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Transaction error from cairn-core.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Ledger or broadcast failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
