//! Error types for the Cairn wallet core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key bytes")] InvalidSecretKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature encoding")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("public key does not hash to the spent output's key hash")] PubkeyHashMismatch,
    #[error("missing or malformed witness on input {0}")] MalformedWitness(usize),
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid base58: {0}")] Base58(String),
    #[error("invalid length: expected {expected}, got {got}")] InvalidLength { expected: usize, got: usize },
    #[error("unknown version byte: {0:#04x}")] UnknownVersion(u8),
    #[error("invalid compression flag: {0:#04x}")] InvalidCompressionFlag(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("malformed outpoint: {0}")] MalformedOutpoint(String),
    #[error("malformed script: {0}")] MalformedScript(String),
    #[error("script is not pay-to-witness-key-hash")] NotP2wpkh,
    #[error("value overflow")] ValueOverflow,
    #[error("deserialization: {0}")] Deserialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")] Unavailable(String),
    #[error("transaction rejected: {0}")] Rejected(String),
    #[error("malformed ledger response: {0}")] MalformedResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("unknown network: {0}")] UnknownNetwork(String),
}
