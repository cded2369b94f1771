//! Protocol constants. All monetary values in base units (1 COIN = 10^8 units).

pub const COIN: u64 = 100_000_000;

/// Transaction format version written by the builder.
pub const TX_VERSION: u32 = 1;

/// Input sequence number: final, no relative lock time, no replace-by-fee.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Lock time written by the builder (spendable immediately).
pub const LOCK_TIME_NONE: u32 = 0;

/// Signature hash type committing to all inputs and all outputs.
pub const SIGHASH_ALL: u8 = 0x01;

/// Segwit serialization marker and flag bytes.
pub const SEGWIT_MARKER: u8 = 0x00;
pub const SEGWIT_FLAG: u8 = 0x01;

/// Weight units per non-witness byte.
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// First hardened child index (BIP-32).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// BIP-44 purpose level, always derived hardened.
pub const BIP44_PURPOSE: u32 = 44;

/// Change level of a BIP-44 path for receiving addresses.
pub const EXTERNAL_CHAIN: u32 = 0;

/// Change level of a BIP-44 path for change addresses.
pub const INTERNAL_CHAIN: u32 = 1;

/// Accepted seed length range for master key generation (BIP-32).
pub const MIN_SEED_LEN: usize = 16;
pub const MAX_SEED_LEN: usize = 64;

/// Recommended seed length (BIP-39 output).
pub const RECOMMENDED_SEED_LEN: usize = 64;

/// Length of a serialized compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Length of a HASH160 digest.
pub const HASH160_LEN: usize = 20;
