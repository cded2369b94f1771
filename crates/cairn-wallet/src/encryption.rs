//! Passphrase-protected private key encoding.
//!
//! A 32-byte private key is encrypted under a passphrase with scrypt and two
//! independent AES-256 single-block encryptions, in the layout of BIP-38's
//! non-EC-multiply mode. The salt is taken from RIPEMD-160 of the compressed
//! public key rather than from an address hash. Encoders that salt with
//! SHA-256 of the public key produce different text for the same key; both
//! decode here, since the salt is read back from the payload.
//!
//! # Wire format
//! ```text
//! prefix 01 42 c0 (3) || salt (4) || cipher_half1 (16) || cipher_half2 (16) || checksum (4)
//! ```
//! base58-encoded (43 raw bytes). The checksum is the first four bytes of
//! double SHA-256 over everything before it and does not depend on the
//! passphrase: decrypting with a wrong passphrase succeeds and yields an
//! unrelated key. Callers must check the recovered key against something
//! they already know, such as the expected output script.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use cairn_core::crypto::{sha256d, KeyPair};
use cairn_core::network::Network;
use cairn_core::wif;

use crate::error::WalletError;

/// Format prefix of every encoded key.
const PREFIX: [u8; 3] = [0x01, 0x42, 0xC0];

const SALT_LEN: usize = 4;
const HALF_LEN: usize = 16;
const CHECKSUM_LEN: usize = 4;

/// Payload length before the checksum.
const PAYLOAD_LEN: usize = PREFIX.len() + SALT_LEN + 2 * HALF_LEN;

/// Decoded length of a valid encrypted key.
pub const ENCODED_LEN: usize = PAYLOAD_LEN + CHECKSUM_LEN;

/// scrypt output length: two 32-byte halves.
const DERIVED_LEN: usize = 64;

/// scrypt hardness parameters.
///
/// Not recorded in the encoded text; encryption and decryption must use
/// the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N.
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelisation.
    pub p: u32,
}

impl Default for KdfParams {
    /// N = 16384, r = 8, p = 8.
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 8,
        }
    }
}

impl KdfParams {
    /// Validated parameters.
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self, WalletError> {
        let params = Self { log_n, r, p };
        params.to_scrypt()?;
        Ok(params)
    }

    fn to_scrypt(self) -> Result<scrypt::Params, WalletError> {
        scrypt::Params::new(self.log_n, self.r, self.p, DERIVED_LEN)
            .map_err(|e| WalletError::Encryption(format!("scrypt params: {e}")))
    }
}

/// Run scrypt and split the output into (derived_half1, derived_half2).
fn derive_halves(
    passphrase: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<(Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>), WalletError> {
    let mut derived = Zeroizing::new([0u8; DERIVED_LEN]);
    scrypt::scrypt(
        passphrase.as_bytes(),
        salt,
        &params.to_scrypt()?,
        derived.as_mut_slice(),
    )
    .map_err(|e| WalletError::Encryption(format!("scrypt: {e}")))?;

    let mut half1 = Zeroizing::new([0u8; 32]);
    let mut half2 = Zeroizing::new([0u8; 32]);
    half1.copy_from_slice(&derived[..32]);
    half2.copy_from_slice(&derived[32..]);
    Ok((half1, half2))
}

fn salt_for(raw_key: &[u8; 32]) -> Result<[u8; SALT_LEN], WalletError> {
    let pubkey = KeyPair::from_secret_bytes(raw_key)?.public_key();
    let digest = Ripemd160::digest(pubkey.to_bytes());
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest[..SALT_LEN]);
    Ok(salt)
}

/// Encrypt a raw private key with the default scrypt parameters.
pub fn encrypt(raw_key: &[u8; 32], passphrase: &str) -> Result<String, WalletError> {
    encrypt_with(raw_key, passphrase, &KdfParams::default())
}

/// Encrypt a raw private key with explicit scrypt parameters.
///
/// Fails if `raw_key` is not a valid secp256k1 scalar. Deterministic: the
/// same key, passphrase and parameters always produce the same text.
pub fn encrypt_with(
    raw_key: &[u8; 32],
    passphrase: &str,
    params: &KdfParams,
) -> Result<String, WalletError> {
    let salt = salt_for(raw_key)?;
    encrypt_with_salt(raw_key, passphrase, &salt, params)
}

fn encrypt_with_salt(
    raw_key: &[u8; 32],
    passphrase: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<String, WalletError> {
    let (half1, half2) = derive_halves(passphrase, salt, params)?;
    let cipher = Aes256::new(GenericArray::from_slice(half2.as_slice()));

    let mut payload = Vec::with_capacity(ENCODED_LEN);
    payload.extend_from_slice(&PREFIX);
    payload.extend_from_slice(salt);
    for (key_half, pad) in raw_key.chunks(HALF_LEN).zip(half1.chunks(HALF_LEN)) {
        let mut block = Zeroizing::new([0u8; HALF_LEN]);
        for (b, (k, p)) in block.iter_mut().zip(key_half.iter().zip(pad)) {
            *b = k ^ p;
        }
        let mut block = GenericArray::clone_from_slice(block.as_slice());
        cipher.encrypt_block(&mut block);
        payload.extend_from_slice(&block);
    }

    let checksum = sha256d(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    Ok(bs58::encode(payload).into_string())
}

/// Decrypt to the network's compressed WIF, with the default scrypt parameters.
pub fn decrypt(text: &str, passphrase: &str, network: Network) -> Result<String, WalletError> {
    decrypt_with(text, passphrase, network, &KdfParams::default())
}

/// Decrypt to the network's compressed WIF, with explicit scrypt parameters.
pub fn decrypt_with(
    text: &str,
    passphrase: &str,
    network: Network,
    params: &KdfParams,
) -> Result<String, WalletError> {
    let raw = decrypt_to_key(text, passphrase, params)?;
    Ok(wif::encode(&raw, network))
}

/// Decrypt to the raw 32-byte key.
///
/// Checks run in order: base58 alphabet, decoded length, checksum, prefix.
/// A wrong passphrase is not detected here.
pub fn decrypt_to_key(
    text: &str,
    passphrase: &str,
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let decoded = bs58::decode(text)
        .into_vec()
        .map_err(|e| WalletError::InvalidEncoding(e.to_string()))?;
    if decoded.len() != ENCODED_LEN {
        return Err(WalletError::DecodedLengthInvalid {
            expected: ENCODED_LEN,
            got: decoded.len(),
        });
    }

    let (payload, checksum) = decoded.split_at(PAYLOAD_LEN);
    if sha256d(payload)[..CHECKSUM_LEN] != *checksum {
        return Err(WalletError::ChecksumMismatch);
    }
    if payload[..PREFIX.len()] != PREFIX {
        return Err(WalletError::UnsupportedFormat);
    }

    let salt = &payload[PREFIX.len()..PREFIX.len() + SALT_LEN];
    let ciphertext = &payload[PREFIX.len() + SALT_LEN..];
    let (half1, half2) = derive_halves(passphrase, salt, params)?;
    let cipher = Aes256::new(GenericArray::from_slice(half2.as_slice()));

    let mut raw = Zeroizing::new([0u8; 32]);
    for (i, (chunk, pad)) in ciphertext
        .chunks(HALF_LEN)
        .zip(half1.chunks(HALF_LEN))
        .enumerate()
    {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for (j, (b, p)) in block.iter().zip(pad).enumerate() {
            raw[i * HALF_LEN + j] = b ^ p;
        }
    }
    Ok(raw)
}
