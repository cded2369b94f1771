//! secp256k1 keys, hashing and segwit v0 input signing.
//!
//! # Signing scheme
//!
//! Inputs spending pay-to-witness-key-hash outputs are signed over the
//! BIP-143 digest with `SIGHASH_ALL`. The digest commits to:
//! - Transaction version and lock_time
//! - All input outpoints and all input sequences
//! - The outpoint, script code, amount and sequence of the input being signed
//! - All outputs
//!
//! Witnesses are excluded, so inputs can be signed independently in any order.
//! The resulting witness stack is `[DER signature || 0x01, compressed pubkey]`.

use ripemd::Ripemd160;
use secp256k1::{ecdsa, Message, SECP256K1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::constants::{COMPRESSED_PUBKEY_LEN, SIGHASH_ALL};
use crate::error::CryptoError;
use crate::script::p2wpkh_script_code;
use crate::traits::InputSigner;
use crate::types::{write_varint, PubkeyHash, Transaction};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// secp256k1 keypair for signing transaction inputs.
///
/// The secret scalar is erased on drop. Debug output shows only the public key.
pub struct KeyPair {
    secret: secp256k1::SecretKey,
}

impl KeyPair {
    /// Generate a random keypair from the thread RNG.
    pub fn generate() -> Self {
        let secret = secp256k1::SecretKey::new(&mut secp256k1::rand::thread_rng());
        Self { secret }
    }

    /// Create a keypair from 32-byte secret scalar.
    ///
    /// Fails if the bytes are zero or not below the curve order.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret =
            secp256k1::SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self { secret })
    }

    /// Raw 32-byte secret. Handle with care.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.secret_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: secp256k1::PublicKey::from_secret_key(SECP256K1, &self.secret),
        }
    }

    /// Sign a 32-byte digest, returning a low-S DER signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Vec<u8> {
        let msg = Message::from_digest(*digest);
        SECP256K1
            .sign_ecdsa(&msg, &self.secret)
            .serialize_der()
            .to_vec()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret,
        }
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl InputSigner for KeyPair {
    fn public_key(&self) -> PublicKey {
        KeyPair::public_key(self)
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
        Ok(KeyPair::sign_digest(self, digest))
    }
}

/// Compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
}

impl PublicKey {
    /// Parse a SEC1-encoded public key (33 or 65 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner =
            secp256k1::PublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { inner })
    }

    /// Compressed 33-byte encoding.
    pub fn to_bytes(&self) -> [u8; COMPRESSED_PUBKEY_LEN] {
        self.inner.serialize()
    }

    /// HASH160 of the compressed encoding.
    pub fn pubkey_hash(&self) -> PubkeyHash {
        PubkeyHash(hash160(&self.to_bytes()))
    }

    /// Verify a DER signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8; 32], der: &[u8]) -> Result<(), CryptoError> {
        let sig = ecdsa::Signature::from_der(der).map_err(|_| CryptoError::InvalidSignature)?;
        let msg = Message::from_digest(*digest);
        SECP256K1
            .verify_ecdsa(&msg, &sig, &self.inner)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    pub fn inner(&self) -> &secp256k1::PublicKey {
        &self.inner
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(inner: secp256k1::PublicKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// BIP-143 signing digest for one input with `SIGHASH_ALL`.
///
/// `script_code` is written with its length prefix; `amount` is the value of
/// the output being spent.
pub fn signing_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
) -> Result<[u8; 32], CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let mut prevouts = Vec::with_capacity(36 * tx.inputs.len());
    let mut sequences = Vec::with_capacity(4 * tx.inputs.len());
    for i in &tx.inputs {
        i.previous_output.write_to(&mut prevouts);
        sequences.extend_from_slice(&i.sequence.to_le_bytes());
    }
    let mut outputs = Vec::with_capacity(34 * tx.outputs.len());
    for o in &tx.outputs {
        o.write_to(&mut outputs);
    }

    let mut data = Vec::with_capacity(156 + script_code.len());
    data.extend_from_slice(&tx.version.to_le_bytes());
    data.extend_from_slice(&sha256d(&prevouts));
    data.extend_from_slice(&sha256d(&sequences));
    input.previous_output.write_to(&mut data);
    write_varint(&mut data, script_code.len() as u64);
    data.extend_from_slice(script_code);
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&input.sequence.to_le_bytes());
    data.extend_from_slice(&sha256d(&outputs));
    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data.extend_from_slice(&(SIGHASH_ALL as u32).to_le_bytes());

    Ok(sha256d(&data))
}

/// Sign a pay-to-witness-key-hash input in place.
///
/// `amount` is the value of the output being spent. Writes the witness
/// stack `[signature || SIGHASH_ALL, pubkey]` into the input.
pub fn sign_transaction_input<S: InputSigner + ?Sized>(
    tx: &mut Transaction,
    input_index: usize,
    amount: u64,
    signer: &S,
) -> Result<(), CryptoError> {
    let pubkey = signer.public_key();
    let script_code = p2wpkh_script_code(&pubkey.pubkey_hash());
    let sighash = signing_hash(tx, input_index, &script_code, amount)?;

    let mut signature = signer.sign_digest(&sighash)?;
    signature.push(SIGHASH_ALL);

    tx.inputs[input_index].witness = vec![signature, pubkey.to_bytes().to_vec()];
    Ok(())
}

/// Verify a pay-to-witness-key-hash input against the spent output's key hash.
///
/// Checks that:
/// 1. The witness holds exactly a signature and a public key
/// 2. The public key hashes to `expected_pubkey_hash`
/// 3. The signature ends in `SIGHASH_ALL` and verifies against the BIP-143 digest
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    amount: u64,
    expected_pubkey_hash: &PubkeyHash,
) -> Result<(), CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let [sig_item, pk_item] = input.witness.as_slice() else {
        return Err(CryptoError::MalformedWitness(input_index));
    };

    let pubkey = PublicKey::from_bytes(pk_item)?;
    if pubkey.pubkey_hash() != *expected_pubkey_hash {
        return Err(CryptoError::PubkeyHashMismatch);
    }

    let Some((&hash_type, der)) = sig_item.split_last() else {
        return Err(CryptoError::InvalidSignature);
    };
    if hash_type != SIGHASH_ALL {
        return Err(CryptoError::InvalidSignature);
    }

    let script_code = p2wpkh_script_code(expected_pubkey_hash);
    let sighash = signing_hash(tx, input_index, &script_code, amount)?;
    pubkey.verify(&sighash, der)
}
