//! Standard output scripts.
//!
//! The wallet only ever pays to and spends from pay-to-witness-key-hash
//! (P2WPKH) outputs. Pay-to-pubkey-hash is kept for recipients and for the
//! BIP-143 script code.

use crate::constants::HASH160_LEN;
use crate::error::TransactionError;
use crate::types::PubkeyHash;

const OP_0: u8 = 0x00;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = HASH160_LEN as u8;

/// Recognised output script templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    P2wpkh(PubkeyHash),
    P2pkh(PubkeyHash),
    Other,
}

/// `OP_0 <20-byte key hash>`.
pub fn p2wpkh_script(pkh: &PubkeyHash) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(OP_0);
    script.push(PUSH_20);
    script.extend_from_slice(pkh.as_bytes());
    script
}

/// `OP_DUP OP_HASH160 <20-byte key hash> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2pkh_script(pkh: &PubkeyHash) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, PUSH_20]);
    script.extend_from_slice(pkh.as_bytes());
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// Script code committed to by the BIP-143 digest of a P2WPKH spend.
///
/// Same bytes as the P2PKH script for the key hash; the length prefix is
/// added by the digest.
pub fn p2wpkh_script_code(pkh: &PubkeyHash) -> Vec<u8> {
    p2pkh_script(pkh)
}

/// Extract the key hash from a P2WPKH output script.
pub fn parse_p2wpkh(script: &[u8]) -> Result<PubkeyHash, TransactionError> {
    match classify(script) {
        ScriptKind::P2wpkh(pkh) => Ok(pkh),
        _ => Err(TransactionError::NotP2wpkh),
    }
}

pub fn classify(script: &[u8]) -> ScriptKind {
    match script {
        [OP_0, PUSH_20, hash @ ..] if hash.len() == HASH160_LEN => {
            ScriptKind::P2wpkh(PubkeyHash(to_hash(hash)))
        }
        [OP_DUP, OP_HASH160, PUSH_20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG]
            if hash.len() == HASH160_LEN =>
        {
            ScriptKind::P2pkh(PubkeyHash(to_hash(hash)))
        }
        _ => ScriptKind::Other,
    }
}

fn to_hash(bytes: &[u8]) -> [u8; HASH160_LEN] {
    let mut out = [0u8; HASH160_LEN];
    out.copy_from_slice(bytes);
    out
}
