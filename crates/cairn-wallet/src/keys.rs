//! Seed management and BIP-32 hierarchical deterministic key derivation.
//!
//! A [`Seed`] yields a master [`ExtendedKey`] via HMAC-SHA512 keyed with
//! `"Bitcoin seed"`. Children are derived with [`derive_child`], either
//! hardened (private parent only) or normal (private or public parent).
//! [`KeyChain`] wraps the BIP-44 account node and hands out address keys.
//!
//! Invalid intermediate scalars are reported as errors; derivation never
//! skips to the next index.

use hmac::{Hmac, Mac};
use secp256k1::{Scalar, SECP256K1};
use sha2::Sha512;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cairn_core::constants::{
    COMPRESSED_PUBKEY_LEN, EXTERNAL_CHAIN, INTERNAL_CHAIN, MAX_SEED_LEN, MIN_SEED_LEN,
    RECOMMENDED_SEED_LEN,
};
use cairn_core::crypto::{hash160, KeyPair, PublicKey};
use cairn_core::network::Network;
use cairn_core::script::p2wpkh_script;
use cairn_core::types::PubkeyHash;
use cairn_core::wif;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::path::{Bip44Path, ChildNumber, DerivationPath};

type HmacSha512 = Hmac<Sha512>;

/// HMAC key for master key generation.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Serialized extended key length before the base58check checksum.
const EXTENDED_KEY_LEN: usize = 78;

/// Master seed for deterministic key derivation.
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Generate a random 64-byte seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; RECOMMENDED_SEED_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a seed from raw bytes (16 to 64 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        check_seed_len(bytes.len())?;
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Master extended private key for `network`.
    pub fn master_key(&self, network: Network) -> Result<ExtendedKey, WalletError> {
        master_key(&self.bytes, network)
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn check_seed_len(len: usize) -> Result<(), WalletError> {
    if (MIN_SEED_LEN..=MAX_SEED_LEN).contains(&len) {
        Ok(())
    } else {
        Err(WalletError::InvalidSeedLength(len))
    }
}

#[derive(Clone, Copy)]
enum KeyMaterial {
    Private(secp256k1::SecretKey),
    Public(secp256k1::PublicKey),
}

/// A BIP-32 extended key: key material plus chain code and position metadata.
///
/// Extended keys are immutable; derivation returns new values. Private
/// material is erased on drop.
pub struct ExtendedKey {
    material: KeyMaterial,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: ChildNumber,
    network: Network,
}

impl ExtendedKey {
    pub fn is_private(&self) -> bool {
        matches!(self.material, KeyMaterial::Private(_))
    }

    /// Compressed public key for this node.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.secp_public_key())
    }

    /// First four bytes of HASH160 of the public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        let id = hash160(&self.public_key().to_bytes());
        [id[0], id[1], id[2], id[3]]
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> ChildNumber {
        self.child_number
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// A public-only copy of this key.
    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            material: KeyMaterial::Public(self.secp_public_key()),
            chain_code: self.chain_code,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            network: self.network,
        }
    }

    /// Standard 78-byte base58check serialization of the public key
    /// (`xpub…` on mainnet, `tpub…` on testnet).
    pub fn to_xpub_string(&self) -> String {
        let mut buf = Vec::with_capacity(EXTENDED_KEY_LEN);
        buf.extend_from_slice(&self.network.profile().xpub_version);
        buf.push(self.depth);
        buf.extend_from_slice(&self.parent_fingerprint);
        buf.extend_from_slice(&self.child_number.to_raw().to_be_bytes());
        buf.extend_from_slice(&self.chain_code);
        buf.extend_from_slice(&self.public_key().to_bytes());
        bs58::encode(buf).with_check().into_string()
    }

    /// Derive one child step. See [`derive_child`].
    pub fn derive_child(&self, step: ChildNumber) -> Result<ExtendedKey, WalletError> {
        derive_child(self, step.index(), step.is_hardened())
    }

    /// Derive along `path`. See [`derive_path`].
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedKey, WalletError> {
        derive_path(self, path)
    }

    fn secp_public_key(&self) -> secp256k1::PublicKey {
        match &self.material {
            KeyMaterial::Private(sk) => secp256k1::PublicKey::from_secret_key(SECP256K1, sk),
            KeyMaterial::Public(pk) => *pk,
        }
    }
}

impl Clone for ExtendedKey {
    fn clone(&self) -> Self {
        Self {
            material: self.material,
            chain_code: self.chain_code,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            network: self.network,
        }
    }
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        if let KeyMaterial::Private(sk) = &mut self.material {
            sk.non_secure_erase();
        }
        self.chain_code.zeroize();
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("private", &self.is_private())
            .field("public_key", &self.public_key())
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Split an HMAC-SHA512 output into `(I_L, I_R)`.
fn hmac_halves(key: &[u8], parts: &[&[u8]]) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    let mut out = mac.finalize().into_bytes();
    let mut il = Zeroizing::new([0u8; 32]);
    let mut ir = Zeroizing::new([0u8; 32]);
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    out.as_mut_slice().zeroize();
    (il, ir)
}

/// Master extended private key from a 16 to 64 byte seed.
///
/// `I = HMAC-SHA512("Bitcoin seed", seed)`; `I_L` is the master scalar and
/// `I_R` the chain code. An `I_L` that is zero or not below the curve order
/// is [`WalletError::InvalidChildKey`].
pub fn master_key(seed: &[u8], network: Network) -> Result<ExtendedKey, WalletError> {
    check_seed_len(seed.len())?;
    let (il, ir) = hmac_halves(MASTER_HMAC_KEY, &[seed]);
    let secret =
        secp256k1::SecretKey::from_slice(il.as_slice()).map_err(|_| WalletError::InvalidChildKey)?;
    Ok(ExtendedKey {
        material: KeyMaterial::Private(secret),
        chain_code: *ir,
        depth: 0,
        parent_fingerprint: [0u8; 4],
        child_number: ChildNumber::normal(0),
        network,
    })
}

/// Derive the child at `index` of `parent`.
///
/// An `index` with the top bit already set is treated as hardened. Hardened
/// derivation from a public-only parent fails with
/// [`WalletError::HardenedRequiresPrivateKey`].
pub fn derive_child(
    parent: &ExtendedKey,
    index: u32,
    hardened: bool,
) -> Result<ExtendedKey, WalletError> {
    let step = if hardened {
        ChildNumber::hardened(index)
    } else {
        ChildNumber::normal(index)
    };
    let depth = parent
        .depth
        .checked_add(1)
        .ok_or(WalletError::DepthExceeded)?;
    let ser_index = step.to_raw().to_be_bytes();

    let (il, ir) = match (&parent.material, step.is_hardened()) {
        (KeyMaterial::Private(sk), true) => {
            let secret = Zeroizing::new(sk.secret_bytes());
            hmac_halves(&parent.chain_code, &[&[0u8], secret.as_slice(), &ser_index])
        }
        (KeyMaterial::Public(_), true) => return Err(WalletError::HardenedRequiresPrivateKey),
        (_, false) => {
            let point: [u8; COMPRESSED_PUBKEY_LEN] = parent.secp_public_key().serialize();
            hmac_halves(&parent.chain_code, &[&point, &ser_index])
        }
    };

    let tweak = Scalar::from_be_bytes(*il).map_err(|_| WalletError::InvalidChildKey)?;
    let material = match parent.material {
        KeyMaterial::Private(sk) => KeyMaterial::Private(
            sk.add_tweak(&tweak)
                .map_err(|_| WalletError::InvalidChildKey)?,
        ),
        KeyMaterial::Public(pk) => KeyMaterial::Public(
            pk.add_exp_tweak(SECP256K1, &tweak)
                .map_err(|_| WalletError::InvalidChildKey)?,
        ),
    };

    Ok(ExtendedKey {
        material,
        chain_code: *ir,
        depth,
        parent_fingerprint: parent.fingerprint(),
        child_number: step,
        network: parent.network,
    })
}

/// Derive along every step of `path` in order.
///
/// The first failing step aborts derivation; its error is wrapped in
/// [`WalletError::Derivation`] with the 1-based position of the step.
pub fn derive_path(master: &ExtendedKey, path: &DerivationPath) -> Result<ExtendedKey, WalletError> {
    let mut key = master.clone();
    for (i, step) in path.steps().iter().enumerate() {
        key = derive_child(&key, step.index(), step.is_hardened()).map_err(|e| {
            WalletError::Derivation {
                depth: i + 1,
                source: Box::new(e),
            }
        })?;
    }
    debug!(%path, depth = key.depth, "derived key");
    Ok(key)
}

/// The signing key held by a private extended key.
pub fn to_spendable_key(extended: &ExtendedKey) -> Result<KeyPair, WalletError> {
    match &extended.material {
        KeyMaterial::Private(sk) => {
            let secret = Zeroizing::new(sk.secret_bytes());
            Ok(KeyPair::from_secret_bytes(&secret)?)
        }
        KeyMaterial::Public(_) => Err(WalletError::PrivateKeyRequired),
    }
}

/// Compressed WIF for the key held by `extended`, using `network`'s version byte.
pub fn to_wif(extended: &ExtendedKey, network: Network) -> Result<String, WalletError> {
    let kp = to_spendable_key(extended)?;
    Ok(wif::encode(&kp.secret_bytes(), network))
}

/// Deterministic BIP-44 key chain for one account.
///
/// Derives the hardened account node `m/44'/coin'/account'` once and caches
/// every address key handed out below it, with a reverse lookup from pubkey
/// hash to `(change, index)`.
pub struct KeyChain {
    account_key: ExtendedKey,
    coin_type: u32,
    account: u32,
    next_receive: u32,
    next_change: u32,
    /// Cache of derived keypairs by (change, index).
    keypairs: HashMap<(u32, u32), KeyPair>,
    /// Reverse lookup: pubkey_hash -> (change, index).
    pubkey_hash_to_path: HashMap<PubkeyHash, (u32, u32)>,
}

impl KeyChain {
    /// Create a keychain for the account selected by `config`.
    pub fn new(seed: &Seed, config: &WalletConfig) -> Result<Self, WalletError> {
        let master = seed.master_key(config.network)?;
        let account_path = Bip44Path::receive(config.coin_type, config.account, 0)?.account_path();
        let account_key = derive_path(&master, &account_path)?;
        Ok(Self {
            account_key,
            coin_type: config.coin_type,
            account: config.account,
            next_receive: 0,
            next_change: 0,
            keypairs: HashMap::new(),
            pubkey_hash_to_path: HashMap::new(),
        })
    }

    /// Derive the keypair at `change/index` below the account node.
    ///
    /// `change` must be 0 or 1 and `index` below `2^31`; anything else is
    /// [`WalletError::InvalidPath`].
    pub fn derive_keypair(&mut self, change: u32, index: u32) -> Result<&KeyPair, WalletError> {
        let slot = (change, index);
        if !self.keypairs.contains_key(&slot) {
            let path = Bip44Path::new(self.coin_type, self.account, change, index)?;
            let relative = DerivationPath::from(path.relative_steps().to_vec());
            let node = derive_path(&self.account_key, &relative)?;
            let kp = to_spendable_key(&node)?;
            self.pubkey_hash_to_path
                .insert(kp.public_key().pubkey_hash(), slot);
            self.keypairs.insert(slot, kp);
        }
        Ok(&self.keypairs[&slot])
    }

    /// Receiving key at `index`.
    pub fn receive_keypair(&mut self, index: u32) -> Result<&KeyPair, WalletError> {
        self.derive_keypair(EXTERNAL_CHAIN, index)
    }

    /// Change key at `index`.
    pub fn change_keypair(&mut self, index: u32) -> Result<&KeyPair, WalletError> {
        self.derive_keypair(INTERNAL_CHAIN, index)
    }

    /// Derive the next receiving key, advancing the receive index.
    pub fn next_receive_keypair(&mut self) -> Result<&KeyPair, WalletError> {
        let index = self.next_receive;
        self.receive_keypair(index)?;
        self.next_receive = index + 1;
        Ok(&self.keypairs[&(EXTERNAL_CHAIN, index)])
    }

    /// Derive the next change key, advancing the change index.
    pub fn next_change_keypair(&mut self) -> Result<&KeyPair, WalletError> {
        let index = self.next_change;
        self.change_keypair(index)?;
        self.next_change = index + 1;
        Ok(&self.keypairs[&(INTERNAL_CHAIN, index)])
    }

    /// P2WPKH output script of the receiving key at `index`.
    pub fn receive_script(&mut self, index: u32) -> Result<Vec<u8>, WalletError> {
        let pkh = self.receive_keypair(index)?.public_key().pubkey_hash();
        Ok(p2wpkh_script(&pkh))
    }

    /// Look up the keypair that owns a given pubkey hash.
    ///
    /// Only keys already derived through this keychain are found.
    pub fn keypair_for_pubkey_hash(&self, hash: &PubkeyHash) -> Option<&KeyPair> {
        self.pubkey_hash_to_path
            .get(hash)
            .and_then(|slot| self.keypairs.get(slot))
    }

    /// Full BIP-44 path of a derived key, if known.
    pub fn path_for_pubkey_hash(&self, hash: &PubkeyHash) -> Option<Bip44Path> {
        self.pubkey_hash_to_path
            .get(hash)
            .and_then(|&(change, index)| {
                Bip44Path::new(self.coin_type, self.account, change, index).ok()
            })
    }

    /// Derive both chains up to (excluding) the given indices.
    ///
    /// Used when restoring a wallet to rebuild the key cache and lookup table.
    pub fn restore_to_index(&mut self, receive: u32, change: u32) -> Result<(), WalletError> {
        for i in 0..receive {
            self.receive_keypair(i)?;
        }
        for i in 0..change {
            self.change_keypair(i)?;
        }
        self.next_receive = receive;
        self.next_change = change;
        Ok(())
    }

    /// Account-level extended public key, for watch-only use.
    pub fn account_xpub(&self) -> String {
        self.account_key.neuter().to_xpub_string()
    }

    pub fn network(&self) -> Network {
        self.account_key.network()
    }

    pub fn next_receive_index(&self) -> u32 {
        self.next_receive
    }

    pub fn next_change_index(&self) -> u32 {
        self.next_change
    }

    /// Get all known pubkey hashes.
    pub fn known_pubkey_hashes(&self) -> impl Iterator<Item = &PubkeyHash> {
        self.pubkey_hash_to_path.keys()
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain")
            .field("network", &self.network())
            .field("coin_type", &self.coin_type)
            .field("account", &self.account)
            .field("next_receive", &self.next_receive)
            .field("next_change", &self.next_change)
            .field("cached_keys", &self.keypairs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::constants::HARDENED_OFFSET;
    use proptest::prelude::*;

    const VECTOR1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn vector1_master() -> ExtendedKey {
        master_key(&hex::decode(VECTOR1_SEED).unwrap(), Network::Mainnet).unwrap()
    }

    fn secret_hex(key: &ExtendedKey) -> String {
        hex::encode(*to_spendable_key(key).unwrap().secret_bytes())
    }

    // --- Seed ---

    #[test]
    fn seed_length_bounds() {
        assert_eq!(
            Seed::from_bytes(&[0u8; 15]).unwrap_err(),
            WalletError::InvalidSeedLength(15)
        );
        assert_eq!(
            Seed::from_bytes(&[0u8; 65]).unwrap_err(),
            WalletError::InvalidSeedLength(65)
        );
        assert!(Seed::from_bytes(&[0u8; 16]).is_ok());
        assert!(Seed::from_bytes(&[0u8; 64]).is_ok());
    }

    #[test]
    fn seed_generate_unique() {
        let s1 = Seed::generate();
        let s2 = Seed::generate();
        assert_eq!(s1.as_bytes().len(), RECOMMENDED_SEED_LEN);
        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn seed_debug_redacted() {
        let seed = Seed::from_bytes(&[0xAB; 32]).unwrap();
        let debug = format!("{seed:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn master_rejects_short_seed() {
        assert_eq!(
            master_key(&[1u8; 8], Network::Mainnet).unwrap_err(),
            WalletError::InvalidSeedLength(8)
        );
    }

    // --- BIP-32 test vector 1 ---

    #[test]
    fn vector1_master_key() {
        let m = vector1_master();
        assert_eq!(
            secret_hex(&m),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(m.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
        assert_eq!(
            m.public_key().to_string(),
            "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2"
        );
        assert_eq!(
            m.to_xpub_string(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
        assert_eq!(m.depth(), 0);
        assert_eq!(m.parent_fingerprint(), [0u8; 4]);
    }

    #[test]
    fn vector1_m_0h() {
        let m = vector1_master();
        let child = derive_child(&m, 0, true).unwrap();
        assert_eq!(
            secret_hex(&child),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
        assert_eq!(
            hex::encode(child.chain_code()),
            "47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141"
        );
        assert_eq!(
            child.to_xpub_string(),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
        assert_eq!(child.parent_fingerprint(), m.fingerprint());
        assert_eq!(hex::encode(m.fingerprint()), "3442193e");
    }

    #[test]
    fn vector1_m_0h_1() {
        let key = derive_path(&vector1_master(), &"m/0'/1".parse().unwrap()).unwrap();
        assert_eq!(
            secret_hex(&key),
            "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
        );
        assert_eq!(
            key.to_xpub_string(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
        assert_eq!(key.depth(), 2);
    }

    #[test]
    fn testnet_xpub_prefix() {
        let m = master_key(&hex::decode(VECTOR1_SEED).unwrap(), Network::Testnet).unwrap();
        assert!(m.to_xpub_string().starts_with("tpub"));
    }

    // --- Derivation rules ---

    #[test]
    fn public_derivation_matches_private() {
        let m = vector1_master();
        let account = derive_child(&m, 0, true).unwrap();
        let from_private = derive_child(&account, 1, false).unwrap();
        let from_public = derive_child(&account.neuter(), 1, false).unwrap();
        assert!(!from_public.is_private());
        assert_eq!(from_private.public_key(), from_public.public_key());
        assert_eq!(from_private.chain_code(), from_public.chain_code());
    }

    #[test]
    fn hardened_from_public_fails() {
        let pub_only = vector1_master().neuter();
        assert_eq!(
            derive_child(&pub_only, 0, true).unwrap_err(),
            WalletError::HardenedRequiresPrivateKey
        );
    }

    #[test]
    fn top_bit_index_derives_hardened() {
        let m = vector1_master();
        let a = derive_child(&m, 0x8000_0000, false).unwrap();
        let b = derive_child(&m, 0, true).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert!(a.child_number().is_hardened());
    }

    #[test]
    fn path_failure_reports_depth() {
        let pub_only = vector1_master().neuter();
        let path: DerivationPath = "m/0/1/2'".parse().unwrap();
        assert_eq!(
            derive_path(&pub_only, &path).unwrap_err(),
            WalletError::Derivation {
                depth: 3,
                source: Box::new(WalletError::HardenedRequiresPrivateKey),
            }
        );
    }

    #[test]
    fn empty_path_returns_master() {
        let m = vector1_master();
        let same = derive_path(&m, &DerivationPath::master()).unwrap();
        assert_eq!(same.public_key(), m.public_key());
    }

    #[test]
    fn public_key_cannot_spend() {
        let pub_only = vector1_master().neuter();
        assert_eq!(
            to_wif(&pub_only, Network::Mainnet).unwrap_err(),
            WalletError::PrivateKeyRequired
        );
    }

    #[test]
    fn wif_uses_requested_network() {
        let m = vector1_master();
        let main = to_wif(&m, Network::Mainnet).unwrap();
        let test = to_wif(&m, Network::Testnet).unwrap();
        assert!(main.starts_with('K') || main.starts_with('L'));
        assert!(test.starts_with('c'));
        let decoded = wif::decode(&test).unwrap();
        assert_eq!(decoded.network, Network::Testnet);
        assert_eq!(hex::encode(*decoded.secret), secret_hex(&m));
    }

    #[test]
    fn debug_hides_secret() {
        let m = vector1_master();
        let debug = format!("{m:?}");
        assert!(!debug.contains(&secret_hex(&m)));
        assert!(debug.contains("private: true"));
    }

    // --- KeyChain ---

    fn test_chain() -> KeyChain {
        let seed = Seed::from_bytes(&[7u8; 64]).unwrap();
        KeyChain::new(&seed, &WalletConfig::testnet()).unwrap()
    }

    #[test]
    fn keychain_matches_full_path() {
        let seed = Seed::from_bytes(&[7u8; 64]).unwrap();
        let config = WalletConfig::testnet();
        let mut chain = KeyChain::new(&seed, &config).unwrap();
        let via_chain = chain.receive_keypair(4).unwrap().public_key();

        let master = seed.master_key(config.network).unwrap();
        let path = Bip44Path::receive(config.coin_type, config.account, 4).unwrap();
        let direct = derive_path(&master, &path.into()).unwrap();
        assert_eq!(direct.public_key(), via_chain);
    }

    #[test]
    fn keychain_next_advances() {
        let mut chain = test_chain();
        let a = chain.next_receive_keypair().unwrap().public_key();
        let b = chain.next_receive_keypair().unwrap().public_key();
        assert_ne!(a, b);
        assert_eq!(chain.next_receive_index(), 2);
        let c = chain.next_change_keypair().unwrap().public_key();
        assert_ne!(a, c);
        assert_eq!(chain.next_change_index(), 1);
    }

    #[test]
    fn keychain_reverse_lookup() {
        let mut chain = test_chain();
        let pkh = chain.change_keypair(2).unwrap().public_key().pubkey_hash();
        assert!(chain.keypair_for_pubkey_hash(&pkh).is_some());
        let path = chain.path_for_pubkey_hash(&pkh).unwrap();
        assert_eq!((path.change_level(), path.index()), (INTERNAL_CHAIN, 2));
        assert!(chain.keypair_for_pubkey_hash(&PubkeyHash([0u8; 20])).is_none());
    }

    #[test]
    fn keychain_restore() {
        let mut chain = test_chain();
        chain.restore_to_index(3, 2).unwrap();
        assert_eq!(chain.known_pubkey_hashes().count(), 5);
        assert_eq!(chain.next_receive_index(), 3);
        assert_eq!(chain.next_change_index(), 2);
    }

    #[test]
    fn keychain_receive_script_is_p2wpkh() {
        let mut chain = test_chain();
        let script = chain.receive_script(0).unwrap();
        assert_eq!(script.len(), 22);
        assert_eq!(&script[..2], &[0x00, 0x14]);
    }

    #[test]
    fn keychain_account_xpub_is_tpub() {
        assert!(test_chain().account_xpub().starts_with("tpub"));
    }

    #[test]
    fn keychain_rejects_out_of_range_levels() {
        let mut chain = test_chain();
        assert!(matches!(
            chain.receive_keypair(HARDENED_OFFSET),
            Err(WalletError::InvalidPath(_))
        ));
        assert!(matches!(
            chain.derive_keypair(2, 0),
            Err(WalletError::InvalidPath(_))
        ));
        assert!(chain.known_pubkey_hashes().next().is_none());
    }

    #[test]
    fn keychain_rejects_hardened_coin_type_and_account() {
        let seed = Seed::from_bytes(&[7u8; 64]).unwrap();
        let coin = WalletConfig {
            coin_type: HARDENED_OFFSET,
            ..WalletConfig::mainnet()
        };
        assert!(matches!(
            KeyChain::new(&seed, &coin),
            Err(WalletError::InvalidPath(_))
        ));
        let account = WalletConfig::mainnet().with_account(HARDENED_OFFSET | 1);
        assert!(matches!(
            KeyChain::new(&seed, &account),
            Err(WalletError::InvalidPath(_))
        ));
    }

    #[test]
    fn keychain_top_index_stays_normal() {
        let mut chain = test_chain();
        let pkh = chain
            .receive_keypair(HARDENED_OFFSET - 1)
            .unwrap()
            .public_key()
            .pubkey_hash();
        let path = chain.path_for_pubkey_hash(&pkh).unwrap();
        assert_eq!(path.index(), HARDENED_OFFSET - 1);
        assert!(path.to_string().ends_with("/0/2147483647"));
    }

    #[test]
    fn depth_limit_is_255() {
        let mut key = vector1_master();
        for i in 0..255 {
            key = derive_child(&key, i, false).unwrap();
        }
        assert_eq!(key.depth(), 255);
        assert_eq!(
            derive_child(&key, 0, false).unwrap_err(),
            WalletError::DepthExceeded
        );

        let too_long = DerivationPath::from(vec![ChildNumber::normal(0); 256]);
        match derive_path(&vector1_master(), &too_long) {
            Err(WalletError::Derivation { depth, source }) => {
                assert_eq!(depth, 256);
                assert_eq!(*source, WalletError::DepthExceeded);
            }
            other => panic!("expected wrapped DepthExceeded, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn derivation_is_deterministic(
            seed in proptest::collection::vec(any::<u8>(), 16..=64),
            index in 0u32..1000,
            hardened in any::<bool>(),
        ) {
            let m1 = master_key(&seed, Network::Mainnet).unwrap();
            let m2 = master_key(&seed, Network::Mainnet).unwrap();
            let c1 = derive_child(&m1, index, hardened).unwrap();
            let c2 = derive_child(&m2, index, hardened).unwrap();
            prop_assert_eq!(c1.public_key(), c2.public_key());
            prop_assert_eq!(c1.chain_code(), c2.chain_code());
            prop_assert_eq!(c1.depth(), 1);
        }

        #[test]
        fn neutered_normal_child_agrees(
            seed in proptest::collection::vec(any::<u8>(), 16..=64),
            index in 0u32..1000,
        ) {
            let m = master_key(&seed, Network::Testnet).unwrap();
            let private = derive_child(&m, index, false).unwrap();
            let public = derive_child(&m.neuter(), index, false).unwrap();
            prop_assert_eq!(private.public_key(), public.public_key());
        }
    }
}
