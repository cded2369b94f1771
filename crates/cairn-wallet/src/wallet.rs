//! High-level wallet composition.
//!
//! Combines [`KeyChain`], the passphrase key codec and the transaction
//! builder behind the [`LedgerQuery`] and [`Broadcaster`] collaborators.
//! A spend runs fetch → select → build → sign → broadcast and either
//! returns the broadcast id or fails without side effects on the ledger.

use tracing::{debug, info, warn};

use cairn_core::crypto::KeyPair;
use cairn_core::network::Network;
use cairn_core::script::p2wpkh_script;
use cairn_core::traits::{Broadcaster, InputSigner, LedgerQuery};
use cairn_core::types::{Txid, Utxo};

use crate::builder::{build_transaction, BuiltTransaction};
use crate::config::WalletConfig;
use crate::encryption::{decrypt_to_key, encrypt_with, KdfParams};
use crate::error::WalletError;
use crate::keys::{KeyChain, Seed};
use crate::mnemonic::mnemonic_to_seed;

/// Result of a successful spend.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Id reported by the broadcaster.
    pub txid: Txid,
    pub built: BuiltTransaction,
}

/// Balance across a set of scripts, split by confirmation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletBalance {
    /// Value of outputs with at least one confirmation.
    pub confirmed: u64,
    /// Value of outputs still in the mempool (zero or negative confirmations).
    pub unconfirmed: u64,
    pub utxo_count: usize,
}

impl WalletBalance {
    /// Confirmed plus unconfirmed. Returns None on overflow.
    pub fn total(&self) -> Option<u64> {
        self.confirmed.checked_add(self.unconfirmed)
    }
}

/// An HD wallet for one BIP-44 account.
pub struct Wallet {
    config: WalletConfig,
    keychain: KeyChain,
}

impl Wallet {
    /// Open the account selected by `config` from a seed.
    pub fn from_seed(seed: &Seed, config: WalletConfig) -> Result<Self, WalletError> {
        let keychain = KeyChain::new(seed, &config)?;
        info!(
            network = %config.network,
            account = config.account,
            "wallet opened"
        );
        Ok(Self { config, keychain })
    }

    /// Open a wallet from a BIP-39 phrase and its optional passphrase.
    pub fn from_mnemonic(
        phrase: &str,
        mnemonic_passphrase: &str,
        config: WalletConfig,
    ) -> Result<Self, WalletError> {
        let seed = mnemonic_to_seed(phrase, mnemonic_passphrase)?;
        Self::from_seed(&seed, config)
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn keychain(&self) -> &KeyChain {
        &self.keychain
    }

    pub fn keychain_mut(&mut self) -> &mut KeyChain {
        &mut self.keychain
    }

    /// P2WPKH script of the next unused receiving key.
    pub fn next_receive_script(&mut self) -> Result<Vec<u8>, WalletError> {
        let pkh = self.keychain.next_receive_keypair()?.public_key().pubkey_hash();
        Ok(p2wpkh_script(&pkh))
    }

    /// Balance of every key this wallet has derived so far.
    ///
    /// Keys not yet handed out by the keychain are not queried; call
    /// [`KeyChain::restore_to_index`] first when restoring.
    pub fn balance(&self, ledger: &dyn LedgerQuery) -> Result<WalletBalance, WalletError> {
        let scripts: Vec<Vec<u8>> = self
            .keychain
            .known_pubkey_hashes()
            .map(p2wpkh_script)
            .collect();
        balance(ledger, &scripts)
    }

    /// Encrypt the key at `change/index` under `passphrase` for storage.
    pub fn export_encrypted(
        &mut self,
        change: u32,
        index: u32,
        passphrase: &str,
    ) -> Result<String, WalletError> {
        let kdf = self.config.kdf;
        let kp = self.keychain.derive_keypair(change, index)?;
        encrypt_with(&kp.secret_bytes(), passphrase, &kdf)
    }

    /// Spend `amount` to `destination` from the key at `change/index`.
    ///
    /// Change returns to the same key's script.
    pub fn send(
        &mut self,
        ledger: &dyn LedgerQuery,
        broadcaster: &dyn Broadcaster,
        change: u32,
        index: u32,
        destination: &[u8],
        amount: u64,
    ) -> Result<SendReceipt, WalletError> {
        let signer = self.keychain.derive_keypair(change, index)?;
        send(ledger, broadcaster, signer, destination, amount)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.config.network)
            .field("account", &self.config.account)
            .field("receive_index", &self.keychain.next_receive_index())
            .finish()
    }
}

/// Unspent outputs locked to `script_pubkey`, in ledger order.
pub fn fetch_utxos(
    ledger: &dyn LedgerQuery,
    script_pubkey: &[u8],
) -> Result<Vec<Utxo>, WalletError> {
    let records = ledger.list_unspent(script_pubkey)?;
    let utxos = records
        .iter()
        .map(|r| Utxo::try_from(r).map_err(|e| WalletError::MalformedUtxo(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = utxos.len(), "fetched utxos");
    Ok(utxos)
}

/// Sum the unspent outputs of `scripts`.
///
/// Outputs with at least one confirmation count as confirmed.
pub fn balance<T: AsRef<[u8]>>(
    ledger: &dyn LedgerQuery,
    scripts: &[T],
) -> Result<WalletBalance, WalletError> {
    let overflow = || WalletError::InvalidAmount("balance overflows".into());
    let mut bal = WalletBalance::default();
    for script in scripts {
        for utxo in fetch_utxos(ledger, script.as_ref())? {
            let bucket = if utxo.confirmations > 0 {
                &mut bal.confirmed
            } else {
                &mut bal.unconfirmed
            };
            *bucket = bucket.checked_add(utxo.amount).ok_or_else(overflow)?;
            bal.utxo_count += 1;
        }
    }
    debug!(
        scripts = scripts.len(),
        confirmed = bal.confirmed,
        unconfirmed = bal.unconfirmed,
        utxos = bal.utxo_count,
        "computed balance"
    );
    Ok(bal)
}

/// Pay `amount` to `destination` from the signer's own P2WPKH script and
/// broadcast the result.
///
/// Nothing is broadcast unless every input signed and verified.
pub fn send<S: InputSigner + ?Sized>(
    ledger: &dyn LedgerQuery,
    broadcaster: &dyn Broadcaster,
    signer: &S,
    destination: &[u8],
    amount: u64,
) -> Result<SendReceipt, WalletError> {
    let sender_script = p2wpkh_script(&signer.public_key().pubkey_hash());
    let utxos = fetch_utxos(ledger, &sender_script)?;
    let built = build_transaction(&utxos, amount, destination, &sender_script, signer)?;

    let local = built.tx.txid();
    let txid = broadcaster.broadcast(&built.tx.serialize())?;
    if txid != local {
        warn!(%local, reported = %txid, "broadcaster reported a different txid");
    }
    info!(%txid, amount, fee = built.fee, "transaction broadcast");
    Ok(SendReceipt { txid, built })
}

/// Raw transaction bytes from the ledger, if it knows `txid`.
pub fn raw_transaction(
    ledger: &dyn LedgerQuery,
    txid: &Txid,
) -> Result<Option<Vec<u8>>, WalletError> {
    Ok(ledger.raw_transaction(txid)?)
}

/// Decrypt stored keys until one controls `expected_script`.
///
/// The codec cannot tell a wrong passphrase from a right one, so a key is
/// accepted only when its P2WPKH script matches. A wrong passphrase
/// therefore ends in [`WalletError::KeyNotFound`]. Malformed entries abort.
pub fn unlock_key<T: AsRef<str>>(
    encrypted: &[T],
    passphrase: &str,
    expected_script: &[u8],
    kdf: &KdfParams,
) -> Result<KeyPair, WalletError> {
    for (i, text) in encrypted.iter().enumerate() {
        let raw = decrypt_to_key(text.as_ref(), passphrase, kdf)?;
        let kp = match KeyPair::from_secret_bytes(&raw) {
            Ok(kp) => kp,
            Err(_) => {
                debug!(entry = i, "decrypted scalar out of range");
                continue;
            }
        };
        if p2wpkh_script(&kp.public_key().pubkey_hash()) == expected_script {
            info!(entry = i, "key unlocked");
            return Ok(kp);
        }
    }
    warn!(tried = encrypted.len(), "no stored key matches the sender script");
    Err(WalletError::KeyNotFound(hex::encode(expected_script)))
}
