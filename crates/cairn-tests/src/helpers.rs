//! Shared test helpers for integration tests.

use std::collections::HashMap;

use parking_lot::Mutex;

use cairn_core::crypto::verify_transaction_input;
use cairn_core::error::{LedgerError, TransactionError};
use cairn_core::script::{p2wpkh_script, parse_p2wpkh};
use cairn_core::traits::{Broadcaster, LedgerQuery};
use cairn_core::types::{OutPoint, PubkeyHash, Transaction, Txid, Utxo, UtxoRecord};
use cairn_wallet::encryption::KdfParams;

/// Scrypt parameters cheap enough for tests.
pub fn light_kdf() -> KdfParams {
    KdfParams::new(4, 8, 1).unwrap()
}

/// P2WPKH script paying a fixed pubkey hash built from one byte.
pub fn script_for(seed: u8) -> Vec<u8> {
    p2wpkh_script(&PubkeyHash([seed; 20]))
}

/// In-memory ledger.
///
/// Serves unspent outputs in insertion order. A broadcast is accepted only
/// if every input exists, is P2WPKH, carries a valid signature and the
/// outputs do not exceed the inputs; accepted transactions are applied
/// immediately.
#[derive(Default)]
pub struct MockLedger {
    utxos: Mutex<Vec<Utxo>>,
    raw: Mutex<HashMap<Txid, Vec<u8>>>,
    offline: Mutex<bool>,
    broadcasts: Mutex<usize>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `script` under a synthetic funding txid.
    pub fn fund(&self, script: &[u8], amount: u64) -> OutPoint {
        let mut utxos = self.utxos.lock();
        let n = utxos.len() as u32;
        let mut id = [0xF0; 32];
        id[..4].copy_from_slice(&n.to_le_bytes());
        let outpoint = OutPoint {
            txid: Txid(id),
            vout: n,
        };
        utxos.push(Utxo {
            outpoint,
            script_pubkey: script.to_vec(),
            amount,
            confirmations: 1,
        });
        outpoint
    }

    /// Total unspent value locked to `script`.
    pub fn balance(&self, script: &[u8]) -> u64 {
        self.utxos
            .lock()
            .iter()
            .filter(|u| u.script_pubkey == script)
            .map(|u| u.amount)
            .sum()
    }

    pub fn utxo_count(&self) -> usize {
        self.utxos.lock().len()
    }

    pub fn broadcast_count(&self) -> usize {
        *self.broadcasts.lock()
    }

    /// Make every call fail with [`LedgerError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if *self.offline.lock() {
            return Err(LedgerError::Unavailable("mock ledger offline".into()));
        }
        Ok(())
    }

    fn validate(&self, tx: &Transaction, utxos: &[Utxo]) -> Result<(), LedgerError> {
        let overflow = || LedgerError::Rejected(TransactionError::ValueOverflow.to_string());
        let mut input_total: u64 = 0;
        for (i, input) in tx.inputs.iter().enumerate() {
            let spent = utxos
                .iter()
                .find(|u| u.outpoint == input.previous_output)
                .ok_or_else(|| {
                    LedgerError::Rejected(format!("missing input {}", input.previous_output))
                })?;
            let pkh = parse_p2wpkh(&spent.script_pubkey)
                .map_err(|e| LedgerError::Rejected(e.to_string()))?;
            verify_transaction_input(tx, i, spent.amount, &pkh)
                .map_err(|e| LedgerError::Rejected(format!("input {i}: {e}")))?;
            input_total = input_total.checked_add(spent.amount).ok_or_else(overflow)?;
        }
        let output_total = tx.total_output_value().ok_or_else(overflow)?;
        if output_total > input_total {
            return Err(LedgerError::Rejected(format!(
                "outputs {output_total} exceed inputs {input_total}"
            )));
        }
        Ok(())
    }
}

impl LedgerQuery for MockLedger {
    fn list_unspent(&self, script_pubkey: &[u8]) -> Result<Vec<UtxoRecord>, LedgerError> {
        self.check_online()?;
        Ok(self
            .utxos
            .lock()
            .iter()
            .filter(|u| u.script_pubkey == script_pubkey)
            .map(UtxoRecord::from)
            .collect())
    }

    fn raw_transaction(&self, txid: &Txid) -> Result<Option<Vec<u8>>, LedgerError> {
        self.check_online()?;
        Ok(self.raw.lock().get(txid).cloned())
    }
}

impl Broadcaster for MockLedger {
    fn broadcast(&self, raw_tx: &[u8]) -> Result<Txid, LedgerError> {
        self.check_online()?;
        let tx = Transaction::from_bytes(raw_tx)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        let mut utxos = self.utxos.lock();
        self.validate(&tx, &utxos)?;

        let txid = tx.txid();
        utxos.retain(|u| !tx.inputs.iter().any(|i| i.previous_output == u.outpoint));
        for (vout, out) in tx.outputs.iter().enumerate() {
            utxos.push(Utxo {
                outpoint: OutPoint {
                    txid,
                    vout: vout as u32,
                },
                script_pubkey: out.script_pubkey.clone(),
                amount: out.value,
                confirmations: 0,
            });
        }
        self.raw.lock().insert(txid, raw_tx.to_vec());
        *self.broadcasts.lock() += 1;
        Ok(txid)
    }
}
