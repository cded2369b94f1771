//! Segwit transaction builder: selection, fee, change and signing.
//!
//! Provides a builder pattern for constructing transactions:
//! 1. Set the recipient (script + amount) and the sender's change script
//! 2. Build an unsigned draft (performs coin selection, fee and change)
//! 3. Sign every input with the sender's key
//!
//! # Fee model
//! The fee is the byte length of the witness-free serialization of the
//! draft holding the selected inputs and the primary output only. Change is
//! `total - amount`; a change output of `change - fee` is added only when
//! `change > fee`, otherwise the whole surplus goes to the fee.

use tracing::{debug, info};

use cairn_core::constants::{LOCK_TIME_NONE, SEQUENCE_FINAL, TX_VERSION};
use cairn_core::crypto::{sign_transaction_input, verify_transaction_input};
use cairn_core::script::parse_p2wpkh;
use cairn_core::traits::InputSigner;
use cairn_core::types::{Transaction, TxInput, TxOutput, Utxo};

use crate::coin_selection::{CoinSelection, CoinSelector};
use crate::error::WalletError;

/// A transaction recipient: output script and amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Destination scriptPubKey.
    pub script_pubkey: Vec<u8>,
    /// Amount in base units.
    pub amount: u64,
}

/// An unsigned draft ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    /// The transaction with empty witnesses.
    pub tx: Transaction,
    /// The coin selection result used to build this transaction.
    pub selection: CoinSelection,
    /// Fee implied by the draft, in base units.
    pub fee: u64,
    /// Value of the change output, if one was added.
    pub change: Option<u64>,
}

/// A fully signed transaction with its fee and change breakdown.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub tx: Transaction,
    pub fee: u64,
    pub change: Option<u64>,
    /// Spent UTXOs, in input order.
    pub selected: Vec<Utxo>,
}

/// Builder for constructing and signing transactions.
///
/// # Example
/// ```ignore
/// let unsigned = TransactionBuilder::new()
///     .pay_to(destination_script, 50_000)
///     .change_to(sender_script)
///     .build(&utxos)?;
/// let built = TransactionBuilder::sign(unsigned, &keypair)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    recipient: Option<Recipient>,
    change_script: Option<Vec<u8>>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary output.
    pub fn pay_to(&mut self, script_pubkey: Vec<u8>, amount: u64) -> &mut Self {
        self.recipient = Some(Recipient {
            script_pubkey,
            amount,
        });
        self
    }

    /// Set the script that receives change (the sender's own script).
    pub fn change_to(&mut self, script_pubkey: Vec<u8>) -> &mut Self {
        self.change_script = Some(script_pubkey);
        self
    }

    /// Select coins and build the unsigned draft.
    ///
    /// `utxos` must be in ledger order; selection keeps that order.
    pub fn build(&self, utxos: &[Utxo]) -> Result<UnsignedTransaction, WalletError> {
        let recipient = self
            .recipient
            .as_ref()
            .ok_or_else(|| WalletError::BuilderIncomplete("no recipient".into()))?;
        let change_script = self
            .change_script
            .as_ref()
            .ok_or_else(|| WalletError::BuilderIncomplete("no change script".into()))?;

        let selection = CoinSelector::select(utxos, recipient.amount)?;

        let inputs = selection
            .selected
            .iter()
            .map(|utxo| TxInput {
                previous_output: utxo.outpoint,
                sequence: SEQUENCE_FINAL,
                witness: vec![],
            })
            .collect();

        let mut tx = Transaction {
            version: TX_VERSION,
            inputs,
            outputs: vec![TxOutput {
                value: recipient.amount,
                script_pubkey: recipient.script_pubkey.clone(),
            }],
            lock_time: LOCK_TIME_NONE,
        };

        let fee = compute_fee(&tx);
        let change = compute_change(selection.total, recipient.amount, fee);
        if let Some(value) = change {
            tx.outputs.push(TxOutput {
                value,
                script_pubkey: change_script.clone(),
            });
        }

        debug!(
            inputs = tx.inputs.len(),
            total = selection.total,
            amount = recipient.amount,
            fee,
            change = change.unwrap_or(0),
            "built draft"
        );

        Ok(UnsignedTransaction {
            tx,
            selection,
            fee,
            change,
        })
    }

    /// Sign every input of `unsigned` with `signer`.
    ///
    /// Each spent output must be a P2WPKH script for the signer's key. Every
    /// signature is verified before it is kept; any failure discards the
    /// whole transaction.
    pub fn sign<S: InputSigner + ?Sized>(
        unsigned: UnsignedTransaction,
        signer: &S,
    ) -> Result<BuiltTransaction, WalletError> {
        let UnsignedTransaction {
            mut tx,
            selection,
            fee,
            change,
        } = unsigned;
        let signer_pkh = signer.public_key().pubkey_hash();

        for (i, utxo) in selection.selected.iter().enumerate() {
            let owner = parse_p2wpkh(&utxo.script_pubkey).map_err(|e| {
                WalletError::MalformedUtxo(format!("{}: {e}", utxo.outpoint))
            })?;
            if owner != signer_pkh {
                return Err(WalletError::KeyMismatch(utxo.outpoint.to_string()));
            }

            sign_transaction_input(&mut tx, i, utxo.amount, signer).map_err(|e| {
                WalletError::SignatureFailure {
                    index: i,
                    reason: e.to_string(),
                }
            })?;
            verify_transaction_input(&tx, i, utxo.amount, &owner).map_err(|e| {
                WalletError::SignatureFailure {
                    index: i,
                    reason: e.to_string(),
                }
            })?;
        }

        info!(txid = %tx.txid(), inputs = tx.inputs.len(), fee, "signed transaction");

        Ok(BuiltTransaction {
            tx,
            fee,
            change,
            selected: selection.selected,
        })
    }
}

/// Build and sign in one step: pay `amount` to `destination`, returning
/// change to `sender_script`.
pub fn build_transaction<S: InputSigner + ?Sized>(
    utxos: &[Utxo],
    amount: u64,
    destination: &[u8],
    sender_script: &[u8],
    signer: &S,
) -> Result<BuiltTransaction, WalletError> {
    let unsigned = TransactionBuilder::new()
        .pay_to(destination.to_vec(), amount)
        .change_to(sender_script.to_vec())
        .build(utxos)?;
    TransactionBuilder::sign(unsigned, signer)
}

/// Fee for a draft: its witness-free serialized size in bytes.
pub fn compute_fee(draft: &Transaction) -> u64 {
    draft.base_size() as u64
}

/// Change output value, or `None` when the surplus does not exceed the fee.
pub fn compute_change(total: u64, amount: u64, fee: u64) -> Option<u64> {
    let change = total.saturating_sub(amount);
    (change > fee).then(|| change - fee)
}
