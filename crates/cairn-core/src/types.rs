//! Core ledger types: transaction ids, outpoints, UTXOs and transactions.
//!
//! Transactions use the segwit v0 wire format. The legacy (witness-stripped)
//! serialization defines the txid; the full serialization adds the
//! marker/flag bytes and per-input witness stacks.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::constants::{SEGWIT_FLAG, SEGWIT_MARKER, WITNESS_SCALE_FACTOR};
use crate::error::TransactionError;

/// A 32-byte transaction id in internal byte order.
///
/// Displayed and parsed in the conventional reversed byte order.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Double SHA-256 of `data`, as used for txids and wtxids.
    pub fn hash(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        Self(Sha256::digest(first).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({self})")
    }
}

impl FromStr for Txid {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = hex::decode(s)
            .map_err(|e| TransactionError::MalformedOutpoint(format!("txid {s:?}: {e}")))?;
        if bytes.len() != 32 {
            return Err(TransactionError::MalformedOutpoint(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        bytes.reverse();
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

/// HASH160 of a compressed public key.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PubkeyHash(pub [u8; 20]);

impl PubkeyHash {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PubkeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PubkeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubkeyHash({self})")
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    /// Append the 36-byte wire form (txid || vout LE).
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.txid.as_bytes());
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A transaction input spending a previous output.
///
/// Segwit spends carry an empty script_sig; the unlocking data lives in
/// `witness`, which is empty until the input is signed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in base units.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_varint(buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(&self.script_pubkey);
    }
}

/// A segwit-capable transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// True if any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Witness-stripped serialization (defines the txid).
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.legacy_size_hint());
        buf.extend_from_slice(&self.version.to_le_bytes());
        self.write_inputs_and_outputs(&mut buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Full wire serialization; falls back to legacy when no input has a witness.
    pub fn serialize(&self) -> Vec<u8> {
        if !self.has_witness() {
            return self.serialize_legacy();
        }
        let mut buf = Vec::with_capacity(self.legacy_size_hint() + 110 * self.inputs.len());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(SEGWIT_MARKER);
        buf.push(SEGWIT_FLAG);
        self.write_inputs_and_outputs(&mut buf);
        for input in &self.inputs {
            write_varint(&mut buf, input.witness.len() as u64);
            for item in &input.witness {
                write_varint(&mut buf, item.len() as u64);
                buf.extend_from_slice(item);
            }
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Size in bytes of the witness-stripped serialization.
    pub fn base_size(&self) -> usize {
        self.serialize_legacy().len()
    }

    /// Size in bytes of the full serialization.
    pub fn total_size(&self) -> usize {
        self.serialize().len()
    }

    /// Virtual size: weight / 4, rounded up.
    pub fn vsize(&self) -> usize {
        let weight = self.base_size() * (WITNESS_SCALE_FACTOR - 1) + self.total_size();
        weight.div_ceil(WITNESS_SCALE_FACTOR)
    }

    /// Transaction id: double SHA-256 of the witness-stripped form.
    ///
    /// Stable across signing since witnesses are excluded.
    pub fn txid(&self) -> Txid {
        Txid::hash(&self.serialize_legacy())
    }

    /// Witness transaction id: double SHA-256 of the full serialization.
    pub fn wtxid(&self) -> Txid {
        Txid::hash(&self.serialize())
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Hex of the full serialization, as accepted by broadcast endpoints.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Parse a legacy or segwit wire serialization.
    ///
    /// Input scripts must be empty; trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader { bytes, pos: 0 };
        let version = r.u32()?;

        let mut segwit = false;
        if r.peek() == Some(SEGWIT_MARKER) {
            r.take(1)?;
            if r.u8()? != SEGWIT_FLAG {
                return Err(TransactionError::Deserialization("bad segwit flag".into()));
            }
            segwit = true;
        }

        let n_in = r.count()?;
        let mut inputs = Vec::with_capacity(n_in.min(1024));
        for _ in 0..n_in {
            let mut txid = [0u8; 32];
            txid.copy_from_slice(r.take(32)?);
            let vout = r.u32()?;
            if r.count()? != 0 {
                return Err(TransactionError::Deserialization("non-empty script_sig".into()));
            }
            inputs.push(TxInput {
                previous_output: OutPoint { txid: Txid(txid), vout },
                sequence: r.u32()?,
                witness: Vec::new(),
            });
        }

        let n_out = r.count()?;
        let mut outputs = Vec::with_capacity(n_out.min(1024));
        for _ in 0..n_out {
            let value = r.u64()?;
            let len = r.count()?;
            outputs.push(TxOutput {
                value,
                script_pubkey: r.take(len)?.to_vec(),
            });
        }

        if segwit {
            for input in &mut inputs {
                let items = r.count()?;
                for _ in 0..items {
                    let len = r.count()?;
                    input.witness.push(r.take(len)?.to_vec());
                }
            }
        }

        let lock_time = r.u32()?;
        if r.pos != bytes.len() {
            return Err(TransactionError::Deserialization(format!(
                "{} trailing bytes",
                bytes.len() - r.pos
            )));
        }
        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    fn write_inputs_and_outputs(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.previous_output.write_to(buf);
            // script_sig is always empty for witness spends
            write_varint(buf, 0);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(buf);
        }
    }

    fn legacy_size_hint(&self) -> usize {
        10 + 41 * self.inputs.len() + 43 * self.outputs.len()
    }
}

/// A spendable output as returned by the ledger, after parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub script_pubkey: Vec<u8>,
    /// Value in base units.
    pub amount: u64,
    pub confirmations: i64,
}

/// Wire form of a UTXO as reported by a ledger service.
///
/// `txid` is in display (reversed) byte order and `script_pub_key` is hex.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UtxoRecord {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    pub amount: u64,
    #[serde(default)]
    pub confirmations: i64,
}

impl TryFrom<&UtxoRecord> for Utxo {
    type Error = TransactionError;

    fn try_from(record: &UtxoRecord) -> Result<Self, Self::Error> {
        let txid = record.txid.parse::<Txid>()?;
        let script_pubkey = hex::decode(&record.script_pub_key).map_err(|e| {
            TransactionError::MalformedScript(format!("{}:{}: {e}", record.txid, record.vout))
        })?;
        Ok(Utxo {
            outpoint: OutPoint {
                txid,
                vout: record.vout,
            },
            script_pubkey,
            amount: record.amount,
            confirmations: record.confirmations,
        })
    }
}

impl From<&Utxo> for UtxoRecord {
    fn from(utxo: &Utxo) -> Self {
        UtxoRecord {
            txid: utxo.outpoint.txid.to_string(),
            vout: utxo.outpoint.vout,
            script_pub_key: hex::encode(&utxo.script_pubkey),
            amount: utxo.amount,
            confirmations: utxo.confirmations,
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| TransactionError::Deserialization("unexpected end of data".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn u8(&mut self) -> Result<u8, TransactionError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, TransactionError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, TransactionError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    /// CompactSize length, bounded by the bytes left.
    fn count(&mut self) -> Result<usize, TransactionError> {
        let n = match self.u8()? {
            0xfd => {
                let mut b = [0u8; 2];
                b.copy_from_slice(self.take(2)?);
                u16::from_le_bytes(b) as u64
            }
            0xfe => self.u32()? as u64,
            0xff => self.u64()?,
            n => n as u64,
        };
        let remaining = (self.bytes.len() - self.pos) as u64;
        if n > remaining {
            return Err(TransactionError::Deserialization(format!(
                "count {n} exceeds remaining {remaining} bytes"
            )));
        }
        Ok(n as usize)
    }
}

/// Append a CompactSize unsigned integer.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COIN, SEQUENCE_FINAL};

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                previous_output: OutPoint {
                    txid: Txid([0x11; 32]),
                    vout: 3,
                },
                sequence: SEQUENCE_FINAL,
                witness: vec![],
            }],
            outputs: vec![TxOutput {
                value: COIN,
                script_pubkey: {
                    let mut s = vec![0x00, 0x14];
                    s.extend_from_slice(&[0xAA; 20]);
                    s
                },
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn txid_display_is_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = 0xff;
        let txid = Txid(bytes);
        let shown = txid.to_string();
        assert!(shown.starts_with("ff"));
        assert!(shown.ends_with("01"));
        assert_eq!(shown.parse::<Txid>().unwrap(), txid);
    }

    #[test]
    fn txid_parse_rejects_bad_input() {
        assert!(matches!(
            "zz".parse::<Txid>(),
            Err(TransactionError::MalformedOutpoint(_))
        ));
        assert!(matches!(
            "abcd".parse::<Txid>(),
            Err(TransactionError::MalformedOutpoint(_))
        ));
    }

    #[test]
    fn varint_boundaries() {
        let cases: [(u64, usize); 6] = [
            (0, 1),
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (0x1_0000_0000, 9),
        ];
        for (n, len) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, n);
            assert_eq!(buf.len(), len, "varint length for {n}");
        }
    }

    #[test]
    fn legacy_size_one_in_one_p2wpkh_out() {
        // 4 version + 1 + 41 input + 1 + 31 output + 4 lock time
        assert_eq!(sample_tx().base_size(), 82);
    }

    #[test]
    fn serialize_without_witness_is_legacy() {
        let tx = sample_tx();
        assert!(!tx.has_witness());
        assert_eq!(tx.serialize(), tx.serialize_legacy());
        assert_eq!(tx.vsize(), tx.base_size());
    }

    #[test]
    fn witness_serialization_adds_marker_and_stack() {
        let mut tx = sample_tx();
        tx.inputs[0].witness = vec![vec![0x30; 71], vec![0x02; 33]];
        let full = tx.serialize();
        assert_eq!(full[4], SEGWIT_MARKER);
        assert_eq!(full[5], SEGWIT_FLAG);
        // marker + flag + stack count + two length-prefixed items
        assert_eq!(full.len(), tx.base_size() + 2 + 1 + 1 + 71 + 1 + 33);
        assert!(tx.vsize() < tx.total_size());
    }

    #[test]
    fn txid_ignores_witness() {
        let mut tx = sample_tx();
        let before = tx.txid();
        tx.inputs[0].witness = vec![vec![1, 2, 3]];
        assert_eq!(tx.txid(), before);
        assert_ne!(tx.wtxid(), before);
    }

    #[test]
    fn parse_legacy_and_witness_forms() {
        let mut tx = sample_tx();
        assert_eq!(Transaction::from_bytes(&tx.serialize()).unwrap(), tx);
        tx.inputs[0].witness = vec![vec![0x30; 71], vec![0x02; 33]];
        let parsed = Transaction::from_bytes(&tx.serialize()).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(parsed.txid(), tx.txid());
    }

    #[test]
    fn parse_rejects_truncated_and_trailing() {
        let raw = sample_tx().serialize();
        assert!(matches!(
            Transaction::from_bytes(&raw[..raw.len() - 1]),
            Err(TransactionError::Deserialization(_))
        ));
        let mut long = raw.clone();
        long.push(0);
        assert!(matches!(
            Transaction::from_bytes(&long),
            Err(TransactionError::Deserialization(_))
        ));
    }

    #[test]
    fn parse_rejects_huge_count() {
        // version, then an input count far beyond the data
        let raw = [1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff, 0x7f];
        assert!(Transaction::from_bytes(&raw).is_err());
    }

    #[test]
    fn total_output_value_overflow() {
        let mut tx = sample_tx();
        tx.outputs.push(TxOutput {
            value: u64::MAX,
            script_pubkey: vec![],
        });
        assert_eq!(tx.total_output_value(), None);
    }

    #[test]
    fn utxo_record_parses() {
        let record = UtxoRecord {
            txid: "11".repeat(32),
            vout: 1,
            script_pub_key: format!("0014{}", "aa".repeat(20)),
            amount: 5_000,
            confirmations: 6,
        };
        let utxo = Utxo::try_from(&record).unwrap();
        assert_eq!(utxo.outpoint.vout, 1);
        assert_eq!(utxo.script_pubkey.len(), 22);
        assert_eq!(UtxoRecord::from(&utxo), record);
    }

    #[test]
    fn utxo_record_bad_script() {
        let record = UtxoRecord {
            txid: "11".repeat(32),
            vout: 0,
            script_pub_key: "not hex".into(),
            amount: 1,
            confirmations: 0,
        };
        assert!(matches!(
            Utxo::try_from(&record),
            Err(TransactionError::MalformedScript(_))
        ));
    }

    #[test]
    fn utxo_record_json_field_names() {
        let json = format!(
            r#"{{"txid":"{}","vout":2,"scriptPubKey":"0014{}","amount":42}}"#,
            "22".repeat(32),
            "bb".repeat(20)
        );
        let record: UtxoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.vout, 2);
        assert_eq!(record.amount, 42);
        assert_eq!(record.confirmations, 0);
    }
}
