//! Transaction model: inputs, outputs, witnesses, identities, validation

use crate::constants::{COINBASE_INDEX, MAX_MONEY};
use crate::encode::{encode_varint, write_hash, ByteReader};
use crate::error::{EncodingError, TransactionError};
use crate::hash::{double_sha256, Hash256};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A reference to a prior transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> OutPoint {
        OutPoint { txid, index }
    }

    /// The null outpoint referenced by a coinbase input.
    pub fn null() -> OutPoint {
        OutPoint {
            txid: Hash256::ZERO,
            index: COINBASE_INDEX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.index == COINBASE_INDEX
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction input, with its witness stack when spending a SegWit output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TxInput {
    pub fn new(previous: OutPoint, script_sig: Vec<u8>, sequence: u32) -> TxInput {
        TxInput {
            previous,
            script_sig,
            sequence,
            witness: Vec::new(),
        }
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> TxOutput {
        TxOutput {
            value,
            script_pubkey,
        }
    }
}

/// A Bitcoin transaction.
///
/// The txid and wtxid are computed from the consensus serialization on first
/// demand and cached; the fields are treated as immutable once either
/// identity has been observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,

    #[serde(skip)]
    txid: OnceCell<Hash256>,
    #[serde(skip)]
    wtxid: OnceCell<Hash256>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Transaction) -> bool {
        self.version == other.version
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.lock_time == other.lock_time
    }
}

impl Eq for Transaction {}

impl Transaction {
    pub fn new(
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u32,
    ) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            txid: OnceCell::new(),
            wtxid: OnceCell::new(),
        }
    }

    /// True iff any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// True iff this is a coinbase transaction: a single input spending the
    /// null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous.is_null()
    }

    /// Sum of all output values. Saturates; `validate` rejects overflow.
    pub fn total_output(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |sum, output| sum.saturating_add(output.value))
    }

    /// Serializes to consensus wire format, with the SegWit marker/flag and
    /// per-input witness stacks when witness data is present.
    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_inner(self.has_witness())
    }

    /// Serializes to the legacy wire format, witness data omitted.
    pub fn serialize_without_witness(&self) -> Vec<u8> {
        self.serialize_inner(false)
    }

    fn serialize_inner(&self, with_witness: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());

        if with_witness {
            buf.push(0x00); // marker
            buf.push(0x01); // flag
        }

        buf.extend_from_slice(&encode_varint(self.inputs.len() as u64));
        for input in &self.inputs {
            write_hash(&mut buf, &input.previous.txid);
            buf.extend_from_slice(&input.previous.index.to_le_bytes());
            buf.extend_from_slice(&encode_varint(input.script_sig.len() as u64));
            buf.extend_from_slice(&input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        buf.extend_from_slice(&encode_varint(self.outputs.len() as u64));
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
            buf.extend_from_slice(&output.script_pubkey);
        }

        if with_witness {
            for input in &self.inputs {
                buf.extend_from_slice(&encode_varint(input.witness.len() as u64));
                for element in &input.witness {
                    buf.extend_from_slice(&encode_varint(element.len() as u64));
                    buf.extend_from_slice(element);
                }
            }
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Deserializes from consensus wire format, detecting the SegWit form by
    /// the marker/flag bytes after the version.
    pub fn deserialize(data: &[u8]) -> Result<Transaction, EncodingError> {
        let mut reader = ByteReader::new(data);
        let version = reader.read_u32_le()?;

        let has_witness = reader.peek(0) == Some(0x00) && reader.peek(1) == Some(0x01);
        if has_witness {
            reader.read_u8()?;
            reader.read_u8()?;
        }

        let input_count = reader.read_length()?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let txid = reader.read_hash()?;
            let index = reader.read_u32_le()?;
            let script_len = reader.read_length()?;
            let script_sig = reader.read_bytes(script_len)?;
            let sequence = reader.read_u32_le()?;
            inputs.push(TxInput::new(
                OutPoint::new(txid, index),
                script_sig,
                sequence,
            ));
        }

        let output_count = reader.read_length()?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = reader.read_u64_le()?;
            let script_len = reader.read_length()?;
            let script_pubkey = reader.read_bytes(script_len)?;
            outputs.push(TxOutput::new(value, script_pubkey));
        }

        if has_witness {
            for input in inputs.iter_mut() {
                let element_count = reader.read_length()?;
                let mut stack = Vec::with_capacity(element_count);
                for _ in 0..element_count {
                    let element_len = reader.read_length()?;
                    stack.push(reader.read_bytes(element_len)?);
                }
                input.witness = stack;
            }
        }

        let lock_time = reader.read_u32_le()?;
        Ok(Transaction::new(version, inputs, outputs, lock_time))
    }

    /// Transaction id: double SHA-256 of the legacy serialization, in
    /// display order. Cached after the first computation.
    pub fn txid(&self) -> Hash256 {
        *self
            .txid
            .get_or_init(|| double_sha256(&self.serialize_without_witness()).reversed())
    }

    /// Witness transaction id: double SHA-256 of the full serialization.
    /// Equals the txid for transactions without witness data.
    pub fn wtxid(&self) -> Hash256 {
        *self
            .wtxid
            .get_or_init(|| double_sha256(&self.serialize()).reversed())
    }

    /// Serialized size without witness data.
    pub fn base_size(&self) -> usize {
        self.serialize_without_witness().len()
    }

    /// Serialized size including witness data.
    pub fn total_size(&self) -> usize {
        self.serialize().len()
    }

    /// BIP141 weight: base size times three plus total size.
    pub fn weight(&self) -> usize {
        self.base_size() * 3 + self.total_size()
    }

    /// Structural validation: non-empty inputs and outputs, no duplicate
    /// spends, per-output and total value bounds.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.inputs.is_empty() {
            return Err(TransactionError::NoInputs);
        }
        if self.outputs.is_empty() {
            return Err(TransactionError::NoOutputs);
        }

        let mut seen = HashSet::new();
        for (index, input) in self.inputs.iter().enumerate() {
            if !seen.insert(input.previous) {
                return Err(TransactionError::DuplicateInput { index });
            }
        }

        let mut total: u64 = 0;
        for (index, output) in self.outputs.iter().enumerate() {
            if output.value > MAX_MONEY {
                return Err(TransactionError::OutputValueOverflow {
                    index,
                    value: output.value,
                });
            }
            total = total
                .checked_add(output.value)
                .ok_or(TransactionError::TotalOverflow)?;
        }
        if total > MAX_MONEY {
            return Err(TransactionError::TotalOverflow);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction::new(
            1,
            vec![TxInput::new(
                OutPoint::new(Hash256::ZERO, 0),
                vec![0x51],
                0xffff_ffff,
            )],
            vec![TxOutput::new(50_0000_0000, vec![0x51])],
            0,
        )
    }

    #[test]
    fn test_coinbase_detection() {
        let coinbase = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::null(), vec![0x01, 0x02], 0xffff_ffff)],
            vec![TxOutput::new(50_0000_0000, vec![])],
            0,
        );
        assert!(coinbase.is_coinbase());
        assert!(!sample_tx().is_coinbase());
    }

    #[test]
    fn test_coinbase_requires_single_input() {
        let tx = Transaction::new(
            1,
            vec![
                TxInput::new(OutPoint::null(), vec![], 0xffff_ffff),
                TxInput::new(OutPoint::new(Hash256::ZERO, 1), vec![], 0xffff_ffff),
            ],
            vec![TxOutput::new(1000, vec![])],
            0,
        );
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_serialize_round_trip_legacy() {
        let tx = sample_tx();
        let bytes = tx.serialize();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_serialize_round_trip_witness() {
        let mut tx = sample_tx();
        tx.inputs[0].witness = vec![vec![0xde, 0xad], vec![]];
        let bytes = tx.serialize();
        // Marker and flag follow the version.
        assert_eq!(bytes[4], 0x00);
        assert_eq!(bytes[5], 0x01);
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.has_witness());
    }

    #[test]
    fn test_txid_stable_and_wtxid_differs_with_witness() {
        let tx = sample_tx();
        assert_eq!(tx.txid(), tx.wtxid());

        let mut with_witness = sample_tx();
        with_witness.inputs[0].witness = vec![vec![0x01]];
        assert_ne!(with_witness.txid(), with_witness.wtxid());
        // Witness data never changes the txid.
        assert_eq!(with_witness.txid(), sample_tx().txid());
    }

    #[test]
    fn test_txid_memoised() {
        let tx = sample_tx();
        let first = tx.txid();
        assert_eq!(first, tx.txid());
        assert!(!first.is_zero());
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_tx().validate().is_ok());
    }

    #[test]
    fn test_validate_no_inputs() {
        let tx = Transaction::new(1, vec![], vec![TxOutput::new(1, vec![])], 0);
        assert_eq!(tx.validate(), Err(TransactionError::NoInputs));
    }

    #[test]
    fn test_validate_no_outputs() {
        let tx = Transaction::new(1, vec![TxInput::new(OutPoint::null(), vec![], 0)], vec![], 0);
        assert_eq!(tx.validate(), Err(TransactionError::NoOutputs));
    }

    #[test]
    fn test_validate_duplicate_input() {
        let point = OutPoint::new(Hash256::ZERO, 7);
        let tx = Transaction::new(
            1,
            vec![
                TxInput::new(point, vec![], 0),
                TxInput::new(point, vec![], 0),
            ],
            vec![TxOutput::new(1, vec![])],
            0,
        );
        assert_eq!(
            tx.validate(),
            Err(TransactionError::DuplicateInput { index: 1 })
        );
    }

    #[test]
    fn test_validate_output_value_overflow() {
        let tx = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::null(), vec![], 0)],
            vec![TxOutput::new(MAX_MONEY + 1, vec![])],
            0,
        );
        assert_eq!(
            tx.validate(),
            Err(TransactionError::OutputValueOverflow {
                index: 0,
                value: MAX_MONEY + 1
            })
        );
    }

    #[test]
    fn test_validate_total_overflow() {
        let tx = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::null(), vec![], 0)],
            vec![TxOutput::new(MAX_MONEY, vec![]), TxOutput::new(1, vec![])],
            0,
        );
        assert_eq!(tx.validate(), Err(TransactionError::TotalOverflow));
    }

    #[test]
    fn test_deserialize_truncated() {
        let tx = sample_tx();
        let bytes = tx.serialize();
        assert!(Transaction::deserialize(&bytes[..bytes.len() - 1]).is_err());
        assert!(Transaction::deserialize(&[]).is_err());
    }

    #[test]
    fn test_weight_without_witness_is_four_times_size() {
        let tx = sample_tx();
        assert_eq!(tx.weight(), tx.total_size() * 4);
    }
}
