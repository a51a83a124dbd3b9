//! The unspent transaction output set

use crate::transaction::OutPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An unspent transaction output: a confirmed output not yet consumed by a
/// later input. Entries are logical copies of the output data and are never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub out_point: OutPoint,
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl Utxo {
    pub fn new(out_point: OutPoint, value: u64, script_pubkey: Vec<u8>) -> Utxo {
        Utxo {
            out_point,
            value,
            script_pubkey,
        }
    }
}

/// The set of unspent outputs, keyed by the full outpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, Utxo>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        UtxoSet {
            entries: HashMap::new(),
        }
    }

    /// Inserts an entry, replacing any previous entry at the same outpoint.
    pub fn add(&mut self, utxo: Utxo) {
        self.entries.insert(utxo.out_point, utxo);
    }

    /// Removes the entry at an outpoint; true iff it was present.
    pub fn remove(&mut self, out_point: &OutPoint) -> bool {
        self.entries.remove(out_point).is_some()
    }

    pub fn find(&self, out_point: &OutPoint) -> Option<&Utxo> {
        self.entries.get(out_point)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all stored values.
    pub fn total_value(&self) -> u64 {
        self.entries.values().map(|utxo| utxo.value).sum()
    }

    /// True iff the outpoint exists and holds at least `amount`.
    pub fn validate_spend(&self, out_point: &OutPoint, amount: u64) -> bool {
        match self.find(out_point) {
            Some(utxo) => utxo.value >= amount,
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn all(&self) -> Vec<&Utxo> {
        self.entries.values().collect()
    }
}
