//! Block model: the 80-byte header, block structure, identity, validation

use crate::constants::{MAX_BLOCK_SIZE, MAX_BLOCK_WEIGHT, MAX_FUTURE_BLOCK_TIME};
use crate::encode::{encode_varint, write_hash, ByteReader};
use crate::error::{BlockError, EncodingError};
use crate::hash::{double_sha256, Hash256};
use crate::merkle::merkle_root;
use crate::transaction::Transaction;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Serialized size of a block header.
pub const HEADER_SIZE: usize = 80;

/// A block header. The id is the double SHA-256 of the 80-byte
/// serialization, byte-reversed for display, cached on first demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,

    #[serde(skip)]
    id: OnceCell<Hash256>,
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &BlockHeader) -> bool {
        self.version == other.version
            && self.prev == other.prev
            && self.merkle_root == other.merkle_root
            && self.timestamp == other.timestamp
            && self.bits == other.bits
            && self.nonce == other.nonce
    }
}

impl Eq for BlockHeader {}

impl BlockHeader {
    pub fn new(
        version: u32,
        prev: Hash256,
        merkle_root: Hash256,
        timestamp: u32,
        bits: u32,
        nonce: u32,
    ) -> BlockHeader {
        BlockHeader {
            version,
            prev,
            merkle_root,
            timestamp,
            bits,
            nonce,
            id: OnceCell::new(),
        }
    }

    /// Serializes to the 80-byte wire format: little-endian integers with
    /// the embedded hashes byte-reversed.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_hash(&mut buf, &self.prev);
        write_hash(&mut buf, &self.merkle_root);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<BlockHeader, EncodingError> {
        let mut reader = ByteReader::new(data);
        let version = reader.read_u32_le()?;
        let prev = reader.read_hash()?;
        let merkle_root = reader.read_hash()?;
        let timestamp = reader.read_u32_le()?;
        let bits = reader.read_u32_le()?;
        let nonce = reader.read_u32_le()?;
        Ok(BlockHeader::new(
            version,
            prev,
            merkle_root,
            timestamp,
            bits,
            nonce,
        ))
    }

    /// Header id in display order. Cached after the first computation.
    pub fn id(&self) -> Hash256 {
        *self
            .id
            .get_or_init(|| double_sha256(&self.serialize()).reversed())
    }

    /// Rejects headers timestamped more than two hours into the future.
    pub fn validate(&self) -> Result<(), BlockError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if u64::from(self.timestamp) > now + MAX_FUTURE_BLOCK_TIME {
            return Err(BlockError::TimestampTooFarInFuture);
        }
        Ok(())
    }
}

/// A block: header plus transactions, with the chain height attached once
/// the block is connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    height: Option<i32>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Block) -> bool {
        self.header == other.header && self.transactions == other.transactions
    }
}

impl Eq for Block {}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Block {
        Block {
            header,
            transactions,
            height: None,
        }
    }

    /// Block id, which is the header id.
    pub fn id(&self) -> Hash256 {
        self.header.id()
    }

    pub fn height(&self) -> Option<i32> {
        self.height
    }

    pub fn set_height(&mut self, height: i32) {
        self.height = Some(height);
    }

    pub fn is_genesis(&self) -> bool {
        self.header.prev.is_zero()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn has_coinbase(&self) -> bool {
        self.transactions
            .first()
            .map(Transaction::is_coinbase)
            .unwrap_or(false)
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    /// Serializes the full block: header, transaction count, transactions.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.header.serialize();
        buf.extend_from_slice(&encode_varint(self.transactions.len() as u64));
        for tx in &self.transactions {
            buf.extend_from_slice(&tx.serialize());
        }
        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<Block, EncodingError> {
        if data.len() < HEADER_SIZE {
            return Err(EncodingError::UnexpectedEof {
                wanted: HEADER_SIZE,
                remaining: data.len(),
            });
        }
        let header = BlockHeader::deserialize(&data[..HEADER_SIZE])?;
        let mut reader = ByteReader::new(&data[HEADER_SIZE..]);
        let count = reader.read_length()?;
        let mut transactions = Vec::with_capacity(count);
        let mut offset = HEADER_SIZE + reader.position();
        for _ in 0..count {
            let tx = Transaction::deserialize(&data[offset..])?;
            offset += tx.total_size();
            transactions.push(tx);
        }
        Ok(Block::new(header, transactions))
    }

    /// Serialized size with witness data stripped.
    pub fn base_size(&self) -> usize {
        let mut size = HEADER_SIZE + encode_varint(self.transactions.len() as u64).len();
        for tx in &self.transactions {
            size += tx.base_size();
        }
        size
    }

    /// Full serialized size.
    pub fn total_size(&self) -> usize {
        self.serialize().len()
    }

    /// Serialized size of the block.
    pub fn size(&self) -> usize {
        self.total_size()
    }

    /// BIP141 weight: base size times three plus total size.
    pub fn weight(&self) -> usize {
        self.base_size() * 3 + self.total_size()
    }

    /// Merkle root over the transaction ids, in block order.
    pub fn compute_merkle_root(&self) -> Hash256 {
        let txids: Vec<Hash256> = self.transactions.iter().map(Transaction::txid).collect();
        merkle_root(&txids)
    }

    /// True iff the header commits to the transactions actually present.
    pub fn check_merkle_root(&self) -> bool {
        self.header.merkle_root == self.compute_merkle_root()
    }

    /// Structural validation: coinbase placement, per-transaction checks,
    /// size and weight limits.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.transactions.is_empty() {
            return Err(BlockError::Empty);
        }
        if !self.transactions[0].is_coinbase() {
            return Err(BlockError::FirstNotCoinbase);
        }
        for (index, tx) in self.transactions.iter().enumerate().skip(1) {
            if tx.is_coinbase() {
                return Err(BlockError::ExtraCoinbase { index });
            }
        }
        for (index, tx) in self.transactions.iter().enumerate() {
            tx.validate()
                .map_err(|source| BlockError::InvalidTransaction { index, source })?;
        }

        let size = self.size();
        if size > MAX_BLOCK_SIZE {
            return Err(BlockError::OversizedBytes { size });
        }
        let weight = self.weight();
        if weight > MAX_BLOCK_WEIGHT {
            return Err(BlockError::OversizedWeight { weight });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{OutPoint, TxInput, TxOutput};

    fn coinbase_tx() -> Transaction {
        Transaction::new(
            1,
            vec![TxInput::new(OutPoint::null(), vec![0x04], 0xffff_ffff)],
            vec![TxOutput::new(50_0000_0000, vec![0x51])],
            0,
        )
    }

    fn spend_tx() -> Transaction {
        Transaction::new(
            1,
            vec![TxInput::new(
                OutPoint::new(coinbase_tx().txid(), 0),
                vec![],
                0xffff_ffff,
            )],
            vec![TxOutput::new(10_0000_0000, vec![0x51])],
            0,
        )
    }

    fn sample_block() -> Block {
        let txs = vec![coinbase_tx(), spend_tx()];
        let root = merkle_root(&txs.iter().map(Transaction::txid).collect::<Vec<_>>());
        let header = BlockHeader::new(1, Hash256::ZERO, root, 1231006505, 0x1d00ffff, 1);
        Block::new(header, txs)
    }

    #[test]
    fn test_header_serializes_to_eighty_bytes() {
        let header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        assert_eq!(header.serialize().len(), HEADER_SIZE);
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_block().header;
        let decoded = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.id(), header.id());
    }

    #[test]
    fn test_genesis_header_id() {
        let merkle = Hash256::from_hex(
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
        )
        .unwrap();
        let header = BlockHeader::new(1, Hash256::ZERO, merkle, 1231006505, 0x1d00ffff, 2083236893);
        assert_eq!(
            header.id().to_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_block_round_trip() {
        let block = sample_block();
        let decoded = Block::deserialize(&block.serialize()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_block().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_block() {
        let header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        let block = Block::new(header, vec![]);
        assert_eq!(block.validate(), Err(BlockError::Empty));
    }

    #[test]
    fn test_validate_first_not_coinbase() {
        let header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        let block = Block::new(header, vec![spend_tx()]);
        assert_eq!(block.validate(), Err(BlockError::FirstNotCoinbase));
    }

    #[test]
    fn test_validate_extra_coinbase() {
        let header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        let block = Block::new(header, vec![coinbase_tx(), coinbase_tx()]);
        assert_eq!(block.validate(), Err(BlockError::ExtraCoinbase { index: 1 }));
    }

    #[test]
    fn test_validate_invalid_transaction_surfaces_index() {
        let bad = Transaction::new(
            1,
            vec![TxInput::new(OutPoint::new(Hash256::ZERO, 3), vec![], 0)],
            vec![],
            0,
        );
        let header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        let block = Block::new(header, vec![coinbase_tx(), bad]);
        assert!(matches!(
            block.validate(),
            Err(BlockError::InvalidTransaction { index: 1, .. })
        ));
    }

    #[test]
    fn test_header_timestamp_window() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;

        let near = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, now + 3600, 0x1d00ffff, 0);
        assert!(near.validate().is_ok());

        let far = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, now + 7201, 0x1d00ffff, 0);
        assert_eq!(far.validate(), Err(BlockError::TimestampTooFarInFuture));
    }

    #[test]
    fn test_merkle_binding() {
        let mut block = sample_block();
        assert!(block.check_merkle_root());
        block.header = BlockHeader::new(1, Hash256::ZERO, Hash256::ZERO, 0, 0x1d00ffff, 0);
        assert!(!block.check_merkle_root());
    }

    #[test]
    fn test_weight_no_witness() {
        let block = sample_block();
        assert_eq!(block.weight(), block.size() * 4);
        assert_eq!(block.base_size(), block.total_size());
    }

    #[test]
    fn test_height_attachment() {
        let mut block = sample_block();
        assert_eq!(block.height(), None);
        block.set_height(5);
        assert_eq!(block.height(), Some(5));
    }
}
