//! # Consensus Core
//!
//! An in-memory Bitcoin consensus core: bit-for-bit decoding and validation
//! of blocks and transactions, script execution over stacked byte values,
//! and an active chain with fork handling and an unspent-output set.
//!
//! ## Layout
//!
//! - `hash`, `encode`: hashing primitives and the wire codec
//! - `transaction`, `block`, `merkle`: the data model and its commitments
//! - `pow`: compact targets, hash checks, difficulty retargeting
//! - `script`, `script_type`: the interpreter and output classification
//! - `utxo`, `chain`: chain state under extension and reorganisation
//! - `p2p`: the peer message envelope and handshake gate
//!
//! The core is single-threaded and synchronous: every method completes
//! before the next call, nothing blocks, and no locks are taken. Embedders
//! that want parallelism fan work out around the core and keep a single
//! owner for the [`chain::Chain`] / [`utxo::UtxoSet`] pair.
//!
//! ## Example
//!
//! ```
//! use consensus_core::script::{flags, ScriptEngine};
//!
//! // OP_1 OP_2 OP_ADD
//! let mut engine = ScriptEngine::new(vec![0x51, 0x52, 0x93], flags::NONE);
//! engine.execute().unwrap();
//! assert_eq!(engine.stack(), &[vec![0x03]]);
//! ```

pub mod block;
pub mod chain;
pub mod constants;
pub mod encode;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod p2p;
pub mod pow;
pub mod script;
pub mod script_type;
pub mod transaction;
pub mod utxo;

pub use block::{Block, BlockHeader};
pub use chain::Chain;
pub use error::{
    BlockError, ChainError, EncodingError, Error, FramingError, Result, ScriptError,
    TransactionError,
};
pub use hash::{double_sha256, hash160, Hash160, Hash256};
pub use merkle::merkle_root;
pub use p2p::{NetworkMessage, Peer};
pub use pow::{adjust_difficulty, expand_target, validate_pow};
pub use script::ScriptEngine;
pub use script_type::{classify, ScriptType};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use utxo::{Utxo, UtxoSet};
