//! Error types for the consensus core
//!
//! Every failure is surfaced to the caller as a `Result`; nothing is logged
//! or retried inside the core. Each component has its own error enum, and
//! [`Error`] aggregates them for callers that cross component boundaries.

use thiserror::Error;

/// Errors from the binary codec layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("truncated variable-length integer")]
    TruncatedVarInt,

    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    HashLengthMismatch { expected: usize, actual: usize },

    #[error("invalid hex string: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("count too large: {0}")]
    CountTooLarge(u64),

    #[error("unexpected end of data: wanted {wanted} bytes, {remaining} remain")]
    UnexpectedEof { wanted: usize, remaining: usize },
}

/// Errors from structural transaction validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("duplicate input at index {index}")]
    DuplicateInput { index: usize },

    #[error("output {index} value {value} exceeds maximum")]
    OutputValueOverflow { index: usize, value: u64 },

    #[error("total output value exceeds maximum")]
    TotalOverflow,
}

/// Errors from structural block validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block has no transactions")]
    Empty,

    #[error("first transaction is not coinbase")]
    FirstNotCoinbase,

    #[error("transaction {index} is coinbase (only the first may be)")]
    ExtraCoinbase { index: usize },

    #[error("block size {size} exceeds maximum")]
    OversizedBytes { size: usize },

    #[error("block weight {weight} exceeds maximum")]
    OversizedWeight { weight: usize },

    #[error("block timestamp too far in the future")]
    TimestampTooFarInFuture,

    #[error("transaction {index} invalid: {source}")]
    InvalidTransaction {
        index: usize,
        source: TransactionError,
    },
}

/// Errors raised by the script interpreter. Each carries the offending
/// opcode byte and the program-counter position where it was dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("opcode 0x{op:02x} at position {pc}: insufficient stack items")]
    InsufficientStack { op: u8, pc: usize },

    #[error("push at position {pc} extends past the end of the script")]
    PushBeyondEnd { pc: usize },

    #[error("opcode 0x{op:02x} at position {pc}: verification failed")]
    VerifyFailed { op: u8, pc: usize },

    #[error("unimplemented opcode 0x{code:02x} at position {pc}")]
    UnimplementedOpcode { code: u8, pc: usize },
}

/// Errors from the chain manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block validation failed: {0}")]
    Block(#[from] BlockError),

    #[error("invalid previous block hash")]
    InvalidPrevHash,

    #[error("invalid proof of work")]
    InvalidProofOfWork,

    #[error("block does not connect to any known block")]
    UnconnectedBlock,

    #[error("fork block validation failed: {0}")]
    ForkValidation(Box<ChainError>),
}

/// Errors from the peer message envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("message too short")]
    TooShort,

    #[error("invalid magic bytes")]
    BadMagic,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("incomplete message")]
    Incomplete,

    #[error("invalid checksum")]
    BadChecksum,
}

/// Aggregate error for callers that cross component boundaries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Framing(#[from] FramingError),
}

pub type Result<T> = std::result::Result<T, Error>;
