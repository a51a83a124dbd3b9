//! Bitcoin consensus and network constants

/// Maximum money supply: 21,000,000 BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Maximum serialized block size in bytes (legacy limit)
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

/// Maximum block weight in weight units (BIP141)
pub const MAX_BLOCK_WEIGHT: usize = 4_000_000;

/// Difficulty adjustment interval: 2016 blocks
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 2016;

/// Target time per block: 10 minutes
pub const TARGET_TIME_PER_BLOCK: u64 = 600;

/// Expected timespan of one difficulty period: two weeks in seconds
pub const TARGET_TIMESPAN: u32 = 14 * 24 * 60 * 60;

/// Compact target of minimum difficulty
pub const MAX_TARGET_BITS: u32 = 0x1d00ffff;

/// Output index of the null outpoint marking a coinbase input
pub const COINBASE_INDEX: u32 = 0xffff_ffff;

/// Maximum allowed drift of a header timestamp into the future: 2 hours
pub const MAX_FUTURE_BLOCK_TIME: u64 = 2 * 60 * 60;

/// Lock time threshold: lock times below this are block heights
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number of a final input
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Mainnet network magic
pub const MAGIC_MAINNET: u32 = 0xd9b4_bef9;

/// Size of the peer message envelope header
pub const MESSAGE_HEADER_SIZE: usize = 24;

/// Maximum peer message payload: 32 MiB
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

/// Oldest protocol version a peer handshake accepts
pub const MIN_PROTOCOL_VERSION: u32 = 70001;

/// Largest count a serialized collection may declare
pub const MAX_SERIALIZED_COUNT: u64 = 0x7fff_ffff;
