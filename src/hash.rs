//! Fixed-width hash values and the double-SHA-256 primitive

use crate::error::EncodingError;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit hash in natural (display) byte order.
///
/// Serialized transactions and block headers carry these byte-reversed; the
/// reversal happens at the codec layer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Builds a hash from a 32-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Hash256, EncodingError> {
        if bytes.len() != 32 {
            return Err(EncodingError::HashLengthMismatch {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(bytes);
        Ok(Hash256(hash))
    }

    /// Parses a natural-order hex string.
    pub fn from_hex(s: &str) -> Result<Hash256, EncodingError> {
        let bytes = hex::decode(s)?;
        Hash256::from_bytes(&bytes)
    }

    pub fn from_byte_array(bytes: [u8; 32]) -> Hash256 {
        Hash256(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_byte_array(self) -> [u8; 32] {
        self.0
    }

    /// Returns a byte-reversed copy, as embedded in wire serializations.
    pub fn reversed(&self) -> Hash256 {
        let mut bytes = self.0;
        bytes.reverse();
        Hash256(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A 160-bit hash used for address hashes. Never byte-reversed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash160([u8; 20]);

impl Hash160 {
    /// The all-zero hash.
    pub const ZERO: Hash160 = Hash160([0u8; 20]);

    /// Builds a hash from a 20-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Hash160, EncodingError> {
        if bytes.len() != 20 {
            return Err(EncodingError::HashLengthMismatch {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(bytes);
        Ok(Hash160(hash))
    }

    /// Parses a hex string.
    pub fn from_hex(s: &str) -> Result<Hash160, EncodingError> {
        let bytes = hex::decode(s)?;
        Hash160::from_bytes(&bytes)
    }

    pub fn from_byte_array(bytes: [u8; 20]) -> Hash160 {
        Hash160(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SHA256(SHA256(data)).
pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&second);
    Hash256(hash)
}

/// RIPEMD160(SHA256(data)), the address-hash primitive.
pub fn hash160(data: &[u8]) -> Hash160 {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&ripe);
    Hash160(hash)
}
