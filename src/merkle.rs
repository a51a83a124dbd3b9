//! Merkle root computation over transaction ids

use crate::hash::{double_sha256, Hash256};

/// Computes the merkle root of a sequence of transaction ids, in block
/// order. Levels with an odd count pair the last element with itself. An
/// empty sequence yields the zero hash; a single id is its own root.
pub fn merkle_root(txids: &[Hash256]) -> Hash256 {
    if txids.is_empty() {
        return Hash256::ZERO;
    }
    if txids.len() == 1 {
        return txids[0];
    }

    let mut level = txids.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let left = pair[0];
            let right = if pair.len() == 2 { pair[1] } else { pair[0] };
            next.push(combine(&left, &right));
        }
        level = next;
    }
    level[0]
}

fn combine(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_bytes());
    buf[32..].copy_from_slice(right.as_bytes());
    double_sha256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Hash256 {
        Hash256::from_byte_array([byte; 32])
    }

    #[test]
    fn test_empty_input_yields_zero() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn test_single_txid_is_its_own_root() {
        assert_eq!(merkle_root(&[id(0xab)]), id(0xab));
    }

    #[test]
    fn test_pair_combines_once() {
        let root = merkle_root(&[id(1), id(2)]);
        assert_eq!(root, combine(&id(1), &id(2)));
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        // Three leaves: level one is [h(1,2), h(3,3)].
        let root = merkle_root(&[id(1), id(2), id(3)]);
        let left = combine(&id(1), &id(2));
        let right = combine(&id(3), &id(3));
        assert_eq!(root, combine(&left, &right));
    }

    #[test]
    fn test_four_leaves() {
        let root = merkle_root(&[id(1), id(2), id(3), id(4)]);
        let left = combine(&id(1), &id(2));
        let right = combine(&id(3), &id(4));
        assert_eq!(root, combine(&left, &right));
    }

    #[test]
    fn test_order_sensitive() {
        assert_ne!(merkle_root(&[id(1), id(2)]), merkle_root(&[id(2), id(1)]));
    }
}
