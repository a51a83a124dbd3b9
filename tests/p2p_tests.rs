//! Integration tests for the peer message envelope and handshake gate

use consensus_core::constants::{MAGIC_MAINNET, MAX_PAYLOAD_SIZE, MESSAGE_HEADER_SIZE};
use consensus_core::error::FramingError;
use consensus_core::p2p::{validate_message, NetworkMessage, Peer};

#[test]
fn test_envelope_layout() {
    let message = NetworkMessage::new("version", b"payload-bytes".to_vec());
    let bytes = message.serialize().unwrap();

    assert_eq!(bytes.len(), MESSAGE_HEADER_SIZE + 13);
    assert_eq!(&bytes[0..4], &MAGIC_MAINNET.to_le_bytes());
    assert_eq!(&bytes[4..11], b"version");
    assert!(bytes[11..16].iter().all(|&b| b == 0));
    assert_eq!(&bytes[16..20], &13u32.to_le_bytes());
    assert_eq!(&bytes[24..], b"payload-bytes");
}

#[test]
fn test_checksum_of_empty_payload() {
    // First four bytes of double SHA-256 of the empty string.
    let bytes = NetworkMessage::new("verack", vec![]).serialize().unwrap();
    assert_eq!(&bytes[20..24], &[0x5d, 0xf6, 0xe0, 0xe2]);
}

#[test]
fn test_round_trip_strips_command_padding() {
    let original = NetworkMessage::new("tx", vec![0xaa, 0xbb, 0xcc]);
    let decoded = NetworkMessage::deserialize(&original.serialize().unwrap()).unwrap();
    assert_eq!(decoded.command(), "tx");
    assert_eq!(decoded.payload(), &[0xaa, 0xbb, 0xcc]);
    assert_eq!(decoded, original);
}

#[test]
fn test_error_ordering() {
    let good = NetworkMessage::new("ping", vec![1, 2, 3, 4]).serialize().unwrap();

    // Shorter than a header.
    assert_eq!(
        NetworkMessage::deserialize(&good[..MESSAGE_HEADER_SIZE - 1]),
        Err(FramingError::TooShort)
    );

    // Wrong magic wins over everything after it.
    let mut bad_magic = good.clone();
    bad_magic[1] ^= 0x55;
    assert_eq!(
        NetworkMessage::deserialize(&bad_magic),
        Err(FramingError::BadMagic)
    );

    // Oversized declared length.
    let mut oversized = good.clone();
    oversized[16..20].copy_from_slice(&((MAX_PAYLOAD_SIZE + 1) as u32).to_le_bytes());
    assert_eq!(
        NetworkMessage::deserialize(&oversized),
        Err(FramingError::PayloadTooLarge)
    );

    // Declared length exceeding the buffer.
    assert_eq!(
        NetworkMessage::deserialize(&good[..good.len() - 2]),
        Err(FramingError::Incomplete)
    );

    // Flipped payload byte breaks the checksum.
    let mut corrupted = good;
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xff;
    assert_eq!(
        NetworkMessage::deserialize(&corrupted),
        Err(FramingError::BadChecksum)
    );
}

#[test]
fn test_validate_message_predicate() {
    let bytes = NetworkMessage::new("headers", vec![0x00]).serialize().unwrap();
    assert!(validate_message(&bytes));

    let mut corrupted = bytes;
    corrupted[21] ^= 0x01;
    assert!(!validate_message(&corrupted));
}

#[test]
fn test_trailing_bytes_are_tolerated() {
    // Parsing stops at the declared payload length.
    let mut bytes = NetworkMessage::new("inv", vec![7, 8]).serialize().unwrap();
    bytes.extend_from_slice(&[0xde, 0xad]);
    let decoded = NetworkMessage::deserialize(&bytes).unwrap();
    assert_eq!(decoded.payload(), &[7, 8]);
}

#[test]
fn test_handshake_gate() {
    let remote = Peer::new("203.0.113.7:8333");
    assert!(!remote.perform_handshake(60002));
    assert!(!remote.perform_handshake(70000));
    assert!(remote.perform_handshake(70001));
    assert!(remote.perform_handshake(70016));

    // The local sentinel is treated as "no peer listening".
    let local = Peer::new("127.0.0.1:8333");
    assert!(!local.perform_handshake(70016));
    assert_eq!(local.address(), "127.0.0.1:8333");
}

#[test]
fn test_close_before_connect_is_noop() {
    let mut peer = Peer::new("203.0.113.7:8333");
    assert!(!peer.is_connected());
    assert!(peer.close().is_ok());
    assert!(peer.close().is_ok());
    assert!(!peer.is_connected());
}
