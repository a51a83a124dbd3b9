//! Peer message framing and the connection handshake gate

use crate::constants::{MAGIC_MAINNET, MAX_PAYLOAD_SIZE, MESSAGE_HEADER_SIZE, MIN_PROTOCOL_VERSION};
use crate::error::FramingError;
use crate::hash::double_sha256;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// How long a peer dial may take before it is abandoned.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Local sentinel address treated as "no peer listening".
const LOCAL_SENTINEL: &str = "127.0.0.1:8333";

/// A framed peer message: a command name and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMessage {
    command: String,
    payload: Vec<u8>,
}

impl NetworkMessage {
    pub fn new(command: &str, payload: Vec<u8>) -> NetworkMessage {
        NetworkMessage {
            command: command.to_string(),
            payload,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serializes the envelope: magic, NUL-padded command, payload length,
    /// the first four bytes of the payload's double SHA-256, then the
    /// payload itself.
    pub fn serialize(&self) -> Result<Vec<u8>, FramingError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FramingError::PayloadTooLarge);
        }

        let mut buf = Vec::with_capacity(MESSAGE_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&MAGIC_MAINNET.to_le_bytes());

        let mut command = [0u8; 12];
        for (slot, byte) in command.iter_mut().zip(self.command.bytes()) {
            *slot = byte;
        }
        buf.extend_from_slice(&command);

        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());

        let checksum = double_sha256(&self.payload);
        buf.extend_from_slice(&checksum.as_bytes()[..4]);

        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parses an envelope, verifying magic, declared length, and checksum.
    pub fn deserialize(data: &[u8]) -> Result<NetworkMessage, FramingError> {
        if data.len() < MESSAGE_HEADER_SIZE {
            return Err(FramingError::TooShort);
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[0..4]);
        if u32::from_le_bytes(magic) != MAGIC_MAINNET {
            return Err(FramingError::BadMagic);
        }

        let command_bytes = &data[4..16];
        let end = command_bytes
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(command_bytes.len());
        let command = String::from_utf8_lossy(&command_bytes[..end]).into_owned();

        let mut length = [0u8; 4];
        length.copy_from_slice(&data[16..20]);
        let payload_len = u32::from_le_bytes(length) as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(FramingError::PayloadTooLarge);
        }

        if data.len() < MESSAGE_HEADER_SIZE + payload_len {
            return Err(FramingError::Incomplete);
        }

        let payload = data[MESSAGE_HEADER_SIZE..MESSAGE_HEADER_SIZE + payload_len].to_vec();
        let checksum = double_sha256(&payload);
        if checksum.as_bytes()[..4] != data[20..24] {
            return Err(FramingError::BadChecksum);
        }

        Ok(NetworkMessage { command, payload })
    }
}

/// True iff the bytes parse as a well-formed message.
pub fn validate_message(data: &[u8]) -> bool {
    NetworkMessage::deserialize(data).is_ok()
}

/// A peer connection slot. Holds at most one TCP stream; closing twice is a
/// no-op.
pub struct Peer {
    address: String,
    stream: Option<TcpStream>,
}

impl Peer {
    pub fn new(address: &str) -> Peer {
        Peer {
            address: address.to_string(),
            stream: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Dials the peer with a ten-second deadline.
    pub fn connect(&mut self) -> io::Result<()> {
        let addr: SocketAddr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unresolvable address"))?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Version gate for the handshake. The full version/verack exchange is
    /// the embedder's concern; this predicate rejects peers below the
    /// protocol floor and the local sentinel address.
    pub fn perform_handshake(&self, version: u32) -> bool {
        if version < MIN_PROTOCOL_VERSION {
            return false;
        }
        if self.address == LOCAL_SENTINEL {
            return false;
        }
        true
    }

    /// Closes the connection if one is open. Idempotent.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both)?;
        }
        Ok(())
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
