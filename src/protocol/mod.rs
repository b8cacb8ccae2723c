//! Protocol definitions for client-server communication
//!
//! Uses MessagePack for efficient binary serialization.

mod message;

pub use message::{ClientMessage, ErrorKind, ServerMessage};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Protocol version mismatch: client={client}, server={server}")]
    VersionMismatch { client: u32, server: u32 },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },
}

/// Maximum message size to prevent DoS attacks (10 MB)
pub const MAX_MESSAGE_SIZE: u32 = 10 * 1024 * 1024;

/// Serialize a message to MessagePack bytes
pub fn serialize<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(msg)?)
}

/// Deserialize a message from MessagePack bytes
pub fn deserialize<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(|e| {
        anyhow!(ProtocolError::MalformedMessage(format!(
            "Failed to deserialize: {}",
            e
        )))
    })
}

/// Refuse payloads over [`MAX_MESSAGE_SIZE`]; returns the length prefix
pub fn check_message_size(len: usize) -> Result<u32> {
    let size = u32::try_from(len).unwrap_or(u32::MAX);
    if size > MAX_MESSAGE_SIZE {
        bail!(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE
        });
    }
    Ok(size)
}

/// Frame a message with length prefix for streaming
///
/// Frame format: [4-byte length BE][payload]
pub fn frame_message(payload: &[u8]) -> Result<Vec<u8>> {
    let len = check_message_size(payload.len())?;
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Check if client and server protocol versions are compatible
pub fn check_version_compatibility(client_version: u32, server_version: u32) -> Result<()> {
    if client_version != server_version {
        bail!(ProtocolError::VersionMismatch {
            client: client_version,
            server: server_version
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_prefixes_length() {
        let framed = frame_message(b"abc").unwrap();
        assert_eq!(&framed[..4], &[0, 0, 0, 3]);
        assert_eq!(&framed[4..], b"abc");
    }

    #[test]
    fn test_size_limit() {
        assert_eq!(check_message_size(0).unwrap(), 0);
        assert!(check_message_size(MAX_MESSAGE_SIZE as usize).is_ok());

        let err = check_message_size(MAX_MESSAGE_SIZE as usize + 1).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_version_check() {
        assert!(check_version_compatibility(1, 1).is_ok());
        assert!(check_version_compatibility(1, 2).is_err());
    }
}
