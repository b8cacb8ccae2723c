//! Per-client connection plumbing: framed reads and writes, reply helpers

use crate::backend::StoreError;
use crate::protocol::{
    check_message_size, deserialize, frame_message, serialize, ClientMessage, ErrorKind,
    ServerMessage, PROTOCOL_VERSION,
};
use anyhow::{anyhow, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A connected client, as seen by the server loop
pub struct ClientConnection {
    id: Uuid,

    /// Replies queued for the writer task
    sender: mpsc::Sender<ServerMessage>,

    /// Requests answered so far
    handled: u64,
}

impl ClientConnection {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            handled: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Queue a reply to this client
    pub async fn send(&mut self, msg: ServerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| anyhow!("Client {} writer has gone away", self.id))?;
        self.handled += 1;
        Ok(())
    }
}

/// Read one length-prefixed frame; `None` on clean EOF
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];

    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = check_message_size(u32::from_be_bytes(len_bytes) as usize)?;

    let mut buffer = vec![0u8; len as usize];
    reader.read_exact(&mut buffer).await?;

    Ok(Some(buffer))
}

/// Write one length-prefixed frame and flush
///
/// Oversized payloads are refused before anything is written.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let framed = frame_message(payload)?;
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// Drain queued replies onto the socket until the queue closes
pub async fn client_writer_task<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut receiver: mpsc::Receiver<ServerMessage>,
) {
    while let Some(msg) = receiver.recv().await {
        match serialize(&msg) {
            Ok(payload) => {
                if let Err(e) = write_message(&mut writer, &payload).await {
                    tracing::error!("Failed to write message to client: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
            }
        }
    }

    tracing::debug!("Client writer task finished");
}

pub fn parse_client_message(bytes: &[u8]) -> Result<ClientMessage> {
    deserialize(bytes)
}

pub fn create_welcome_message(server_id: Uuid) -> ServerMessage {
    ServerMessage::Welcome {
        server_id,
        protocol_version: PROTOCOL_VERSION,
    }
}

pub fn create_error_message(kind: ErrorKind, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        kind,
        message: message.into(),
    }
}

/// Turn a failed backend call into an error reply
///
/// Store errors keep their classification; anything else is `Internal`.
pub fn error_reply(err: &anyhow::Error) -> ServerMessage {
    match err.downcast_ref::<StoreError>() {
        Some(store_err) => create_error_message(store_err.kind(), store_err.detail()),
        None => create_error_message(ErrorKind::Internal, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ProtocolError, MAX_MESSAGE_SIZE};

    #[tokio::test]
    async fn test_read_write_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_message(&mut a, b"ping").await.unwrap();
        let got = read_message(&mut b).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"ping"[..]));

        drop(a);
        assert!(read_message(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frames_refused_both_ways() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let payload = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let err = write_message(&mut a, &payload).await.unwrap_err();
        assert!(err.downcast_ref::<ProtocolError>().is_some());

        // Nothing reached the peer.
        drop(a);
        assert!(read_message(&mut b).await.unwrap().is_none());

        let prefix = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        let err = read_message(&mut &prefix[..]).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_error_reply_keeps_kind() {
        let err = anyhow::Error::new(StoreError::NotFound("session 'x'".to_string()));
        match error_reply(&err) {
            ServerMessage::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::NotFound);
                assert_eq!(message, "session 'x'");
            }
            other => panic!("Expected Error, got {:?}", other),
        }

        match error_reply(&anyhow!("disk on fire")) {
            ServerMessage::Error { kind, .. } => assert_eq!(kind, ErrorKind::Internal),
            other => panic!("Expected Error, got {:?}", other),
        }
    }
}
