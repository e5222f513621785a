//! WebTransport endpoints for host and guest peers.
//!
//! Connection establishment and reachability are the transport's concern;
//! the rest of the crate consumes an ordered, reliable, bidirectional
//! stream pair once a connection is open. A 16-byte identity preamble is
//! exchanged on every new stream so both sides know the remote peer id
//! before any game traffic flows.

use std::time::Duration;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest::{digest, SHA256};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;
use wtransport::endpoint::endpoint_side::{Client, Server};
use wtransport::endpoint::IncomingSession;
use wtransport::{ClientConfig, Endpoint, Identity, RecvStream, SendStream, ServerConfig};

use crate::game::constants::net;
use crate::game::state::PeerId;

/// Listening endpoint for the hosting peer
pub struct HostEndpoint {
    /// Local transport identity, surfaced for display and self-join
    pub local_id: PeerId,
    /// Base64-encoded SHA-256 hash of the session certificate
    pub cert_hash: String,
    endpoint: Endpoint<Server>,
}

impl HostEndpoint {
    /// Bind the host endpoint, retrying on a fixed delay until the
    /// transport comes up. Never fails permanently.
    pub async fn bind(port: u16) -> Self {
        loop {
            match Self::try_bind(port).await {
                Ok(endpoint) => return endpoint,
                Err(e) => {
                    warn!("Endpoint initialization failed: {e:#}; retrying");
                    tokio::time::sleep(Duration::from_millis(net::INIT_RETRY_DELAY_MS)).await;
                }
            }
        }
    }

    async fn try_bind(port: u16) -> anyhow::Result<Self> {
        let identity = Identity::self_signed(["localhost", "127.0.0.1", "::1"])
            .context("Failed to generate session certificate")?;
        let cert_hash = compute_cert_hash(&identity);

        let config = ServerConfig::builder()
            .with_bind_default(port)
            .with_identity(identity)
            .build();
        let endpoint = Endpoint::server(config).context("Failed to bind server endpoint")?;

        Ok(Self {
            local_id: Uuid::new_v4(),
            cert_hash,
            endpoint,
        })
    }

    /// Wait for the next inbound connection attempt.
    pub async fn accept(&self) -> IncomingSession {
        self.endpoint.accept().await
    }

    /// Port the endpoint actually bound to.
    pub fn local_port(&self) -> Option<u16> {
        self.endpoint.local_addr().ok().map(|addr| addr.port())
    }
}

/// Connecting endpoint for a guest peer
pub struct GuestEndpoint {
    /// Local transport identity, surfaced for display
    pub local_id: PeerId,
    endpoint: Endpoint<Client>,
}

impl GuestEndpoint {
    /// Bind the guest endpoint, retrying on a fixed delay until the
    /// transport comes up. Never fails permanently.
    pub async fn bind() -> Self {
        loop {
            match Self::try_bind() {
                Ok(endpoint) => return endpoint,
                Err(e) => {
                    warn!("Endpoint initialization failed: {e:#}; retrying");
                    tokio::time::sleep(Duration::from_millis(net::INIT_RETRY_DELAY_MS)).await;
                }
            }
        }
    }

    fn try_bind() -> anyhow::Result<Self> {
        // The room code is shared out-of-band and already names the exact
        // endpoint to talk to; certificate validation adds nothing here.
        let config = ClientConfig::builder()
            .with_bind_default()
            .with_no_cert_validation()
            .build();
        let endpoint = Endpoint::client(config).context("Failed to bind client endpoint")?;

        Ok(Self {
            local_id: Uuid::new_v4(),
            endpoint,
        })
    }

    /// Connect to a host using its room code (a URL such as
    /// `https://192.168.1.20:4433`).
    pub async fn connect(&self, room_code: &str) -> anyhow::Result<wtransport::Connection> {
        self.endpoint
            .connect(room_code)
            .await
            .with_context(|| format!("Failed to connect to room {room_code}"))
    }
}

/// Exchange endpoint identities on a fresh stream. Each side writes its
/// own 16-byte id and reads the remote one; the remote id is the key every
/// player and link is stored under.
pub async fn exchange_identity(
    send: &mut SendStream,
    recv: &mut RecvStream,
    local_id: PeerId,
) -> anyhow::Result<PeerId> {
    send.write_all(local_id.as_bytes())
        .await
        .context("Failed to send identity preamble")?;
    let mut buf = [0u8; 16];
    recv.read_exact(&mut buf)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read identity preamble: {e}"))?;
    Ok(Uuid::from_bytes(buf))
}

/// Write one length-prefixed frame (4-byte LE length + payload).
pub async fn write_frame(send: &mut SendStream, payload: &[u8]) -> anyhow::Result<()> {
    let len_bytes = (payload.len() as u32).to_le_bytes();
    send.write_all(&len_bytes).await?;
    send.write_all(payload).await?;
    Ok(())
}

/// Read one length-prefixed frame into `buffer`. Returns the payload
/// length, or `None` once the peer closes the stream.
pub async fn read_frame(
    recv: &mut RecvStream,
    buffer: &mut Vec<u8>,
) -> anyhow::Result<Option<usize>> {
    let mut len_buf = [0u8; 4];
    if recv.read_exact(&mut len_buf).await.is_err() {
        return Ok(None);
    }

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > net::MAX_FRAME_SIZE {
        anyhow::bail!("Rejected oversized frame: {} bytes", msg_len);
    }

    if msg_len > buffer.len() {
        buffer.resize(msg_len, 0);
    }
    recv.read_exact(&mut buffer[..msg_len])
        .await
        .map_err(|e| anyhow::anyhow!("Stream closed mid-frame: {e}"))?;

    Ok(Some(msg_len))
}

fn compute_cert_hash(identity: &Identity) -> String {
    identity
        .certificate_chain()
        .as_slice()
        .first()
        .map(|cert| {
            let hash = digest(&SHA256, cert.der());
            STANDARD.encode(hash.as_ref())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_endpoint_bind() {
        let endpoint = HostEndpoint::try_bind(0).await.unwrap();
        assert!(!endpoint.cert_hash.is_empty());
        assert!(endpoint.local_port().unwrap_or(0) > 0);
    }

    #[tokio::test]
    async fn test_host_cert_hash_is_sha256_b64() {
        let endpoint = HostEndpoint::try_bind(0).await.unwrap();
        let decoded = STANDARD.decode(&endpoint.cert_hash).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[tokio::test]
    async fn test_guest_endpoint_bind() {
        let a = GuestEndpoint::try_bind().unwrap();
        let b = GuestEndpoint::try_bind().unwrap();
        // Identities are unique per endpoint
        assert_ne!(a.local_id, b.local_id);
    }
}
