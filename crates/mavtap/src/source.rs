//! Message source adapter for the tap endpoint.
//!
//! Pulls one datagram per call from a passively bound UDP socket, bounded
//! by a timeout so the capture loop can poll its stop flag between reads
//! instead of ever blocking forever. One bad datagram never ends the
//! session; it comes back as [`Received::Malformed`] and the source stays
//! usable for the next call.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{self, DecodedMessage, FrameError};

/// Receive buffer size. A MAVLink v2 frame tops out at 297 bytes, but the
/// upstream relay may batch, so leave headroom for a full datagram.
const RECV_BUFFER_LEN: usize = 2048;

/// Outcome of one bounded receive.
#[derive(Debug)]
pub enum Received {
    /// A well-formed message was decoded.
    Message(DecodedMessage),
    /// Nothing arrived within the timeout (or a zero-byte read).
    Timeout,
    /// A datagram arrived but did not parse as a MAVLink envelope.
    Malformed {
        /// Raw datagram length, for diagnostics.
        len: usize,
        /// Why the frame was rejected.
        error: FrameError,
    },
}

/// A passive tap on a duplicated MAVLink stream.
#[derive(Debug)]
pub struct TapSource {
    socket: Option<UdpSocket>,
    buf: Vec<u8>,
}

impl TapSource {
    /// Bind the tap endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointBind`] if the address cannot be bound;
    /// fatal to session start.
    pub async fn open(endpoint: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(endpoint)
            .await
            .map_err(|source| Error::EndpointBind {
                addr: endpoint,
                source,
            })?;
        debug!("Tap source bound to {}", socket.local_addr()?);
        Ok(Self {
            socket: Some(socket),
            buf: vec![0u8; RECV_BUFFER_LEN],
        })
    }

    /// The actual bound address (useful when binding port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the source is closed.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self.socket.as_ref().ok_or(Error::SourceClosed)?;
        Ok(socket.local_addr()?)
    }

    /// Receive one datagram, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the endpoint has become permanently
    /// unusable (closed or an unrecoverable socket failure); transient
    /// socket conditions map to [`Received::Timeout`] and everything else
    /// is a [`Received`] variant, with the source remaining usable.
    pub async fn receive(&mut self, timeout: Duration) -> Result<Received> {
        let Self { socket, buf } = self;
        let socket = socket.as_ref().ok_or(Error::SourceClosed)?;

        match tokio::time::timeout(timeout, socket.recv_from(buf)).await {
            Err(_elapsed) => Ok(Received::Timeout),
            Ok(Err(err)) if is_transient(err.kind()) => {
                debug!("Transient receive error, endpoint still usable: {err}");
                Ok(Received::Timeout)
            }
            Ok(Err(err)) => {
                self.close();
                Err(Error::source_failed(err.to_string()))
            }
            Ok(Ok((0, _))) => Ok(Received::Timeout),
            Ok(Ok((len, _))) => match protocol::decode(&buf[..len]) {
                Ok(msg) => Ok(Received::Message(msg)),
                Err(error) => Ok(Received::Malformed { len, error }),
            },
        }
    }

    /// Release the endpoint. Idempotent.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("Tap source closed");
        }
    }

    /// Whether the endpoint is still bound.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

/// Receive failures that reflect a passing condition rather than a dead
/// endpoint. UDP sockets surface ICMP rejections of earlier traffic (an
/// unreachable or address-family-mismatched peer at the relay) as receive
/// errors even though the local endpoint is fine.
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
    )
}
