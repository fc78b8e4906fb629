// src/io/eth2can/connection.rs
//
// TCP socket ownership for the eth2can adapter: bounded-retry connect,
// readiness-polled reads and full-buffer writes.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::io::IoError;

/// Default upper bound on the connect retry loop
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// Owns the adapter socket.
#[derive(Debug)]
pub struct Connection {
    host: String,
    port: u16,
    device: String,
    state: ConnectionState,
    stream: Option<TcpStream>,
}

impl Connection {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            device: format!("eth2can({}:{})", host, port),
            state: ConnectionState::Disconnected,
            stream: None,
        }
    }

    /// Device label used in logs and errors
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Local address of the connected socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Connect, retrying immediately after every failure until `max_wait`
    /// has elapsed.
    ///
    /// Each attempt is itself bounded by the remaining time so a hanging
    /// attempt cannot overrun `max_wait`.
    pub async fn connect(&mut self, max_wait: Duration) -> Result<(), IoError> {
        if self.state == ConnectionState::Closed {
            return Err(IoError::transport_closed(&self.device));
        }

        self.state = ConnectionState::Connecting;
        let started = Instant::now();
        let deadline = started + max_wait;
        let mut attempts: u32 = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            attempts += 1;

            match tokio::time::timeout(
                remaining,
                TcpStream::connect((self.host.as_str(), self.port)),
            )
            .await
            {
                Ok(Ok(stream)) => {
                    self.stream = Some(stream);
                    self.state = ConnectionState::Connected;
                    tlog!(
                        "[eth2can_connect] Connected to {}:{} from {} after {} attempt(s)",
                        self.host,
                        self.port,
                        self.local_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| "?".to_string()),
                        attempts
                    );
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tlog!(
                        "[eth2can_connect] Failed to connect to {}:{}: {:?} Message: {}",
                        self.host,
                        self.port,
                        e.kind(),
                        e
                    );
                }
                Err(_) => {
                    tlog!(
                        "[eth2can_connect] Connect attempt to {}:{} still pending at deadline",
                        self.host,
                        self.port
                    );
                }
            }

            // No backoff; only let other tasks run
            tokio::task::yield_now().await;
        }

        self.state = ConnectionState::Disconnected;
        let waited = started.elapsed();
        tlog!(
            "[eth2can_connect] Giving up on {}:{} after {} ms",
            self.host,
            self.port,
            waited.as_millis()
        );
        Err(IoError::connect_timeout(&self.device, waited, attempts))
    }

    fn stream(&self) -> Result<&TcpStream, IoError> {
        self.stream
            .as_ref()
            .ok_or_else(|| IoError::transport_closed(&self.device))
    }

    /// Wait up to `timeout` for the socket to become readable.
    /// `None` waits indefinitely; a zero timeout is a single poll.
    pub async fn read_ready(&self, timeout: Option<Duration>) -> Result<bool, IoError> {
        let stream = self.stream()?;

        let ready = match timeout {
            Some(t) => match tokio::time::timeout(t, stream.readable()).await {
                Ok(res) => res.map(|_| true),
                Err(_) => Ok(false),
            },
            None => stream.readable().await.map(|_| true),
        };

        ready.map_err(|e| {
            tlog!("[eth2can] Failed to poll {}: {}", self.device, e);
            IoError::read(&self.device, e.to_string())
        })
    }

    /// Read whatever is available, up to `max_bytes`, without waiting.
    ///
    /// Call after `read_ready` returned true. An empty result means the
    /// readiness was spurious; an orderly close is `ConnectionClosed`.
    pub async fn read_chunk(&self, max_bytes: usize) -> Result<Vec<u8>, IoError> {
        let stream = self.stream()?;
        let mut buf = vec![0u8; max_bytes.max(1)];

        match stream.try_read(&mut buf) {
            Ok(0) => {
                tlog!("[eth2can] {} closed by peer", self.device);
                Err(IoError::connection_closed(&self.device))
            }
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => {
                tlog!("[eth2can] Failed to receive from {}: {}", self.device, e);
                Err(IoError::read(&self.device, e.to_string()))
            }
        }
    }

    /// Write all of `bytes` or fail.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let device = self.device.clone();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| IoError::transport_closed(&device))?;

        let result = match stream.write_all(bytes).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            tlog!("[eth2can] Failed to send to {}: {}", device, e);
            IoError::write_failed(&device, e.to_string())
        })
    }

    /// Release the socket. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tlog!("[eth2can] Closed connection to {}", self.device);
        }
        self.state = ConnectionState::Closed;
    }
}
