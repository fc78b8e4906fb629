// src/io/eth2can/bus.rs
//
// eth2can transport: composes the codec, reassembler and connection behind
// the CanBus capability.

use async_trait::async_trait;
use hex::ToHex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use super::codec::{encode_padded, Eth2CanCodec};
use super::connection::{Connection, ConnectionState};
use super::reassembler::FrameReassembler;
use crate::io::codec::FrameCodec;
use crate::io::{CanBus, CanFilter, CanMessage, IoError};
use crate::settings::Eth2CanConfig;

/// Adapter name used in `channel_info`
pub const ADAPTER_NAME: &str = "eth2can";
/// Default upper bound for a single chunk read
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// CAN bus served by an Ethernet-to-CAN adapter over TCP.
///
/// Construction connects (with bounded retry); there is no unconnected
/// instance. All queues and buffers are owned by this value.
pub struct Eth2CanBus {
    connection: Connection,
    reassembler: FrameReassembler,
    rx_queue: VecDeque<CanMessage>,
    filters: Vec<CanFilter>,
    channel_info: String,
    read_chunk_size: usize,
    pad_payload: bool,
    closed: bool,
}

impl Eth2CanBus {
    /// Connect using a validated configuration.
    pub async fn connect(config: &Eth2CanConfig) -> Result<Self, IoError> {
        config.validate()?;

        let mut connection = Connection::new(&config.host, config.port);
        connection.connect(config.connect_timeout()).await?;

        tlog!(
            "[eth2can] Started eth2can client at address {}",
            connection
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "?".to_string())
        );

        Ok(Self {
            connection,
            reassembler: FrameReassembler::new(),
            rx_queue: VecDeque::new(),
            filters: config.can_filters.clone(),
            channel_info: format!(
                "{} connecting on {}:{}",
                ADAPTER_NAME, config.host, config.port
            ),
            read_chunk_size: config.read_chunk_size,
            pad_payload: config.pad_payload,
            closed: false,
        })
    }

    /// Connect to `host:port` with default settings.
    pub async fn open(host: &str, port: u16) -> Result<Self, IoError> {
        Self::connect(&Eth2CanConfig::new(host, port)).await
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connection.local_addr()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Bytes buffered towards an incomplete frame
    pub fn pending_bytes(&self) -> usize {
        self.reassembler.pending().len()
    }

    /// Decoded messages not yet returned by `receive_next`
    pub fn queued(&self) -> usize {
        self.rx_queue.len()
    }

    fn ensure_open(&self) -> Result<(), IoError> {
        if self.closed {
            return Err(IoError::transport_closed(self.connection.device()));
        }
        Ok(())
    }

    fn encode(&self, msg: &CanMessage) -> Result<Vec<u8>, IoError> {
        if self.pad_payload {
            encode_padded(msg).map(|frame| frame.to_vec())
        } else {
            Eth2CanCodec::encode(msg)
        }
    }
}

#[async_trait]
impl CanBus for Eth2CanBus {
    fn channel_info(&self) -> &str {
        &self.channel_info
    }

    /// Transmit one message. `timeout` is ignored; the write blocks until the
    /// whole frame is accepted by the socket.
    async fn send(&mut self, msg: &CanMessage, _timeout: Option<Duration>) -> Result<(), IoError> {
        self.ensure_open()?;

        tlog_verbose!(
            "[eth2can] canMessage arbitration_id=0x{:X} data={} dlc={} timestamp={}",
            msg.arbitration_id,
            msg.data.encode_hex::<String>(),
            msg.dlc(),
            msg.timestamp
        );

        let payload = self.encode(msg)?;
        tlog_verbose!(
            "[eth2can] payload to be sent={}",
            payload.encode_hex::<String>()
        );

        self.connection.write_all(&payload).await
    }

    async fn receive_next(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<(Option<CanMessage>, bool), IoError> {
        self.ensure_open()?;

        if let Some(msg) = self.rx_queue.pop_front() {
            return Ok((Some(msg), false));
        }

        if !self.connection.read_ready(timeout).await? {
            return Ok((None, false));
        }

        // May contain several frames, or only part of one
        let chunk = self.connection.read_chunk(self.read_chunk_size).await?;
        tlog_verbose!(
            "[eth2can] received message-len={}, message={}",
            chunk.len(),
            chunk.encode_hex::<String>()
        );

        let outcome = self.reassembler.feed(&chunk);
        self.rx_queue.extend(outcome.messages);

        let msg = self.rx_queue.pop_front();
        if let Some(ref m) = msg {
            tlog_verbose!("[eth2can] received can message: {}", m);
        }
        Ok((msg, false))
    }

    /// Close the socket and drop buffered state. Idempotent.
    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connection.close();
        self.rx_queue.clear();
        self.reassembler.reset();
    }

    /// Stored unchanged; filtering happens in the layer above.
    fn set_filters(&mut self, filters: Vec<CanFilter>) -> Result<(), IoError> {
        self.filters = filters;
        Ok(())
    }

    fn filters(&self) -> &[CanFilter] {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Fake adapter: a loopback listener plus the bus connected to it
    async fn bus_with_peer() -> (Eth2CanBus, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let bus = Eth2CanBus::open("127.0.0.1", port).await.unwrap();
        let (peer, _) = listener.accept().await.unwrap();
        (bus, peer)
    }

    fn wire(id: u32, data: &[u8]) -> Vec<u8> {
        encode_padded(&CanMessage::new(id, data)).unwrap().to_vec()
    }

    /// Poll until a message arrives (chunks may land in pieces)
    async fn recv(bus: &mut Eth2CanBus) -> CanMessage {
        for _ in 0..50 {
            if let (Some(msg), _) = bus
                .receive_next(Some(Duration::from_millis(100)))
                .await
                .unwrap()
            {
                return msg;
            }
        }
        panic!("no message received");
    }

    #[tokio::test]
    async fn test_channel_info() {
        let (bus, peer) = bus_with_peer().await;
        let port = peer.local_addr().unwrap().port();
        assert_eq!(
            bus.channel_info(),
            format!("eth2can connecting on 127.0.0.1:{}", port)
        );
    }

    #[tokio::test]
    async fn test_send_writes_padded_frame() {
        let (mut bus, mut peer) = bus_with_peer().await;

        bus.send(&CanMessage::new(0x123, &[0x01, 0x02]), None)
            .await
            .unwrap();

        let mut buf = [0u8; 13];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(
            buf,
            [0x08, 0x00, 0x00, 0x01, 0x23, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn test_send_unpadded_when_disabled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = Eth2CanConfig::new("127.0.0.1", port);
        config.pad_payload = false;

        let mut bus = Eth2CanBus::connect(&config).await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        bus.send(&CanMessage::new(0x7FF, &[0xAB]), None).await.unwrap();
        bus.shutdown();

        let mut buf = Vec::new();
        peer.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, vec![0x08, 0x00, 0x00, 0x07, 0xFF, 0xAB]);
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_payload() {
        let (mut bus, _peer) = bus_with_peer().await;
        let err = bus
            .send(&CanMessage::new(0x1, &[0u8; 9]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_receive_none_when_idle() {
        let (mut bus, _peer) = bus_with_peer().await;
        let (msg, filtered) = bus
            .receive_next(Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(msg.is_none());
        assert!(!filtered);
    }

    #[tokio::test]
    async fn test_receive_multiple_frames_in_wire_order() {
        let (mut bus, mut peer) = bus_with_peer().await;

        let mut bytes = wire(0x101, &[1]);
        bytes.extend(wire(0x102, &[2]));
        bytes.extend(wire(0x103, &[3]));
        peer.write_all(&bytes).await.unwrap();

        let ids = [
            recv(&mut bus).await.arbitration_id,
            recv(&mut bus).await.arbitration_id,
            recv(&mut bus).await.arbitration_id,
        ];
        assert_eq!(ids, [0x101, 0x102, 0x103]);
        assert_eq!(bus.queued(), 0);
    }

    #[tokio::test]
    async fn test_receive_queued_message_without_io() {
        let (mut bus, mut peer) = bus_with_peer().await;

        let mut bytes = wire(0x201, &[]);
        bytes.extend(wire(0x202, &[]));
        peer.write_all(&bytes).await.unwrap();

        // Wait until both frames have been pulled off the socket
        let first = recv(&mut bus).await;
        assert_eq!(first.arbitration_id, 0x201);
        if bus.queued() == 1 {
            let (msg, _) = bus.receive_next(Some(Duration::ZERO)).await.unwrap();
            assert_eq!(msg.unwrap().arbitration_id, 0x202);
        } else {
            assert_eq!(recv(&mut bus).await.arbitration_id, 0x202);
        }
    }

    #[tokio::test]
    async fn test_receive_partial_then_rest() {
        let (mut bus, mut peer) = bus_with_peer().await;
        let frame = wire(0x3AA, &[0xDE, 0xAD, 0xBE, 0xEF]);

        peer.write_all(&frame[..6]).await.unwrap();
        peer.flush().await.unwrap();
        let mut pending = 0;
        for _ in 0..50 {
            let (msg, _) = bus
                .receive_next(Some(Duration::from_millis(100)))
                .await
                .unwrap();
            assert!(msg.is_none());
            pending = bus.pending_bytes();
            if pending == 6 {
                break;
            }
        }
        assert_eq!(pending, 6);

        peer.write_all(&frame[6..]).await.unwrap();
        let msg = recv(&mut bus).await;
        assert_eq!(msg.arbitration_id, 0x3AA);
        assert_eq!(msg.data, vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_receive_skips_invalid_window() {
        let (mut bus, mut peer) = bus_with_peer().await;

        let mut bytes = vec![0xFF; 13];
        bytes.extend(wire(0x0AB, &[0x42]));
        peer.write_all(&bytes).await.unwrap();

        let msg = recv(&mut bus).await;
        assert_eq!(msg.arbitration_id, 0x0AB);
        assert_eq!(msg.data[0], 0x42);
    }

    #[tokio::test]
    async fn test_receive_peer_closed() {
        let (mut bus, peer) = bus_with_peer().await;
        drop(peer);

        let mut result = bus.receive_next(Some(Duration::from_secs(2))).await;
        for _ in 0..50 {
            if !matches!(result, Ok((None, _))) {
                break;
            }
            result = bus.receive_next(Some(Duration::from_millis(100))).await;
        }
        assert!(matches!(result, Err(IoError::ConnectionClosed { .. })));
    }

    #[tokio::test]
    async fn test_operations_after_shutdown_fail() {
        let (mut bus, _peer) = bus_with_peer().await;

        bus.shutdown();
        bus.shutdown();
        assert_eq!(bus.state(), ConnectionState::Closed);

        assert!(matches!(
            bus.send(&CanMessage::new(0x1, &[]), None).await,
            Err(IoError::TransportClosed { .. })
        ));
        assert!(matches!(
            bus.receive_next(Some(Duration::ZERO)).await,
            Err(IoError::TransportClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_filters_pass_through() {
        let (mut bus, _peer) = bus_with_peer().await;
        assert!(bus.filters().is_empty());

        let filters = vec![CanFilter {
            can_id: 0x100,
            can_mask: 0x700,
            extended: None,
        }];
        bus.set_filters(filters.clone()).unwrap();
        assert_eq!(bus.filters(), filters.as_slice());
    }

    #[tokio::test]
    async fn test_connect_timeout_is_fatal() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let mut config = Eth2CanConfig::new("127.0.0.1", port);
        config.connect_timeout_sec = 0.2;

        let result = Eth2CanBus::connect(&config).await;
        assert!(matches!(result, Err(IoError::ConnectTimeout { .. })));
    }
}
