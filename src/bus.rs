// Message bus contract: logical message shapes and the transport seam
//
// The orchestrator only sees the `BusTransport` trait. Production runs use the
// newline-delimited JSON TCP client; tests drive the orchestrator through the
// in-process channel transport.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::{ConnectionError, Result};

/// Inbound trigger event carrying a `Job`
pub const CYCLE_START: &str = "cycle:start";

/// Outbound event carrying the `AggregateReport` for a completed run
pub const CYCLE_FINISHED: &str = "cycle:finished";

/// Outbound event signalling a run that failed before producing a report
pub const CYCLE_FAILED: &str = "cycle:failed";

/// One logical frame exchanged with the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Logical name of the receiving service; absent on broadcast frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub event: String,
    pub payload: Value,
}

impl BusMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            destination: None,
            event: event.into(),
            payload,
        }
    }

    pub fn addressed(destination: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            destination: Some(destination.into()),
            event: event.into(),
            payload,
        }
    }
}

/// Addressable pub/sub client seam.
///
/// Exactly one transport exists per process, owned by the orchestrator; only
/// the orchestrator sends on it or pulls messages from it.
#[async_trait]
pub trait BusTransport: Send {
    /// Receive the next inbound message; `None` on orderly shutdown
    async fn next_message(&mut self) -> Result<Option<BusMessage>>;

    /// Publish an event addressed to a downstream service
    async fn send(&mut self, destination: &str, event: &str, payload: Value) -> Result<()>;

    /// Release the connection
    async fn close(&mut self) -> Result<()>;
}

/// Newline-delimited JSON frames over TCP
pub struct TcpBusTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl TcpBusTransport {
    /// Connect to the bus endpoint and announce this worker.
    ///
    /// A handshake failure is fatal to the process; the worker cannot operate
    /// without its bus.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let stream =
            TcpStream::connect(endpoint)
                .await
                .map_err(|e| ConnectionError::HandshakeFailed {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })?;
        let (read_half, write_half) = stream.into_split();
        let mut transport = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            line: String::new(),
        };

        let hello = BusMessage::new(
            "connect",
            serde_json::json!({ "name": "flightcheck", "version": crate::VERSION }),
        );
        transport.write_frame(&hello).await?;

        Ok(transport)
    }

    async fn write_frame(&mut self, message: &BusMessage) -> Result<()> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await.map_err(|e| {
            ConnectionError::SendFailed {
                destination: message.destination.clone().unwrap_or_default(),
                event: message.event.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl BusTransport for TcpBusTransport {
    async fn next_message(&mut self) -> Result<Option<BusMessage>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let message: BusMessage =
                serde_json::from_str(trimmed).map_err(|e| ConnectionError::InvalidFrame {
                    message: e.to_string(),
                })?;
            return Ok(Some(message));
        }
    }

    async fn send(&mut self, destination: &str, event: &str, payload: Value) -> Result<()> {
        let message = BusMessage::addressed(destination, event, payload);
        self.write_frame(&message).await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// In-process transport backed by channels, for tests and one-shot runs
pub struct ChannelBusTransport {
    inbound: mpsc::Receiver<BusMessage>,
    outbound: mpsc::Sender<BusMessage>,
}

impl ChannelBusTransport {
    /// Build a transport plus the remote ends a test drives it with
    pub fn pair() -> (Self, mpsc::Sender<BusMessage>, mpsc::Receiver<BusMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        (
            Self {
                inbound: inbound_rx,
                outbound: outbound_tx,
            },
            inbound_tx,
            outbound_rx,
        )
    }
}

#[async_trait]
impl BusTransport for ChannelBusTransport {
    async fn next_message(&mut self) -> Result<Option<BusMessage>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, destination: &str, event: &str, payload: Value) -> Result<()> {
        self.outbound
            .send(BusMessage::addressed(destination, event, payload))
            .await
            .map_err(|e| {
                ConnectionError::SendFailed {
                    destination: destination.to_string(),
                    event: event.to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }

    async fn close(&mut self) -> Result<()> {
        self.inbound.close();
        Ok(())
    }
}
