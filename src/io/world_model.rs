//! World-model wire client (subscribe + publish)
//!
//! Protocol: newline-delimited JSON over TCP, one connection per stream on
//! the client port and one long-lived connection on the solver port.
//! - Subscribe: client sends a single `StreamRequest` line, then the server
//!   streams `StreamMessage` lines (`batch`, `complete`, `error`) until the
//!   requested window ends or the connection drops.
//! - Publish: client sends `PublishMessage` lines (`origin`,
//!   `declare_attribute`, `update`). No acknowledgements.
//!
//! Attribute payloads are hex-encoded byte strings; see `codec` for the
//! scalar encodings.

use crate::infra::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Channel depth for decoded batches per stream
const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Live-stream subscription request: identifier and attribute-name regex
/// filters, start timestamp, optional end timestamp (`None` = live tail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub id_pattern: String,
    pub attribute_pattern: String,
    pub from: u64,
    pub to: Option<u64>,
}

/// One attribute observation: name, hex-encoded payload, epoch-ms timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSample {
    pub name: String,
    pub data: String,
    pub timestamp: u64,
}

impl AttributeSample {
    pub fn from_raw(name: &str, raw: &[u8], timestamp: u64) -> Self {
        Self { name: name.to_string(), data: hex::encode(raw), timestamp }
    }

    /// Decode the hex payload back to raw bytes
    pub fn raw(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.data)
    }
}

/// All samples reported for one identifier in a single server message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierUpdate {
    pub identifier: String,
    pub attributes: Vec<AttributeSample>,
}

/// Server -> client stream messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Batch { updates: Vec<IdentifierUpdate> },
    Complete,
    Error { message: String },
}

/// Client -> server publish messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublishMessage {
    Origin { name: String },
    DeclareAttribute { name: String, on_demand: bool },
    Update { identifier: String, attribute: String, data: String, timestamp: u64 },
}

#[derive(Debug, Default)]
struct StreamStatus {
    complete: AtomicBool,
    error: AtomicBool,
}

/// Handle to one live subscription.
///
/// Batches are decoded by a background reader task and buffered in a bounded
/// channel; `try_next` never blocks, matching the solver's cooperative poll.
pub struct StreamHandle {
    rx: mpsc::Receiver<Vec<IdentifierUpdate>>,
    status: Arc<StreamStatus>,
    reader: JoinHandle<()>,
}

impl StreamHandle {
    /// Next decoded batch, if one is already buffered
    pub fn try_next(&mut self) -> Option<Vec<IdentifierUpdate>> {
        self.rx.try_recv().ok()
    }

    /// The server signalled end-of-stream or closed the connection
    pub fn is_complete(&self) -> bool {
        self.status.complete.load(Ordering::Acquire)
    }

    /// The stream failed (server error message or transport error)
    pub fn is_error(&self) -> bool {
        self.status.error.load(Ordering::Acquire)
    }

    /// Tear the stream down; buffered batches are discarded
    pub fn cancel(&mut self) {
        self.reader.abort();
        self.rx.close();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
impl StreamHandle {
    /// Channel-backed handle for driving the solver loop in tests, no socket
    pub(crate) fn test_channel() -> (mpsc::Sender<Vec<IdentifierUpdate>>, StreamHandle) {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let status = Arc::new(StreamStatus::default());
        let reader = tokio::spawn(async {});
        (tx, StreamHandle { rx, status, reader })
    }

    pub(crate) fn mark_complete_for_test(&self) {
        self.status.complete.store(true, Ordering::Release);
    }
}

/// Opens live subscription streams against the world model's client port
pub struct WorldModelSubscriber {
    addr: String,
    connect_timeout: Duration,
}

impl WorldModelSubscriber {
    pub fn new(config: &Config) -> Self {
        Self {
            addr: format!("{}:{}", config.host(), config.client_port()),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms()),
        }
    }

    /// Open one stream: connect, send the request line, spawn the reader.
    pub async fn open_stream(&self, request: &StreamRequest) -> anyhow::Result<StreamHandle> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .with_context(|| format!("Timed out connecting to world model at {}", self.addr))?
            .with_context(|| format!("Failed to connect to world model at {}", self.addr))?;

        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_string(request).context("Failed to encode stream request")?;
        line.push('\n');
        write_half
            .write_all(line.as_bytes())
            .await
            .context("Failed to send stream request")?;

        debug!(
            id_pattern = %request.id_pattern,
            attribute_pattern = %request.attribute_pattern,
            from = request.from,
            "stream_opened"
        );

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let status = Arc::new(StreamStatus::default());
        let reader_status = status.clone();

        let reader = tokio::spawn(async move {
            // Keep the write half alive for the lifetime of the stream so the
            // server sees a half-open socket, not a reset.
            let _write_half = write_half;
            run_stream_reader(read_half, tx, reader_status).await;
        });

        Ok(StreamHandle { rx, status, reader })
    }
}

async fn run_stream_reader(
    read_half: OwnedReadHalf,
    tx: mpsc::Sender<Vec<IdentifierUpdate>>,
    status: Arc<StreamStatus>,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<StreamMessage>(&line) {
                Ok(StreamMessage::Batch { updates }) => {
                    // Blocks when the solver falls behind; backpressure is
                    // preferable to dropping mobility observations.
                    if tx.send(updates).await.is_err() {
                        break; // handle cancelled
                    }
                }
                Ok(StreamMessage::Complete) => {
                    info!("stream_complete");
                    status.complete.store(true, Ordering::Release);
                    break;
                }
                Ok(StreamMessage::Error { message }) => {
                    warn!(message = %message, "stream_server_error");
                    status.error.store(true, Ordering::Release);
                    break;
                }
                Err(e) => {
                    // Skip the malformed line, keep the stream alive
                    warn!(error = %e, "stream_line_parse_failed");
                }
            },
            Ok(None) => {
                // EOF without a Complete message: treat as completion so the
                // solver resubscribes
                info!("stream_eof");
                status.complete.store(true, Ordering::Release);
                break;
            }
            Err(e) => {
                warn!(error = %e, "stream_read_error");
                status.error.store(true, Ordering::Release);
                break;
            }
        }
    }
}

/// Publishes solver output to the world model's solver port.
///
/// Fire-and-forget with a bounded write timeout: a stalled peer drops the
/// connection instead of stalling the solver, and the next publish lazily
/// reconnects and replays origin/attribute registration.
pub struct WorldModelPublisher {
    addr: String,
    connect_timeout: Duration,
    publish_timeout: Duration,
    origin: Option<String>,
    declared: Vec<(String, bool)>,
    conn: Option<TcpStream>,
}

impl WorldModelPublisher {
    pub fn new(config: &Config) -> Self {
        Self {
            addr: format!("{}:{}", config.host(), config.solver_port()),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms()),
            publish_timeout: Duration::from_millis(config.publish_timeout_ms()),
            origin: None,
            declared: Vec::new(),
            conn: None,
        }
    }

    /// Establish the publish connection and replay registration state
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .with_context(|| format!("Timed out connecting to world model at {}", self.addr))?
            .with_context(|| format!("Failed to connect to world model at {}", self.addr))?;
        self.conn = Some(stream);
        info!(addr = %self.addr, "publisher_connected");

        if let Some(name) = self.origin.clone() {
            self.send(&PublishMessage::Origin { name }).await?;
        }
        for (name, on_demand) in self.declared.clone() {
            self.send(&PublishMessage::DeclareAttribute { name, on_demand }).await?;
        }
        Ok(())
    }

    /// Name this solver as the data source for everything it publishes.
    /// Recorded even while disconnected and replayed on (re)connect.
    pub async fn set_origin(&mut self, name: &str) -> anyhow::Result<()> {
        self.origin = Some(name.to_string());
        if self.conn.is_none() {
            return Ok(());
        }
        self.send(&PublishMessage::Origin { name: name.to_string() }).await
    }

    /// Register an attribute this solver produces.
    /// Recorded even while disconnected and replayed on (re)connect.
    pub async fn declare_attribute(&mut self, name: &str, on_demand: bool) -> anyhow::Result<()> {
        self.declared.push((name.to_string(), on_demand));
        if self.conn.is_none() {
            return Ok(());
        }
        self.send(&PublishMessage::DeclareAttribute { name: name.to_string(), on_demand }).await
    }

    /// Publish one attribute value. Errors are for the caller to log; the
    /// connection is already dropped for lazy reconnect by the time this
    /// returns an error.
    pub async fn publish(
        &mut self,
        identifier: &str,
        attribute: &str,
        raw: &[u8],
        at: u64,
    ) -> anyhow::Result<()> {
        if self.conn.is_none() {
            self.connect().await?;
        }
        self.send(&PublishMessage::Update {
            identifier: identifier.to_string(),
            attribute: attribute.to_string(),
            data: hex::encode(raw),
            timestamp: at,
        })
        .await
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let _ = conn.shutdown().await;
            info!("publisher_disconnected");
        }
    }

    async fn send(&mut self, msg: &PublishMessage) -> anyhow::Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            anyhow::bail!("publisher not connected");
        };
        let mut line = serde_json::to_string(msg).context("Failed to encode publish message")?;
        line.push('\n');

        let result = timeout(self.publish_timeout, conn.write_all(line.as_bytes())).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.conn = None;
                Err(e).context("Publish write failed")
            }
            Err(_) => {
                self.conn = None;
                anyhow::bail!("Publish write timed out after {:?}", self.publish_timeout)
            }
        }
    }
}
