//! TCP link to the optimizer
//!
//! One persistent stream. A background task reads and decodes frames and
//! forwards RESULTS through a bounded event queue; a second task owns the
//! write half so sends never block the caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{LinkError, Result};
use crate::frame::{encode_frame, FrameDecoder};
use crate::protocol::{Assignment, Message};

const READ_CHUNK: usize = 64 * 1024;

/// Events delivered from the receive task to the scene owner
#[derive(Debug)]
pub enum LinkEvent {
    /// Assignments computed by the optimizer
    Results(Vec<Assignment>),
    /// The connection ended (peer CLOSE, EOF or local close)
    Closed,
    /// The inbound stream could not be parsed or read; the link is down
    Failed(LinkError),
}

impl LinkEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Results(_) => "results",
            Self::Closed => "closed",
            Self::Failed(_) => "failure",
        }
    }
}

/// Create a bounded event queue for [`OptimizerLink::connect`]
pub fn event_queue(capacity: usize) -> (mpsc::Sender<LinkEvent>, mpsc::Receiver<LinkEvent>) {
    mpsc::channel(capacity.max(1))
}

enum Outbound {
    Frame(Vec<u8>),
    Shutdown,
}

/// Link handle - keep this alive to keep the connection running
pub struct OptimizerLink {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
    peer: SocketAddr,
    reader: tokio::task::JoinHandle<()>,
    _writer: tokio::task::JoinHandle<()>,
}

impl OptimizerLink {
    /// Connect to the optimizer at `addr`.
    ///
    /// Events go to `events` when given; without a queue, inbound results are
    /// logged and discarded.
    pub async fn connect(addr: &str, events: Option<mpsc::Sender<LinkEvent>>) -> Result<Self> {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                log::info!("Connected to optimizer at {}", addr);
                Self::from_stream(stream, events)
            }
            Err(e) => {
                log::error!("Failed to connect to optimizer at {}: {}", addr, e);
                Err(e.into())
            }
        }
    }

    /// Wrap an already connected stream. Must run inside a tokio runtime.
    pub fn from_stream(stream: TcpStream, events: Option<mpsc::Sender<LinkEvent>>) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let _writer = tokio::spawn(write_loop(writer, outbound_rx));
        let reader = tokio::spawn(receive_loop(reader, events, outbound.clone(), closed.clone()));

        Ok(Self {
            outbound,
            closed,
            peer,
            reader,
            _writer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a message. Best effort: failures are logged, never retried.
    pub fn send(&self, message: &Message) {
        if self.is_closed() {
            log::debug!("Link closed, dropping {:?}", message.tag());
            return;
        }
        log::debug!("Sending {:?}", message.tag());
        let frame = encode_frame(&message.encode());
        if self.outbound.send(Outbound::Frame(frame)).is_err() {
            log::debug!("Writer stopped, dropping {:?}", message.tag());
        }
    }

    /// Tell the optimizer we are leaving, then shut the stream down
    pub fn close(&self) {
        self.send(&Message::Close);
        self.closed.store(true, Ordering::Release);
        let _ = self.outbound.send(Outbound::Shutdown);
    }
}

impl Drop for OptimizerLink {
    fn drop(&mut self) {
        let _ = self.outbound.send(Outbound::Shutdown);
        self.reader.abort();
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Frame(bytes) => {
                if let Err(e) = writer.write_all(&bytes).await {
                    log::warn!("Optimizer send failed: {}", e);
                }
            }
            Outbound::Shutdown => break,
        }
    }
    if let Err(e) = writer.shutdown().await {
        log::debug!("Optimizer stream shutdown: {}", e);
    }
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    events: Option<mpsc::Sender<LinkEvent>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    'read: loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                log::info!("Optimizer closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                log::error!("Optimizer receive error: {}", e);
                deliver(events.as_ref(), LinkEvent::Failed(e.into()));
                break;
            }
        };
        decoder.push(&chunk[..n]);

        loop {
            let payload = match decoder.next_frame() {
                Ok(Some(payload)) => payload,
                Ok(None) => break,
                Err(e) => {
                    log::error!("Malformed frame from optimizer: {}", e);
                    deliver(events.as_ref(), LinkEvent::Failed(e));
                    break 'read;
                }
            };

            match Message::decode(&payload) {
                Ok(Message::Results(assignments)) => {
                    log::info!("Received {} assignments", assignments.len());
                    deliver(events.as_ref(), LinkEvent::Results(assignments));
                }
                Ok(Message::Close) => {
                    log::info!("Optimizer requested close");
                    break 'read;
                }
                Ok(other) => log::debug!("Ignoring inbound {:?}", other.tag()),
                Err(e) => {
                    log::error!("Malformed message from optimizer: {}", e);
                    deliver(events.as_ref(), LinkEvent::Failed(e));
                    break 'read;
                }
            }
        }
    }

    let _ = outbound.send(Outbound::Shutdown);
    deliver(events.as_ref(), LinkEvent::Closed);
    closed.store(true, Ordering::Release);
}

fn deliver(events: Option<&mpsc::Sender<LinkEvent>>, event: LinkEvent) {
    let Some(tx) = events else {
        log::debug!("No event queue registered, discarding {}", event.kind());
        return;
    };
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            log::warn!("Reached event queue capacity, dropping {}", event.kind());
        }
        Err(TrySendError::Closed(event)) => {
            log::debug!("Event queue closed, discarding {}", event.kind());
        }
    }
}
