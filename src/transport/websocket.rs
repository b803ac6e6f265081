//! Live tracker connection over WebSocket.
//!
//! A single tokio task owns the socket and multiplexes:
//! - inbound text frames → [`InboundSender::frame`]
//! - outbound commands from an unbounded channel → socket
//!
//! Dropping the outbound sender (via [`Transport::close`]) makes the task send
//! a close frame and exit. Every exit path enqueues exactly one `Closed`.
//!
//! # Example
//!
//! ```ignore
//! use gaze_client::inbound::InboundQueue;
//! use gaze_client::transport::{Transport, WebSocketTransport};
//!
//! let queue = InboundQueue::new();
//! let transport = WebSocketTransport::connect("ws://localhost:8086/", queue.sender(1))?;
//! transport.send("TOGGLE_TRACKING".to_string())?;
//! ```

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{runtime_handle, Transport};
use crate::error::{GazeError, Result};
use crate::inbound::{CloseReason, InboundSender};

/// WebSocket connection to the tracker service.
pub struct WebSocketTransport {
    outbound: Option<mpsc::UnboundedSender<String>>,
    _task: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Start connecting to `url` on the current tokio runtime.
    ///
    /// Returns immediately; `Opened` (or `Closed(Error)`) arrives on the
    /// inbound queue once the handshake settles.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::NoRuntime`] outside a tokio runtime.
    pub fn connect(url: &str, inbound: InboundSender) -> Result<Self> {
        let handle = runtime_handle()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = handle.spawn(socket_loop(url.to_string(), inbound, rx));

        Ok(Self {
            outbound: Some(tx),
            _task: task,
        })
    }
}

impl Transport for WebSocketTransport {
    fn kind(&self) -> &'static str {
        "websocket"
    }

    fn send(&self, text: String) -> Result<()> {
        let tx = self.outbound.as_ref().ok_or(GazeError::NotConnected)?;
        tx.send(text)
            .map_err(|_| GazeError::Transport("socket task has exited".to_string()))
    }

    fn close(&mut self) {
        // Queued commands are flushed before the close frame.
        self.outbound.take();
    }
}

/// Socket task: connect, then pump frames both ways until either side ends.
async fn socket_loop(
    url: String,
    inbound: InboundSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("WS:> Connect to {} failed: {}", url, e);
            inbound.closed(CloseReason::Error(e.to_string()));
            return;
        }
    };

    info!("WS:> Connected to {}", url);
    inbound.opened();

    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => inbound.frame(text),
                Some(Ok(Message::Close(_))) | None => break CloseReason::Peer,
                Some(Ok(other)) => debug!("WS:> Ignoring non-text frame ({} bytes)", other.len()),
                Some(Err(e)) => {
                    warn!("WS:> Receive error: {}", e);
                    break CloseReason::Error(e.to_string());
                }
            },
            command = outbound.recv() => match command {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!("WS:> Send error: {}", e);
                        break CloseReason::Error(e.to_string());
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break CloseReason::Local;
                }
            },
        }
    };

    info!("WS:> Disconnected ({})", reason);
    inbound.closed(reason);
}
