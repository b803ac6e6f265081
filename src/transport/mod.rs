//! Transport module - the data sources a client can connect to.
//!
//! Provides:
//! - [`WebSocketTransport`] - the live tracker service (`tokio-tungstenite`)
//! - [`SimulatedTransport`] - a [`Simulator`](crate::simulator::Simulator)
//!   driven by a tokio task
//!
//! Both push into the same [`InboundQueue`](crate::inbound::InboundQueue), so
//! nothing downstream can tell them apart.

mod simulated;
mod websocket;

pub use simulated::SimulatedTransport;
pub use websocket::WebSocketTransport;

use crate::error::{GazeError, Result};

/// An open connection to a gaze data source.
///
/// Implementations run their I/O on a background task and report everything
/// (open, frames, close) through an [`InboundSender`](crate::inbound::InboundSender).
pub trait Transport: Send {
    /// Short name for logs, e.g. `"websocket"`.
    fn kind(&self) -> &'static str;

    /// Queue a text frame for sending.
    fn send(&self, text: String) -> Result<()>;

    /// Begin closing. A `Closed` event follows on the inbound queue.
    fn close(&mut self);
}

/// Handle of the tokio runtime the transport tasks are spawned on.
pub(crate) fn runtime_handle() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| GazeError::NoRuntime)
}
