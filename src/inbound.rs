//! Inbound event queue shared between transport I/O and the processing tick.
//!
//! # Architecture
//!
//! ```text
//! WebSocket task ─┐
//!                 ├─► InboundSender::push ─► Mutex<VecDeque> ─► InboundQueue::drain (tick)
//! Simulator task ─┘
//! ```
//!
//! Only one producer is live at a time. The lock is held for a single
//! `push_back` or `mem::take`, never while decoding.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Why a transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by this client (`disconnect`, shutdown).
    Local,
    /// The service closed the connection.
    Peer,
    /// Connect failure or I/O error.
    Error(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "closed locally"),
            Self::Peer => write!(f, "closed by peer"),
            Self::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Something a transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is ready to send and receive.
    Opened,
    /// A raw text frame.
    Frame(String),
    /// The transport is gone; nothing follows for this session.
    Closed(CloseReason),
}

/// A transport event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub session: u64,
    pub event: TransportEvent,
}

type Shared = Arc<Mutex<VecDeque<QueuedEvent>>>;

/// FIFO of transport events, drained once per tick.
#[derive(Debug, Default)]
pub struct InboundQueue {
    events: Shared,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a producer handle bound to `session`.
    pub fn sender(&self, session: u64) -> InboundSender {
        InboundSender {
            session,
            events: self.events.clone(),
        }
    }

    /// Take every queued event in arrival order. Never blocks on new events.
    pub fn drain(&self) -> Vec<QueuedEvent> {
        let taken = std::mem::take(&mut *self.events.lock());
        taken.into()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Producer side of an [`InboundQueue`], cheap to clone.
#[derive(Debug, Clone)]
pub struct InboundSender {
    session: u64,
    events: Shared,
}

impl InboundSender {
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn push(&self, event: TransportEvent) {
        self.events.lock().push_back(QueuedEvent {
            session: self.session,
            event,
        });
    }

    #[inline]
    pub fn opened(&self) {
        self.push(TransportEvent::Opened);
    }

    #[inline]
    pub fn frame(&self, text: impl Into<String>) {
        self.push(TransportEvent::Frame(text.into()));
    }

    #[inline]
    pub fn closed(&self, reason: CloseReason) {
        self.push(TransportEvent::Closed(reason));
    }
}
