//! Connection lifecycle: one transport at a time, one inbound queue.
//!
//! Every [`ConnectionManager::open`] starts a new session. Transports push
//! events tagged with their session id; [`ConnectionManager::poll`] drops
//! anything left over from an earlier session, so a late frame from a socket
//! that is still shutting down can never leak into the next connection.

use tracing::{debug, info, trace, warn};

use crate::codec::JsonCodec;
use crate::error::{GazeError, Result};
use crate::inbound::{CloseReason, InboundQueue, InboundSender, TransportEvent};
use crate::protocol::{CommandRequest, InboundMessage};
use crate::transport::Transport;

/// Session id handed to the first connection by [`ConnectionManager::new`].
pub const FIRST_SESSION: u64 = 1;

/// An inbound event after session filtering and decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    Message(InboundMessage),
    Closed(CloseReason),
}

/// Owns the active transport and the queue it reports into.
pub struct ConnectionManager {
    queue: InboundQueue,
    transport: Option<Box<dyn Transport>>,
    session: Option<u64>,
    next_session: u64,
    opened: bool,
    failed_sends: u64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_first_session(FIRST_SESSION)
    }

    /// Start the session sequence at `first`.
    pub fn with_first_session(first: u64) -> Self {
        Self {
            queue: InboundQueue::new(),
            transport: None,
            session: None,
            next_session: first,
            opened: false,
            failed_sends: 0,
        }
    }

    /// Open a new session using `factory` to build the transport.
    ///
    /// The factory receives the sender the transport must report through.
    ///
    /// # Errors
    ///
    /// [`GazeError::AlreadyConnected`] while a transport is active, or
    /// whatever the factory returns.
    pub fn open<F>(&mut self, factory: F) -> Result<u64>
    where
        F: FnOnce(InboundSender) -> Result<Box<dyn Transport>>,
    {
        if self.transport.is_some() {
            return Err(GazeError::AlreadyConnected);
        }

        let session = self.next_session;
        let transport = factory(self.queue.sender(session))?;
        self.next_session = session.wrapping_add(1);

        info!("Session {} opening ({})", session, transport.kind());
        self.transport = Some(transport);
        self.session = Some(session);
        self.opened = false;
        Ok(session)
    }

    /// Close the active transport.
    ///
    /// `Closed(Local)` is queued behind everything the transport already
    /// delivered; events the transport task produces afterwards are stale.
    /// Returns `false` when nothing was open.
    pub fn close(&mut self) -> bool {
        let Some(mut transport) = self.transport.take() else {
            return false;
        };
        transport.close();
        self.opened = false;

        if let Some(session) = self.session {
            info!("Session {} closing ({})", session, transport.kind());
            self.queue.sender(session).closed(CloseReason::Local);
        }
        true
    }

    /// Drain the queue and decode frames for the current session.
    ///
    /// The first `Closed` ends the session: the transport is dropped and
    /// everything after it is ignored.
    pub fn poll(&mut self) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();

        for queued in self.queue.drain() {
            if self.session != Some(queued.session) {
                debug!("Dropping event from stale session {}", queued.session);
                continue;
            }

            match queued.event {
                TransportEvent::Opened => {
                    self.opened = true;
                    events.push(ConnectionEvent::Opened);
                }
                TransportEvent::Frame(text) => {
                    let message = JsonCodec::decode(&text);
                    if let Some(kind) = message.message_type() {
                        trace!("Frame: {}", kind);
                    }
                    events.push(ConnectionEvent::Message(message));
                }
                TransportEvent::Closed(reason) => {
                    if let Some(mut transport) = self.transport.take() {
                        transport.close();
                    }
                    self.session = None;
                    self.opened = false;
                    events.push(ConnectionEvent::Closed(reason));
                }
            }
        }

        events
    }

    /// Send a command on the active transport.
    ///
    /// # Errors
    ///
    /// [`GazeError::NotConnected`] until `Opened` has been polled for the
    /// current session; the attempt is counted in
    /// [`failed_sends`](Self::failed_sends).
    pub fn send(&mut self, request: CommandRequest) -> Result<()> {
        let transport = match self.transport.as_ref() {
            Some(transport) if self.opened => transport,
            _ => {
                self.failed_sends += 1;
                warn!("Dropping {}: not connected", request);
                return Err(GazeError::NotConnected);
            }
        };

        let literal = JsonCodec::encode_request(request);
        match transport.send(literal.to_string()) {
            Ok(()) => {
                debug!("Sent {}", literal);
                Ok(())
            }
            Err(e) => {
                self.failed_sends += 1;
                warn!("Failed to send {}: {}", literal, e);
                Err(e)
            }
        }
    }

    /// Number of commands dropped because no transport could take them.
    pub fn failed_sends(&self) -> u64 {
        self.failed_sends
    }

    /// A transport exists (it may still be handshaking).
    pub fn is_active(&self) -> bool {
        self.transport.is_some()
    }

    /// The transport reported `Opened` and has not closed since.
    pub fn is_open(&self) -> bool {
        self.transport.is_some() && self.opened
    }

    pub fn session(&self) -> Option<u64> {
        self.session
    }

    pub fn transport_kind(&self) -> Option<&'static str> {
        self.transport.as_ref().map(|t| t.kind())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("transport", &self.transport_kind())
            .field("session", &self.session)
            .field("opened", &self.opened)
            .field("failed_sends", &self.failed_sends)
            .finish()
    }
}
