//! Client builder and tick loop.
//!
//! The [`GazeClientBuilder`] provides a fluent API for configuring the data
//! source, smoothing and listeners. The [`GazeClient`] manages the lifecycle:
//! 1. `connect()` starts a transport (live WebSocket or simulator)
//! 2. `tick()` drains queued transport events on the caller's thread,
//!    updates session state and notifies listeners
//! 3. `send_command()` forwards requests to the tracker
//! 4. `shutdown()` (or drop) stops tracking if this client started it and
//!    closes the transport
//!
//! # Example
//!
//! ```ignore
//! use gaze_client::{GazeClient, GazeListener, RawPoint};
//!
//! struct Cursor;
//!
//! impl GazeListener for Cursor {
//!     fn on_smoothed_sample(&mut self, point: RawPoint) {
//!         println!("gaze at {:.0},{:.0}", point.x, point.y);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = GazeClient::builder()
//!         .simulate(true)
//!         .listener(Cursor)
//!         .build()?;
//!
//!     client.connect()?;
//!     loop {
//!         client.tick();
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::error::{GazeError, Result};
use crate::geometry::{ScreenMapping, Viewport, WindowLocator};
use crate::inbound::{CloseReason, InboundSender};
use crate::protocol::{CommandRequest, DeviceInfo, SessionState};
use crate::simulator::{PointerSource, Simulator, SimulatorConfig};
use crate::smoother::{RawPoint, SmootherConfig};
use crate::state_machine::{AvailableCommands, GazeEvent, GazeStateMachine};
use crate::transport::{SimulatedTransport, Transport, WebSocketTransport};

/// Receives session notifications. Every method defaults to a no-op.
///
/// Listeners run on the thread calling [`GazeClient::tick`], in registration
/// order.
pub trait GazeListener: Send {
    fn on_device_announced(&mut self, _name: &str) {}

    fn on_state_changed(&mut self, _state: SessionState, _available: AvailableCommands) {}

    /// Tracking started: the gaze now owns input.
    fn on_session_activated(&mut self) {}

    /// Tracking stopped or the connection was lost: return input ownership.
    fn on_session_deactivated(&mut self) {}

    /// Smoothed gaze point in game-window coordinates.
    fn on_smoothed_sample(&mut self, _point: RawPoint) {}

    fn on_disconnected(&mut self, _reason: &CloseReason) {}
}

/// Pointer source shared by every simulator the client starts.
#[derive(Clone)]
struct SharedPointer(Arc<Mutex<Box<dyn PointerSource>>>);

impl PointerSource for SharedPointer {
    fn position(&self) -> (f32, f32) {
        self.0.lock().position()
    }
}

/// Builder for configuring and creating a [`GazeClient`].
pub struct GazeClientBuilder {
    config: ClientConfig,
    listeners: Vec<Box<dyn GazeListener>>,
    pointer: Option<Box<dyn PointerSource>>,
    locator: Option<Box<dyn WindowLocator>>,
    first_session: Option<u64>,
}

impl GazeClientBuilder {
    /// Create a new builder with [`ClientConfig::default`].
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            listeners: Vec::new(),
            pointer: None,
            locator: None,
            first_session: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the tracker service URL.
    ///
    /// Default: `ws://localhost:8086/`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Use the built-in simulator instead of the live service.
    pub fn simulate(mut self, simulate: bool) -> Self {
        self.config.simulate = simulate;
        self
    }

    pub fn smoother(mut self, smoother: SmootherConfig) -> Self {
        self.config.smoother = smoother;
        self
    }

    pub fn simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.config.simulator = simulator;
        self
    }

    /// Pointer position fed to the simulator, screen pixels.
    ///
    /// Default: a pointer fixed at the screen origin.
    pub fn pointer(mut self, pointer: impl PointerSource) -> Self {
        self.pointer = Some(Box::new(pointer));
        self
    }

    /// Map samples into a centre-origin, y-up viewport.
    pub fn viewport(mut self, width: f32, height: f32) -> Self {
        self.config.viewport = Some(Viewport { width, height });
        self
    }

    /// Locate the game window on the first activation.
    pub fn window_locator(mut self, locator: impl WindowLocator) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn listener(mut self, listener: impl GazeListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Start session ids at `first` instead of 1.
    pub fn first_session(mut self, first: u64) -> Self {
        self.first_session = Some(first);
        self
    }

    /// Validate the configuration and build the client. Nothing connects
    /// until [`GazeClient::connect`].
    pub fn build(self) -> Result<GazeClient> {
        self.config.validate()?;

        let mapping = match self.config.viewport {
            Some(viewport) => ScreenMapping::centered(viewport),
            None => ScreenMapping::identity(),
        };
        let mut machine = GazeStateMachine::new(self.config.smoother.clone(), mapping);
        if let Some(locator) = self.locator {
            machine = machine.with_window_locator(locator, self.config.title_bar_height);
        }

        let connection = match self.first_session {
            Some(first) => ConnectionManager::with_first_session(first),
            None => ConnectionManager::new(),
        };

        let pointer: Box<dyn PointerSource> = match self.pointer {
            Some(pointer) => pointer,
            None => Box::new(|| (0.0f32, 0.0f32)),
        };

        Ok(GazeClient {
            config: self.config,
            connection,
            machine,
            listeners: self.listeners,
            pointer: SharedPointer(Arc::new(Mutex::new(pointer))),
            initiated_tracking: false,
        })
    }
}

impl Default for GazeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Eye-tracker client.
///
/// Not thread-safe by itself; drive it from one thread (usually the game
/// loop) and let the transport tasks do the I/O.
pub struct GazeClient {
    config: ClientConfig,
    connection: ConnectionManager,
    machine: GazeStateMachine,
    listeners: Vec<Box<dyn GazeListener>>,
    pointer: SharedPointer,
    /// Tracking was switched on by this client, so shutdown switches it off.
    initiated_tracking: bool,
}

impl GazeClient {
    /// Create a new client builder.
    pub fn builder() -> GazeClientBuilder {
        GazeClientBuilder::new()
    }

    /// Build a client from a configuration with no listeners.
    pub fn new(config: ClientConfig) -> Result<Self> {
        GazeClientBuilder::new().config(config).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start the configured transport on the current tokio runtime.
    ///
    /// Session state is reset to unknown first. The connection completes in
    /// the background; watch `is_connected()` or the listeners.
    ///
    /// # Errors
    ///
    /// [`GazeError::AlreadyConnected`] if a transport is active,
    /// [`GazeError::NoRuntime`] outside a tokio runtime.
    pub fn connect(&mut self) -> Result<()> {
        if self.simulate() {
            let simulator = Simulator::new(self.config.simulator.clone(), self.pointer.clone());
            self.open_transport(move |tx| {
                Ok(Box::new(SimulatedTransport::start(simulator, tx)?) as Box<dyn Transport>)
            })
        } else {
            let url = self.config.url.clone();
            info!("Connecting to {}", url);
            self.open_transport(move |tx| {
                Ok(Box::new(WebSocketTransport::connect(&url, tx)?) as Box<dyn Transport>)
            })
        }
    }

    fn open_transport<F>(&mut self, factory: F) -> Result<()>
    where
        F: FnOnce(InboundSender) -> Result<Box<dyn Transport>>,
    {
        if self.connection.is_active() {
            return Err(GazeError::AlreadyConnected);
        }

        let events = self.machine.reset_session();
        self.dispatch(events);
        self.initiated_tracking = false;

        self.connection.open(factory).map(|_| ())
    }

    fn simulate(&self) -> bool {
        self.config.simulate
    }

    /// Close the transport. Listeners hear about it on the next `tick()`.
    pub fn disconnect(&mut self) {
        if self.connection.close() {
            self.initiated_tracking = false;
        }
    }

    /// Send a command. Gating is advisory: disallowed commands are sent anyway.
    ///
    /// # Errors
    ///
    /// [`GazeError::NotConnected`] unless the transport is open (see
    /// [`is_connected`](Self::is_connected)); the attempt is counted in
    /// [`failed_sends`](Self::failed_sends).
    pub fn send_command(&mut self, request: CommandRequest) -> Result<()> {
        if !self.machine.available_commands().allows(request) {
            debug!("{} sent while not available", request);
        }

        let starting = request == CommandRequest::ToggleTracking && !self.machine.is_tracking();
        self.connection.send(request)?;

        if request == CommandRequest::ToggleTracking {
            self.initiated_tracking = starting;
        }
        Ok(())
    }

    /// Process everything the transport delivered since the last call.
    ///
    /// Returns the number of transport events handled.
    pub fn tick(&mut self) -> usize {
        let events = self.connection.poll();
        let handled = events.len();

        for event in events {
            match event {
                ConnectionEvent::Opened => info!("Connected"),
                ConnectionEvent::Message(message) => {
                    let events = self.machine.handle(message);
                    self.dispatch(events);
                }
                ConnectionEvent::Closed(reason) => {
                    match &reason {
                        CloseReason::Error(_) => warn!("Disconnected: {}", reason),
                        _ => info!("Disconnected: {}", reason),
                    }
                    self.initiated_tracking = false;
                    let events = self.machine.reset_session();
                    self.dispatch(events);
                    for listener in &mut self.listeners {
                        listener.on_disconnected(&reason);
                    }
                }
            }
        }

        handled
    }

    fn dispatch(&mut self, events: Vec<GazeEvent>) {
        for event in events {
            for listener in &mut self.listeners {
                match &event {
                    GazeEvent::DeviceAnnounced(name) => listener.on_device_announced(name),
                    GazeEvent::StateChanged { state, available } => {
                        listener.on_state_changed(*state, *available)
                    }
                    GazeEvent::SessionActivated => listener.on_session_activated(),
                    GazeEvent::SessionDeactivated => listener.on_session_deactivated(),
                    GazeEvent::SmoothedSample(point) => listener.on_smoothed_sample(*point),
                }
            }
        }
    }

    /// Stop tracking if this client started it, close the transport and
    /// deliver the final events. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.connection.is_active() {
            return;
        }

        if self.initiated_tracking && self.machine.is_tracking() {
            info!("Stopping tracking before shutdown");
            if let Err(e) = self.connection.send(CommandRequest::ToggleTracking) {
                warn!("Could not stop tracking: {}", e);
            }
        }

        self.disconnect();
        self.tick();
    }

    pub fn is_tracking(&self) -> bool {
        self.machine.is_tracking()
    }

    /// Last smoothed gaze point, game-window coordinates.
    pub fn current_location(&self) -> Option<RawPoint> {
        self.machine.current_location()
    }

    /// `None` until the tracker reports its state.
    pub fn session_state(&self) -> Option<SessionState> {
        self.machine.session_state()
    }

    pub fn available_commands(&self) -> AvailableCommands {
        self.machine.available_commands()
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.machine.device()
    }

    /// `"Start"` or `"Stop"`.
    pub fn toggle_tracking_label(&self) -> &'static str {
        self.machine.toggle_tracking_label()
    }

    pub fn failed_sends(&self) -> u64 {
        self.connection.failed_sends()
    }

    /// The transport is open (handshake done, not closed since).
    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }
}

impl Drop for GazeClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for GazeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeClient")
            .field("config", &self.config)
            .field("connection", &self.connection)
            .field("machine", &self.machine)
            .field("listeners", &self.listeners.len())
            .field("initiated_tracking", &self.initiated_tracking)
            .finish()
    }
}
