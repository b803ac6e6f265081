//! Session state tracking and command gating.
//!
//! [`GazeStateMachine`] consumes decoded [`InboundMessage`]s and turns them
//! into [`GazeEvent`]s:
//! - every State message yields `StateChanged` with the recomputed
//!   [`AvailableCommands`]
//! - the Tracking bit is edge-triggered: `SessionActivated` on false→true,
//!   `SessionDeactivated` on true→false, nothing while it holds
//! - samples are mapped to game-window coordinates and smoothed
//!
//! The smoother is reset when a session activates, when it deactivates and
//! when the connection goes away.

use tracing::{debug, info, warn};

use crate::geometry::{ScreenMapping, WindowLocator, DEFAULT_TITLE_BAR_HEIGHT};
use crate::protocol::{CommandRequest, DeviceInfo, InboundMessage, SessionState};
use crate::smoother::{RawPoint, Smoother, SmootherConfig};

/// Which commands the current state allows. Advisory: nothing stops a caller
/// from sending a disallowed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AvailableCommands {
    pub show_options: bool,
    pub calibrate: bool,
    pub toggle_tracking: bool,
}

impl AvailableCommands {
    /// Nothing available (state still unknown).
    pub const NONE: Self = Self {
        show_options: false,
        calibrate: false,
        toggle_tracking: false,
    };

    pub fn from_state(state: SessionState) -> Self {
        let idle = !state.is_tracking() && !state.is_busy();
        Self {
            show_options: idle,
            calibrate: state.is_connected() && idle,
            toggle_tracking: state.is_connected() && state.is_calibrated() && !state.is_busy(),
        }
    }

    /// Whether `request` is currently meaningful. `SetDevice` and `PassValue`
    /// are never gated.
    pub fn allows(&self, request: CommandRequest) -> bool {
        match request {
            CommandRequest::ShowOptions => self.show_options,
            CommandRequest::Calibrate => self.calibrate,
            CommandRequest::ToggleTracking => self.toggle_tracking,
            CommandRequest::SetDevice | CommandRequest::PassValue => true,
        }
    }
}

/// Something collaborators should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum GazeEvent {
    DeviceAnnounced(String),
    StateChanged {
        state: SessionState,
        available: AvailableCommands,
    },
    /// Tracking started: take input ownership.
    SessionActivated,
    /// Tracking stopped or the connection went away: give input back.
    SessionDeactivated,
    /// Smoothed gaze point in game-window coordinates.
    SmoothedSample(RawPoint),
}

/// Session flags, device info and the smoothing pipeline.
pub struct GazeStateMachine {
    state: Option<SessionState>,
    device: Option<DeviceInfo>,
    smoother: Smoother<RawPoint>,
    location: Option<RawPoint>,
    mapping: ScreenMapping,
    locator: Option<Box<dyn WindowLocator>>,
    title_bar_height: f32,
    window_located: bool,
}

impl GazeStateMachine {
    pub fn new(smoother: SmootherConfig, mapping: ScreenMapping) -> Self {
        Self {
            state: None,
            device: None,
            smoother: Smoother::new(smoother),
            location: None,
            mapping,
            locator: None,
            title_bar_height: DEFAULT_TITLE_BAR_HEIGHT,
            window_located: false,
        }
    }

    /// Locate the game window on the first activation to offset samples.
    pub fn with_window_locator(
        mut self,
        locator: Box<dyn WindowLocator>,
        title_bar_height: f32,
    ) -> Self {
        self.locator = Some(locator);
        self.title_bar_height = title_bar_height;
        self
    }

    /// Apply one decoded message.
    pub fn handle(&mut self, message: InboundMessage) -> Vec<GazeEvent> {
        match message {
            InboundMessage::Sample(sample) => {
                let raw = self.mapping.apply(&sample);
                match self.smoother.feed(raw) {
                    Ok(point) => {
                        self.location = Some(point);
                        vec![GazeEvent::SmoothedSample(point)]
                    }
                    Err(e) => {
                        debug!("Dropping sample: {}", e);
                        Vec::new()
                    }
                }
            }
            InboundMessage::State(state) => self.apply_state(state),
            InboundMessage::Device(device) => {
                info!("Device: {}", device.name);
                let name = device.name.clone();
                self.device = Some(device);
                vec![GazeEvent::DeviceAnnounced(name)]
            }
            InboundMessage::Unrecognized => Vec::new(),
        }
    }

    fn apply_state(&mut self, state: SessionState) -> Vec<GazeEvent> {
        let was_tracking = self.is_tracking();
        let available = AvailableCommands::from_state(state);
        self.state = Some(state);
        debug!("State: {} ({})", state, state.value);

        let mut events = vec![GazeEvent::StateChanged { state, available }];

        match (was_tracking, state.is_tracking()) {
            (false, true) => {
                self.locate_window();
                self.smoother.reset();
                info!("Session activated");
                events.push(GazeEvent::SessionActivated);
            }
            (true, false) => {
                self.smoother.reset();
                info!("Session deactivated");
                events.push(GazeEvent::SessionDeactivated);
            }
            _ => {}
        }

        events
    }

    fn locate_window(&mut self) {
        if self.window_located {
            return;
        }
        let Some(locator) = self.locator.as_ref() else {
            return;
        };
        self.window_located = true;

        match locator.window_rect() {
            Ok(rect) => {
                self.mapping.update_from_window(rect, self.title_bar_height);
                debug!("Screen offset: {:?}", self.mapping.offset());
            }
            Err(e) => warn!("Cannot locate game window, keeping offset: {}", e),
        }
    }

    /// Forget everything about the session (transport closed or reconnecting).
    pub fn reset_session(&mut self) -> Vec<GazeEvent> {
        let was_tracking = self.is_tracking();
        self.state = None;
        self.device = None;
        self.location = None;
        self.smoother.reset();

        if was_tracking {
            info!("Session deactivated (connection reset)");
            vec![GazeEvent::SessionDeactivated]
        } else {
            Vec::new()
        }
    }

    /// `None` until the first State message of the session.
    pub fn session_state(&self) -> Option<SessionState> {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_some_and(|s| s.is_tracking())
    }

    pub fn available_commands(&self) -> AvailableCommands {
        self.state
            .map_or(AvailableCommands::NONE, AvailableCommands::from_state)
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Last smoothed point in game-window coordinates.
    pub fn current_location(&self) -> Option<RawPoint> {
        self.location
    }

    /// Label for a start/stop button.
    pub fn toggle_tracking_label(&self) -> &'static str {
        if self.is_tracking() {
            "Stop"
        } else {
            "Start"
        }
    }

    pub fn smoother(&self) -> &Smoother<RawPoint> {
        &self.smoother
    }

    pub fn mapping(&self) -> &ScreenMapping {
        &self.mapping
    }
}

impl Default for GazeStateMachine {
    fn default() -> Self {
        Self::new(SmootherConfig::default(), ScreenMapping::identity())
    }
}

impl std::fmt::Debug for GazeStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeStateMachine")
            .field("state", &self.state)
            .field("device", &self.device)
            .field("location", &self.location)
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GazeError, Result};
    use crate::geometry::{Viewport, WindowRect};
    use crate::protocol::{flags, Sample};

    fn state(value: i32) -> InboundMessage {
        InboundMessage::State(SessionState::new(value))
    }

    fn sample(ts: u64, x: f32, y: f32) -> InboundMessage {
        InboundMessage::Sample(Sample {
            ts,
            x,
            y,
            p: 0.0,
            ec: None,
        })
    }

    fn count(events: &[GazeEvent], wanted: &GazeEvent) -> usize {
        events.iter().filter(|e| *e == wanted).count()
    }

    #[test]
    fn test_unknown_until_first_state() {
        let machine = GazeStateMachine::default();
        assert_eq!(machine.session_state(), None);
        assert_eq!(machine.available_commands(), AvailableCommands::NONE);
        assert_eq!(machine.toggle_tracking_label(), "Start");
    }

    #[test]
    fn test_activation_is_edge_triggered() {
        let mut machine = GazeStateMachine::default();
        let mut events = Vec::new();

        for tracking in [1, 1, 1, 0, 0, 1] {
            let value = flags::CONNECTED | flags::CALIBRATED | tracking * flags::TRACKING;
            events.extend(machine.handle(state(value)));
        }

        let activated = count(&events, &GazeEvent::SessionActivated);
        let deactivated = count(&events, &GazeEvent::SessionDeactivated);
        assert_eq!(activated + deactivated, 3);
        assert_eq!(activated, 2);

        let changes = events
            .iter()
            .filter(|e| matches!(e, GazeEvent::StateChanged { .. }))
            .count();
        assert_eq!(changes, 6);
    }

    #[test]
    fn test_state_changed_precedes_activation() {
        let mut machine = GazeStateMachine::default();
        let events = machine.handle(state(7));

        assert!(matches!(events[0], GazeEvent::StateChanged { .. }));
        assert_eq!(events[1], GazeEvent::SessionActivated);
        assert_eq!(machine.toggle_tracking_label(), "Stop");
    }

    #[test]
    fn test_available_commands_table() {
        // (value, show_options, calibrate, toggle_tracking)
        let table = [
            (0, true, false, false),
            (1, true, true, false),
            (2, true, false, false),
            (3, true, true, true),
            (5, false, false, false),
            (7, false, false, true),
            (9, false, false, false),
            (11, false, false, false),
            (15, false, false, false),
        ];

        for (value, show_options, calibrate, toggle_tracking) in table {
            let available = AvailableCommands::from_state(SessionState::new(value));
            assert_eq!(
                available,
                AvailableCommands {
                    show_options,
                    calibrate,
                    toggle_tracking
                },
                "state {}",
                value
            );
        }
    }

    #[test]
    fn test_allows() {
        let available = AvailableCommands::from_state(SessionState::new(7));
        assert!(!available.allows(CommandRequest::Calibrate));
        assert!(!available.allows(CommandRequest::ShowOptions));
        assert!(available.allows(CommandRequest::ToggleTracking));
        assert!(AvailableCommands::NONE.allows(CommandRequest::SetDevice));
        assert!(AvailableCommands::NONE.allows(CommandRequest::PassValue));
    }

    #[test]
    fn test_device_announced() {
        let mut machine = GazeStateMachine::default();
        let events = machine.handle(InboundMessage::Device(DeviceInfo {
            name: "Tobii".to_string(),
        }));

        assert_eq!(events, vec![GazeEvent::DeviceAnnounced("Tobii".to_string())]);
        assert_eq!(machine.device().map(|d| d.name.as_str()), Some("Tobii"));
    }

    #[test]
    fn test_unrecognized_is_ignored() {
        let mut machine = GazeStateMachine::default();
        assert!(machine.handle(InboundMessage::Unrecognized).is_empty());
        assert_eq!(machine.session_state(), None);
    }

    #[test]
    fn test_samples_update_location() {
        let mut machine = GazeStateMachine::default();
        let events = machine.handle(sample(10, 5.0, 6.0));

        assert_eq!(events, vec![GazeEvent::SmoothedSample(RawPoint::new(10, 5.0, 6.0))]);
        assert_eq!(machine.current_location(), Some(RawPoint::new(10, 5.0, 6.0)));

        // Out of order: dropped, location unchanged.
        assert!(machine.handle(sample(5, 50.0, 60.0)).is_empty());
        assert_eq!(machine.current_location(), Some(RawPoint::new(10, 5.0, 6.0)));
    }

    #[test]
    fn test_deactivation_resets_smoother() {
        let mut machine = GazeStateMachine::default();
        machine.handle(state(7));
        for i in 0..10u64 {
            machine.handle(sample(i * 33, 100.0, 100.0));
        }
        assert!(machine.smoother().is_buffer_full());

        machine.handle(state(3));
        assert!(!machine.smoother().is_buffer_full());

        // First sample after deactivation passes straight through.
        let events = machine.handle(sample(1000, 400.0, 300.0));
        assert_eq!(
            events,
            vec![GazeEvent::SmoothedSample(RawPoint::new(1000, 400.0, 300.0))]
        );
    }

    #[test]
    fn test_reset_session() {
        let mut machine = GazeStateMachine::default();
        machine.handle(InboundMessage::Device(DeviceInfo {
            name: "Simulator".to_string(),
        }));
        machine.handle(state(7));

        assert_eq!(machine.reset_session(), vec![GazeEvent::SessionDeactivated]);
        assert_eq!(machine.session_state(), None);
        assert!(machine.device().is_none());
        assert!(machine.current_location().is_none());

        // Nothing to give back the second time.
        assert!(machine.reset_session().is_empty());
    }

    #[test]
    fn test_window_located_once_on_activation() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let locator = move || -> Result<WindowRect> {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(WindowRect {
                x: 100.0,
                y: 50.0,
                width: 820.0,
                height: 640.0,
            })
        };

        let mapping = ScreenMapping::centered(Viewport {
            width: 800.0,
            height: 600.0,
        });
        let mut machine = GazeStateMachine::new(SmootherConfig::default(), mapping)
            .with_window_locator(Box::new(locator), DEFAULT_TITLE_BAR_HEIGHT);

        machine.handle(state(3));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        machine.handle(state(7));
        machine.handle(state(3));
        machine.handle(state(7));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(machine.mapping().offset(), [110.0, 87.0]);
    }

    #[test]
    fn test_window_locator_failure_keeps_offset() {
        let locator = || -> Result<WindowRect> { Err(GazeError::Config("no window".into())) };
        let mut machine = GazeStateMachine::new(SmootherConfig::default(), ScreenMapping::identity())
            .with_window_locator(Box::new(locator), DEFAULT_TITLE_BAR_HEIGHT);

        let events = machine.handle(state(7));
        assert!(events.contains(&GazeEvent::SessionActivated));
        assert_eq!(machine.mapping().offset(), [0.0, 0.0]);
    }
}
