//! Simulated tracker for development without eye-tracking hardware.
//!
//! The simulator behaves like the tracker service as seen over the wire:
//! - on activation it announces a `"Simulator"` device and a
//!   `Connected | Calibrated` state
//! - `TOGGLE_TRACKING` flips the Tracking bit and reports the new state
//! - while tracking, a sample is produced every 33.33 ms from a pointer
//!   position (typically the mouse) shifted by a calibration offset
//!
//! [`Simulator`] itself is synchronous; [`SimulatedTransport`] drives it on a
//! tokio task.
//!
//! [`SimulatedTransport`]: crate::transport::SimulatedTransport

use std::time::Duration;

use serde::Deserialize;

use crate::protocol::{flags, CommandRequest, DeviceInfo, Record, Sample, SessionState};

/// Default interval between simulated samples, µs (30 Hz).
pub const DEFAULT_SAMPLE_INTERVAL_US: u64 = 33_333;

/// Timestamp increment per simulated sample, ms.
pub const TIMESTAMP_STEP_MS: u64 = 33;

/// Device name announced by the simulator.
pub const DEFAULT_DEVICE_NAME: &str = "Simulator";

/// Pupil size reported in simulated samples.
pub const SIMULATED_PUPIL_SIZE: f32 = 6.0;

/// Live pointer position used as the simulated gaze point.
///
/// Coordinates are screen pixels with the origin at the top-left corner.
pub trait PointerSource: Send + 'static {
    fn position(&self) -> (f32, f32);
}

impl<F> PointerSource for F
where
    F: Fn() -> (f32, f32) + Send + 'static,
{
    fn position(&self) -> (f32, f32) {
        self()
    }
}

/// Simulator settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Interval between samples while tracking, µs.
    pub sample_interval_us: u64,
    /// Name announced in the device record.
    pub device_name: String,
    /// Offset added to the pointer position, screen pixels.
    pub calibration_offset: [f32; 2],
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_interval_us: DEFAULT_SAMPLE_INTERVAL_US,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            calibration_offset: [0.0, 0.0],
        }
    }
}

impl SimulatorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_micros(self.sample_interval_us.max(1))
    }
}

/// Synthetic tracker state machine.
pub struct Simulator {
    config: SimulatorConfig,
    state: SessionState,
    timestamp: u64,
    pointer: Box<dyn PointerSource>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, pointer: impl PointerSource) -> Self {
        Self {
            config,
            state: SessionState::new(flags::CONNECTED | flags::CALIBRATED),
            timestamp: 0,
            pointer: Box::new(pointer),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking()
    }

    /// Records sent when the simulator is activated: device, then state.
    pub fn announce(&self) -> Vec<Record> {
        vec![
            Record::Device(DeviceInfo {
                name: self.config.device_name.clone(),
            }),
            Record::State(self.state),
        ]
    }

    /// React to a command. Only `ToggleTracking` produces a record.
    pub fn handle_command(&mut self, request: CommandRequest) -> Option<Record> {
        match request {
            CommandRequest::ToggleTracking => Some(self.toggle_tracking()),
            other => {
                tracing::debug!("Simulator ignores {}", other);
                None
            }
        }
    }

    /// Flip the Tracking bit. Stopping rewinds the sample clock to zero.
    pub fn toggle_tracking(&mut self) -> Record {
        let tracking = !self.state.is_tracking();
        self.state = self.state.with_flag(flags::TRACKING, tracking);
        if !tracking {
            self.timestamp = 0;
        }
        tracing::debug!("Simulator state: {}", self.state);
        Record::State(self.state)
    }

    /// Produce the next sample, or `None` while not tracking.
    pub fn next_sample(&mut self) -> Option<Record> {
        if !self.state.is_tracking() {
            return None;
        }

        self.timestamp += TIMESTAMP_STEP_MS;
        let (px, py) = self.pointer.position();
        let [ox, oy] = self.config.calibration_offset;

        Some(Record::Sample(Sample {
            ts: self.timestamp,
            x: px + ox,
            y: py + oy,
            p: SIMULATED_PUPIL_SIZE,
            ec: None,
        }))
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
