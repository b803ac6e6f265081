//! Adaptive gaze smoothing.
//!
//! Raw tracker output jitters by a few pixels even while the eye is holding
//! still. The [`Smoother`] damps that jitter heavily during fixations and only
//! lightly during saccades, so the cursor stays calm without lagging behind
//! fast eye movements.
//!
//! # Algorithm
//!
//! 1. Keep the points of the last `time_window_ms` in a FIFO buffer.
//! 2. Until the buffer spans the whole window and holds more than 3 points,
//!    return the input unchanged.
//! 3. Split the buffer at half the window, average both halves and compare the
//!    distance of the averages with `saccade_threshold`: above it the gaze is
//!    in a saccade, otherwise in a fixation.
//! 4. Estimate the sampling interval once per session from the buffer.
//! 5. Apply `out = (in + alpha * prev) / (1 + alpha)` per axis, where
//!    `alpha = damping / interval`.
//!
//! # Example
//!
//! ```
//! use gaze_client::smoother::{RawPoint, Smoother, SmootherConfig};
//!
//! let mut smoother = Smoother::new(SmootherConfig::default());
//! for i in 0..10u64 {
//!     let out = smoother.feed(RawPoint::new(i * 33, 0.5, 0.5)).unwrap();
//!     assert_eq!((out.x, out.y), (0.5, 0.5));
//! }
//! ```

use std::collections::VecDeque;

use serde::Deserialize;

use crate::error::{GazeError, Result};

/// Default damping during fixations.
pub const DEFAULT_DAMPING_FIXATION: u32 = 100;

/// Default damping during saccades.
pub const DEFAULT_DAMPING_SACCADE: u32 = 1;

/// Default buffer time window, ms.
pub const DEFAULT_TIME_WINDOW_MS: u64 = 100;

/// Default saccade threshold, in the units of the fed points.
pub const DEFAULT_SACCADE_THRESHOLD: f64 = 0.02;

/// Minimum number of buffered points (exclusive) before smoothing starts.
const MIN_FULL_POINTS: usize = 3;

/// A point-like value the [`Smoother`] can damp.
pub trait Smoothable: Clone {
    /// Timestamp, ms.
    fn timestamp(&self) -> u64;

    fn x(&self) -> f32;

    fn y(&self) -> f32;

    /// Create an independent copy of `other`.
    fn copy_from(other: &Self) -> Self {
        other.clone()
    }

    /// Move `self` toward `reference` with decay factor `alpha` and restamp it.
    fn shift(&mut self, reference: &Self, alpha: f64, timestamp: u64);
}

#[inline]
fn decay(input: f32, previous: f32, alpha: f64) -> f32 {
    ((input as f64 + alpha * previous as f64) / (1.0 + alpha)) as f32
}

/// A 2-D gaze point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawPoint {
    /// Timestamp, ms.
    pub timestamp: u64,
    pub x: f32,
    pub y: f32,
}

impl RawPoint {
    pub fn new(timestamp: u64, x: f32, y: f32) -> Self {
        Self { timestamp, x, y }
    }

    /// Euclidean distance to another point, ignoring timestamps.
    pub fn distance(&self, other: &RawPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Smoothable for RawPoint {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn shift(&mut self, reference: &Self, alpha: f64, timestamp: u64) {
        self.timestamp = timestamp;
        self.x = decay(reference.x, self.x, alpha);
        self.y = decay(reference.y, self.y, alpha);
    }
}

/// A 3-D unit gaze direction, smoothed in its tangent-plane projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawVector {
    /// Timestamp, ms.
    pub timestamp: u64,
    /// `tan(asin(direction.x))`
    pub x: f32,
    /// `tan(asin(direction.y))`
    pub y: f32,
    pub z: f32,
    original: [f32; 3],
}

impl RawVector {
    /// Project a unit direction vector.
    pub fn new(timestamp: u64, direction: [f32; 3]) -> Self {
        Self {
            timestamp,
            x: direction[0].asin().tan(),
            y: direction[1].asin().tan(),
            z: direction[2],
            original: direction,
        }
    }

    /// Direction this value was created from.
    pub fn vector_original(&self) -> [f32; 3] {
        self.original
    }

    /// Current (possibly smoothed) components.
    pub fn vector_shifted(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Smoothable for RawVector {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn shift(&mut self, reference: &Self, alpha: f64, timestamp: u64) {
        self.timestamp = timestamp;
        self.x = decay(reference.x, self.x, alpha);
        self.y = decay(reference.y, self.y, alpha);
        self.z = (1.0 - self.x * self.x - self.y * self.y).max(0.0).sqrt();
    }
}

/// Gaze classification of the current buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GazeState {
    /// Not enough data to classify.
    #[default]
    Unknown,
    /// Gaze holds still; heavy damping.
    Fixation,
    /// Gaze jumps; light damping.
    Saccade,
}

impl GazeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fixation => "fixation",
            Self::Saccade => "saccade",
        }
    }
}

/// Smoothing parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Damping (smoothing strength) during fixations.
    pub damping_fixation: u32,
    /// Damping during saccades.
    pub damping_saccade: u32,
    /// Buffer time window, ms. Should hold at least 6 samples.
    pub time_window_ms: u64,
    /// Distance between the averages of the buffer halves above which the
    /// gaze counts as a saccade. Unit-free: same units as the fed points.
    pub saccade_threshold: f64,
    /// Fixed sampling interval, ms. `None` estimates it from the data.
    pub interval_ms: Option<u64>,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            damping_fixation: DEFAULT_DAMPING_FIXATION,
            damping_saccade: DEFAULT_DAMPING_SACCADE,
            time_window_ms: DEFAULT_TIME_WINDOW_MS,
            saccade_threshold: DEFAULT_SACCADE_THRESHOLD,
            interval_ms: None,
        }
    }
}

/// Adaptive exponential smoother over a stream of [`Smoothable`] points.
///
/// Timestamps must be non-decreasing; an older point is rejected with
/// [`GazeError::OutOfOrderSample`] and leaves the smoother untouched.
#[derive(Debug, Clone)]
pub struct Smoother<T: Smoothable> {
    config: SmootherConfig,
    buffer: VecDeque<T>,
    is_full: bool,
    current: Option<T>,
    state: GazeState,
    estimated_interval: Option<u64>,
}

impl<T: Smoothable> Smoother<T> {
    /// Create a new smoother.
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            config,
            buffer: VecDeque::new(),
            is_full: false,
            current: None,
            state: GazeState::Unknown,
            estimated_interval: None,
        }
    }

    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Last classification.
    pub fn gaze_state(&self) -> GazeState {
        self.state
    }

    /// Sampling interval in use: the configured one, else the estimate.
    pub fn interval(&self) -> Option<u64> {
        self.config
            .interval_ms
            .filter(|&ms| ms > 0)
            .or(self.estimated_interval)
    }

    /// Damping constant for the current classification.
    pub fn damping(&self) -> u32 {
        match self.state {
            GazeState::Saccade => self.config.damping_saccade,
            _ => self.config.damping_fixation,
        }
    }

    /// Last output, if any point was fed since the last reset.
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Whether the buffer has filled once since the last reset.
    pub fn is_buffer_full(&self) -> bool {
        self.is_full
    }

    /// Number of buffered points.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clear buffer, classification, output and estimated interval.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.is_full = false;
        self.current = None;
        self.state = GazeState::Unknown;
        self.estimated_interval = None;
    }

    /// Take a raw point and return the smoothed one.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::OutOfOrderSample`] if `point` is older than the
    /// newest buffered point.
    pub fn feed(&mut self, point: T) -> Result<T> {
        if let Some(last) = self.buffer.back() {
            if point.timestamp() < last.timestamp() {
                return Err(GazeError::OutOfOrderSample {
                    previous: last.timestamp(),
                    received: point.timestamp(),
                });
            }
        }

        if !self.add_to_buffer(point.clone()) {
            return Ok(self.pass_through(&point));
        }

        self.state = self.estimate_state();
        if self.state == GazeState::Unknown {
            return Ok(self.pass_through(&point));
        }

        let interval = match self.interval() {
            Some(interval) => interval,
            None => {
                let estimated = self.estimate_interval(&point);
                if estimated == 0 {
                    tracing::debug!(
                        "Sampling interval estimate is zero over {} points, passing through",
                        self.buffer.len()
                    );
                    return Ok(self.pass_through(&point));
                }
                tracing::debug!("Estimated sampling interval: {} ms", estimated);
                self.estimated_interval = Some(estimated);
                self.current = Some(T::copy_from(&point));
                estimated
            }
        };

        let alpha = self.damping() as f64 / interval as f64;
        let current = self.current.get_or_insert_with(|| T::copy_from(&point));
        current.shift(&point, alpha, point.timestamp());

        Ok(current.clone())
    }

    fn pass_through(&mut self, point: &T) -> T {
        let copy = T::copy_from(point);
        self.current = Some(copy.clone());
        copy
    }

    /// Push a point and evict stale ones. Returns whether the buffer is full.
    fn add_to_buffer(&mut self, point: T) -> bool {
        let window = self.config.time_window_ms;
        let latest = point.timestamp();
        self.buffer.push_back(point);

        if !self.is_full {
            let oldest = self.buffer.front().map_or(latest, |p| p.timestamp());
            self.is_full = latest - oldest >= window && self.buffer.len() > MIN_FULL_POINTS;
        }

        while self.buffer.len() > 1 {
            match self.buffer.front() {
                Some(front) if latest - front.timestamp() >= window => {
                    self.buffer.pop_front();
                }
                _ => break,
            }
        }

        self.is_full
    }

    fn estimate_state(&self) -> GazeState {
        let oldest = match self.buffer.front() {
            Some(p) => p.timestamp(),
            None => return GazeState::Unknown,
        };
        let half = self.config.time_window_ms / 2;

        let (mut newer_x, mut newer_y, mut newer_n) = (0.0f64, 0.0f64, 0u32);
        let (mut older_x, mut older_y, mut older_n) = (0.0f64, 0.0f64, 0u32);

        for p in &self.buffer {
            if p.timestamp() - oldest > half {
                newer_x += p.x() as f64;
                newer_y += p.y() as f64;
                newer_n += 1;
            } else {
                older_x += p.x() as f64;
                older_y += p.y() as f64;
                older_n += 1;
            }
        }

        if newer_n == 0 || older_n == 0 {
            return GazeState::Unknown;
        }

        let dx = newer_x / newer_n as f64 - older_x / older_n as f64;
        let dy = newer_y / newer_n as f64 - older_y / older_n as f64;

        if (dx * dx + dy * dy).sqrt() > self.config.saccade_threshold {
            GazeState::Saccade
        } else {
            GazeState::Fixation
        }
    }

    fn estimate_interval(&self, latest: &T) -> u64 {
        let count = self.buffer.len() as u64;
        match self.buffer.front() {
            Some(oldest) if count >= 2 => (latest.timestamp() - oldest.timestamp()) / (count - 1),
            _ => 0,
        }
    }
}

impl<T: Smoothable> Default for Smoother<T> {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}
