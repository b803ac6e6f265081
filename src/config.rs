//! Client configuration.
//!
//! [`ClientConfig`] can be built in code, through
//! [`GazeClientBuilder`](crate::GazeClientBuilder), or loaded from JSON:
//!
//! ```
//! use gaze_client::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{"simulate": true}"#).unwrap();
//! assert!(config.simulate);
//! assert_eq!(config.url, "ws://localhost:8086/");
//! ```
//!
//! Missing top-level fields take the defaults below. A partially specified
//! `smoother` object fills its missing fields from
//! [`SmootherConfig::default`], not from the client-tuned values.

use serde::Deserialize;

use crate::error::{GazeError, Result};
use crate::geometry::{Viewport, DEFAULT_TITLE_BAR_HEIGHT};
use crate::simulator::SimulatorConfig;
use crate::smoother::SmootherConfig;

/// Default tracker service address.
pub const DEFAULT_URL: &str = "ws://localhost:8086/";

/// Fixation damping tuned for game-window pixels.
pub const DEFAULT_CLIENT_DAMPING_FIXATION: u32 = 250;

/// Saccade damping tuned for game-window pixels.
pub const DEFAULT_CLIENT_DAMPING_SACCADE: u32 = 1;

/// Smoothing window, ms.
pub const DEFAULT_CLIENT_TIME_WINDOW_MS: u64 = 100;

/// Saccade threshold, game-window pixels.
pub const DEFAULT_CLIENT_SACCADE_THRESHOLD: f64 = 30.0;

/// Environment variable overriding [`ClientConfig::url`].
pub const ENV_URL: &str = "GAZE_CLIENT_URL";

/// Environment variable overriding [`ClientConfig::simulate`].
pub const ENV_SIMULATE: &str = "GAZE_CLIENT_SIMULATE";

/// Everything a [`GazeClient`](crate::GazeClient) needs to run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tracker service WebSocket URL.
    pub url: String,
    /// Use the built-in simulator instead of the live service.
    pub simulate: bool,
    /// Smoothing applied to samples in game-window coordinates.
    pub smoother: SmootherConfig,
    pub simulator: SimulatorConfig,
    /// Game viewport; when set, points are centre-origin with y up.
    pub viewport: Option<Viewport>,
    /// Title bar height used when locating the game window, pixels.
    pub title_bar_height: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            simulate: false,
            smoother: SmootherConfig {
                damping_fixation: DEFAULT_CLIENT_DAMPING_FIXATION,
                damping_saccade: DEFAULT_CLIENT_DAMPING_SACCADE,
                time_window_ms: DEFAULT_CLIENT_TIME_WINDOW_MS,
                saccade_threshold: DEFAULT_CLIENT_SACCADE_THRESHOLD,
                interval_ms: None,
            },
            simulator: SimulatorConfig::default(),
            viewport: None,
            title_bar_height: DEFAULT_TITLE_BAR_HEIGHT,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `GAZE_CLIENT_URL` and `GAZE_CLIENT_SIMULATE`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_URL) {
            self.url = url;
        }
        if let Some(value) = lookup(ENV_SIMULATE) {
            self.simulate = parse_flag(&value)
                .ok_or_else(|| GazeError::Config(format!("{}={:?} is not a flag", ENV_SIMULATE, value)))?;
        }
        self.validate()
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.simulate && !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(GazeError::Config(format!("not a WebSocket URL: {}", self.url)));
        }
        if self.smoother.time_window_ms == 0 {
            return Err(GazeError::Config("smoother.time_window_ms must be > 0".into()));
        }
        if let Some(v) = self.viewport {
            if v.width <= 0.0 || v.height <= 0.0 {
                return Err(GazeError::Config(format!(
                    "viewport must be positive, got {}x{}",
                    v.width, v.height
                )));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
