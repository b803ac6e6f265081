//! Tracker state bitmask.
//!
//! ```text
//! bit 0 (0x01) Connected    device connected to the service
//! bit 1 (0x02) Calibrated   calibration data available
//! bit 2 (0x04) Tracking     samples are being streamed
//! bit 3 (0x08) Busy         service is showing a dialog / calibrating
//! ```

use serde::{Deserialize, Serialize};

/// Flag constants for the `value` field of a `state` record.
pub mod flags {
    /// A tracking device is connected.
    pub const CONNECTED: i32 = 0x01;
    /// The device is calibrated.
    pub const CALIBRATED: i32 = 0x02;
    /// Gaze samples are being streamed.
    pub const TRACKING: i32 = 0x04;
    /// The service is busy (options dialog, calibration in progress).
    pub const BUSY: i32 = 0x08;

    /// All known flag bits.
    pub const KNOWN_MASK: i32 = CONNECTED | CALIBRATED | TRACKING | BUSY;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(value: i32, flag: i32) -> bool {
        value & flag != 0
    }
}

/// Tracker service state as reported by the last `state` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Raw bitmask (see [`flags`]).
    pub value: i32,
}

impl SessionState {
    /// Create a state from its raw bitmask.
    pub const fn new(value: i32) -> Self {
        Self { value }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        flags::has_flag(self.value, flags::CONNECTED)
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        flags::has_flag(self.value, flags::CALIBRATED)
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        flags::has_flag(self.value, flags::TRACKING)
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        flags::has_flag(self.value, flags::BUSY)
    }

    /// Return a copy with `flag` set or cleared.
    pub fn with_flag(self, flag: i32, on: bool) -> Self {
        if on {
            Self::new(self.value | flag)
        } else {
            Self::new(self.value & !flag)
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = [
            (flags::CONNECTED, "connected"),
            (flags::CALIBRATED, "calibrated"),
            (flags::TRACKING, "tracking"),
            (flags::BUSY, "busy"),
        ]
        .iter()
        .filter(|(flag, _)| flags::has_flag(self.value, *flag))
        .map(|(_, name)| *name)
        .collect();

        if names.is_empty() {
            write!(f, "idle")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}
