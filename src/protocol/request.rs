//! Outbound command requests.
//!
//! Every request is sent as a bare literal string, no payload.

/// Command sent from the client to the tracker service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandRequest {
    /// Open the service's options dialog.
    ShowOptions,
    /// Start device calibration.
    Calibrate,
    /// Start or stop gaze streaming.
    ToggleTracking,
    /// Select a tracking device.
    SetDevice,
    /// Pass a value to the device.
    PassValue,
}

impl CommandRequest {
    /// All requests, in wire-literal order.
    pub const ALL: [CommandRequest; 5] = [
        Self::ShowOptions,
        Self::Calibrate,
        Self::ToggleTracking,
        Self::SetDevice,
        Self::PassValue,
    ];

    /// Wire literal for this request.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowOptions => "SHOW_OPTIONS",
            Self::Calibrate => "CALIBRATE",
            Self::ToggleTracking => "TOGGLE_TRACKING",
            Self::SetDevice => "SET_DEVICE",
            Self::PassValue => "PASS_VALUE",
        }
    }

    /// Parse a wire literal (surrounding whitespace is ignored).
    pub fn from_literal(s: &str) -> Option<Self> {
        match s.trim() {
            "SHOW_OPTIONS" => Some(Self::ShowOptions),
            "CALIBRATE" => Some(Self::Calibrate),
            "TOGGLE_TRACKING" => Some(Self::ToggleTracking),
            "SET_DEVICE" => Some(Self::SetDevice),
            "PASS_VALUE" => Some(Self::PassValue),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
