//! Inbound record types.
//!
//! ```text
//! {"type":"sample","ts":1234,"x":512.0,"y":384.0,"p":6.0,"ec":{"xl":..,"yl":..,"xr":..,"yr":..}}
//! {"type":"state","value":7}
//! {"type":"device","name":"Simulator"}
//! ```

use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// `type` discriminant of a gaze sample record.
pub const MESSAGE_TYPE_SAMPLE: &str = "sample";
/// `type` discriminant of a state record.
pub const MESSAGE_TYPE_STATE: &str = "state";
/// `type` discriminant of a device record.
pub const MESSAGE_TYPE_DEVICE: &str = "device";
/// `type` discriminant of service-specific records; never decoded.
pub const MESSAGE_TYPE_CUSTOM: &str = "custom";

/// Eye positions in the tracker's camera view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyesInCamera {
    /// Left eye X.
    pub xl: f32,
    /// Left eye Y.
    pub yl: f32,
    /// Right eye X.
    pub xr: f32,
    /// Right eye Y.
    pub yr: f32,
}

/// A single gaze sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp, ms.
    pub ts: u64,
    /// Gaze X, screen pixels.
    pub x: f32,
    /// Gaze Y, screen pixels.
    pub y: f32,
    /// Pupil size.
    #[serde(default)]
    pub p: f32,
    /// Eyes in camera view, if the device reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<EyesInCamera>,
}

/// Device announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name.
    pub name: String,
}

/// A well-formed record, tagged by its `type` field.
///
/// This is the serde view of the wire; unknown tags fail to deserialize and
/// become [`InboundMessage::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Sample(Sample),
    State(SessionState),
    Device(DeviceInfo),
}

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Gaze sample.
    Sample(Sample),
    /// Service state update.
    State(SessionState),
    /// Device announcement.
    Device(DeviceInfo),
    /// Anything else: custom records, unknown or missing `type`, bad JSON.
    Unrecognized,
}

impl InboundMessage {
    /// `type` discriminant this message was decoded from, if any.
    pub fn message_type(&self) -> Option<&'static str> {
        match self {
            Self::Sample(_) => Some(MESSAGE_TYPE_SAMPLE),
            Self::State(_) => Some(MESSAGE_TYPE_STATE),
            Self::Device(_) => Some(MESSAGE_TYPE_DEVICE),
            Self::Unrecognized => None,
        }
    }

    #[inline]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl From<Record> for InboundMessage {
    fn from(record: Record) -> Self {
        match record {
            Record::Sample(sample) => Self::Sample(sample),
            Record::State(state) => Self::State(state),
            Record::Device(device) => Self::Device(device),
        }
    }
}
