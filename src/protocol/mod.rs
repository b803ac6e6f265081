//! Protocol module - records, state flags and command literals.
//!
//! The tracker service speaks JSON text frames over a WebSocket:
//! - Inbound: `sample`, `state`, `device` records discriminated by `type`
//! - Outbound: bare command literals such as `TOGGLE_TRACKING`
//!
//! Decoding and encoding live in [`crate::codec::JsonCodec`]; this module only
//! defines the wire shapes.

mod message;
mod request;
mod state;

pub use message::{
    DeviceInfo, EyesInCamera, InboundMessage, Record, Sample, MESSAGE_TYPE_CUSTOM,
    MESSAGE_TYPE_DEVICE, MESSAGE_TYPE_SAMPLE, MESSAGE_TYPE_STATE,
};
pub use request::CommandRequest;
pub use state::{flags, SessionState};
