//! Codec module - decoding inbound frames and encoding outbound ones.
//!
//! - [`JsonCodec`] - JSON text frames (`serde_json`)
//!
//! # Design
//!
//! The codec is a marker struct with static methods rather than a trait object.
//! Decoding never fails: anything that is not a well-formed `sample`, `state`
//! or `device` record becomes [`InboundMessage::Unrecognized`].
//!
//! [`InboundMessage::Unrecognized`]: crate::protocol::InboundMessage::Unrecognized
//!
//! # Example
//!
//! ```
//! use gaze_client::codec::JsonCodec;
//! use gaze_client::protocol::{CommandRequest, InboundMessage};
//!
//! let msg = JsonCodec::decode(r#"{"type":"state","value":3}"#);
//! match msg {
//!     InboundMessage::State(state) => assert!(state.is_calibrated()),
//!     other => panic!("unexpected {:?}", other),
//! }
//!
//! assert_eq!(JsonCodec::encode_request(CommandRequest::Calibrate), "CALIBRATE");
//! assert_eq!(JsonCodec::decode("not json"), InboundMessage::Unrecognized);
//! ```

mod json;

pub use json::JsonCodec;
