//! JSON codec using `serde_json`.
//!
//! Inbound frames are decoded in a single pass: the internally tagged
//! [`Record`] enum reads the `type` discriminant once and deserializes the
//! matching shape. Outbound commands are bare literals, not JSON.

use crate::error::Result;
use crate::protocol::{CommandRequest, InboundMessage, Record};

/// JSON codec for tracker frames.
pub struct JsonCodec;

impl JsonCodec {
    /// Decode one text frame.
    ///
    /// Malformed JSON, unknown or missing `type` and missing required fields
    /// all yield [`InboundMessage::Unrecognized`]. Never errors.
    pub fn decode(raw: &str) -> InboundMessage {
        match serde_json::from_str::<Record>(raw) {
            Ok(record) => record.into(),
            Err(e) => {
                tracing::debug!("Discarding unrecognized frame ({}): {:.80}", e, raw);
                InboundMessage::Unrecognized
            }
        }
    }

    /// Encode a command request to its wire literal.
    #[inline]
    pub fn encode_request(request: CommandRequest) -> &'static str {
        request.as_str()
    }

    /// Encode a record to its JSON wire form.
    ///
    /// Used by data sources that synthesize frames (the simulator) so their
    /// output goes through the same decode path as the live service.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors as [`GazeError::Json`](crate::GazeError::Json).
    pub fn encode_record(record: &Record) -> Result<String> {
        Ok(serde_json::to_string(record)?)
    }
}
