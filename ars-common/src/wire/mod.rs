//! Wire codecs for process events
//!
//! - `xes`: single-event XES XML, the broker format for clean and reconciled events
//! - `json`: flat JSON event objects and the `{"events": ...}` envelopes used by
//!   the upstream bridge and for escalated batches

pub mod json;
pub mod xes;

use crate::model::{Event, TIME_PREFIX};
use crate::{Error, Result};

/// Typed field an attribute maps to on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Date,
    String,
}

impl FieldType {
    /// Timestamp-named keys become dates, everything else strings
    pub fn for_key(key: &str) -> Self {
        if key.starts_with(TIME_PREFIX) {
            FieldType::Date
        } else {
            FieldType::String
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            FieldType::Date => "date",
            FieldType::String => "string",
        }
    }
}

/// Decode one event of unknown encoding (XES element or JSON object)
pub fn decode_event(payload: &str) -> Result<Event> {
    let trimmed = payload.trim_start();
    if trimmed.starts_with('<') {
        xes::decode_event(trimmed)
    } else if trimmed.starts_with('{') {
        json::decode_event(trimmed)
    } else {
        Err(Error::MalformedEvent(
            "payload is neither an XES element nor a JSON object".to_string(),
        ))
    }
}
