//! JSON event objects and `{"events": ...}` envelopes

use crate::model::Event;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{"events": ...}` wrapper used by the upstream bridge and the escalation topic
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub events: T,
}

/// Build an event from a flat JSON object
///
/// Numbers and booleans are stringified; nested values are rejected.
pub fn event_from_object(object: &Map<String, Value>) -> Result<Event> {
    let pairs = object
        .iter()
        .map(|(key, value)| scalar_to_string(key, value).map(|v| (key.clone(), v)))
        .collect::<Result<Vec<_>>>()?;
    Event::from_attributes(pairs)
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::MalformedEvent(format!(
            "attribute '{}' is not a scalar value",
            key
        ))),
    }
}

fn malformed(err: serde_json::Error) -> Error {
    Error::MalformedEvent(err.to_string())
}

/// Decode one flat JSON event object
pub fn decode_event(payload: &str) -> Result<Event> {
    let object: Map<String, Value> = serde_json::from_str(payload).map_err(malformed)?;
    event_from_object(&object)
}

/// Decode `{"events": {..}}` (one clean event from the upstream detector)
pub fn decode_single_envelope(payload: &str) -> Result<Event> {
    let envelope: Envelope<Event> = serde_json::from_str(payload).map_err(malformed)?;
    Ok(envelope.events)
}

/// Decode `{"events": [..]}` (an ambiguous batch from the upstream detector)
pub fn decode_batch_envelope(payload: &str) -> Result<Vec<Event>> {
    let envelope: Envelope<Vec<Event>> = serde_json::from_str(payload).map_err(malformed)?;
    Ok(envelope.events)
}

/// Encode a batch as `{"events": [..]}`, batch order and attribute order preserved
pub fn encode_batch(events: &[Event]) -> Result<String> {
    serde_json::to_string(&Envelope { events }).map_err(|e| Error::Encoding(e.to_string()))
}
