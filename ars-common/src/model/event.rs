//! Process event record
//!
//! An event is an ordered list of named attributes as produced by the upstream
//! process-mining source (XES vocabulary: `concept:name`, `time:timestamp`, ...).

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Activity name attribute
pub const CONCEPT_NAME: &str = "concept:name";
/// Event timestamp attribute
pub const TIMESTAMP: &str = "time:timestamp";
/// Station / location attribute
pub const LOCATION_STATION: &str = "location:station";
/// Prefix of performing-actor attributes (`perform:hcw`, `perform:donor`)
pub const PERFORMER_PREFIX: &str = "perform:";
/// Prefix of target-actor attributes (`target:donor`)
pub const TARGET_PREFIX: &str = "target:";
/// Keys under this prefix are date-typed on the wire
pub const TIME_PREFIX: &str = "time:";

/// One named attribute of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

/// Immutable process event
///
/// Attribute order is the order in which the attributes were received and is
/// preserved through every transformation and on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    attributes: Vec<Attribute>,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Build an event from ordered key/value pairs
    ///
    /// # Errors
    /// `Error::MalformedEvent` when a required attribute is missing, a key is
    /// duplicated, or `time:timestamp` cannot be parsed.
    pub fn from_attributes<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut attributes: Vec<Attribute> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            if attributes.iter().any(|a| a.key == key) {
                return Err(Error::MalformedEvent(format!("duplicate attribute '{}'", key)));
            }
            attributes.push(Attribute {
                key,
                value: value.into(),
            });
        }

        let lookup = |key: &str| attributes.iter().find(|a| a.key == key).map(|a| a.value.as_str());

        if lookup(CONCEPT_NAME).is_none() {
            return Err(Error::MalformedEvent(format!("missing '{}'", CONCEPT_NAME)));
        }
        if lookup(LOCATION_STATION).is_none() {
            return Err(Error::MalformedEvent(format!("missing '{}'", LOCATION_STATION)));
        }
        if !attributes.iter().any(|a| a.key.starts_with(PERFORMER_PREFIX)) {
            return Err(Error::MalformedEvent(format!(
                "missing performer attribute ('{}*')",
                PERFORMER_PREFIX
            )));
        }
        let raw_timestamp = lookup(TIMESTAMP)
            .ok_or_else(|| Error::MalformedEvent(format!("missing '{}'", TIMESTAMP)))?;
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| {
            Error::MalformedEvent(format!("unparsable timestamp '{}'", raw_timestamp))
        })?;

        Ok(Self {
            attributes,
            timestamp,
        })
    }

    /// Attributes in received order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of one attribute
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Activity name (`concept:name`)
    pub fn concept_name(&self) -> &str {
        self.get(CONCEPT_NAME).unwrap_or_default()
    }

    /// Parsed `time:timestamp`
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Station the event was recorded at
    pub fn station(&self) -> &str {
        self.get(LOCATION_STATION).unwrap_or_default()
    }

    /// First performing-actor attribute as `(key, value)`
    pub fn performer(&self) -> Option<(&str, &str)> {
        self.attributes
            .iter()
            .find(|a| a.key.starts_with(PERFORMER_PREFIX))
            .map(|a| (a.key.as_str(), a.value.as_str()))
    }

    /// First target-actor attribute as `(key, value)`, if any
    pub fn target(&self) -> Option<(&str, &str)> {
        self.attributes
            .iter()
            .find(|a| a.key.starts_with(TARGET_PREFIX))
            .map(|a| (a.key.as_str(), a.value.as_str()))
    }

    /// New event carrying `concept_name` and every other attribute of `self`
    ///
    /// The activity name comes first, the remaining attributes follow in their
    /// original order. `self` is left untouched.
    pub fn relabeled(&self, concept_name: &str) -> Self {
        let mut attributes = Vec::with_capacity(self.attributes.len());
        attributes.push(Attribute {
            key: CONCEPT_NAME.to_string(),
            value: concept_name.to_string(),
        });
        attributes.extend(
            self.attributes
                .iter()
                .filter(|a| a.key != CONCEPT_NAME)
                .cloned(),
        );
        Self {
            attributes,
            timestamp: self.timestamp,
        }
    }
}

/// Parse an event timestamp
///
/// Accepts RFC 3339 (`2024-09-11T15:56:16.000+00:00`) and the zone-less form
/// emitted by the XES→JSON bridge (`2024-09-11T16:00:52`), which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for attr in &self.attributes {
            map.serialize_entry(&attr.key, &attr.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let object = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        crate::wire::json::event_from_object(&object).map_err(serde::de::Error::custom)
    }
}
