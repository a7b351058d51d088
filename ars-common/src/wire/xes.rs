//! XES single-event XML codec
//!
//! ```xml
//! <event>
//!   <string key="concept:name" value="Donor check-in"/>
//!   <date key="time:timestamp" value="2024-09-11T15:56:16.000+00:00"/>
//! </event>
//! ```

use super::FieldType;
use crate::model::Event;
use crate::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event as XmlEvent};
use quick_xml::{Reader, Writer};
use tracing::warn;

const EVENT_TAG: &[u8] = b"event";

/// XES attribute element names carrying a key/value pair
const ATTRIBUTE_TAGS: [&[u8]; 6] = [b"string", b"date", b"int", b"float", b"boolean", b"id"];

/// Encode one event as an XES `<event>` element
pub fn encode_event(event: &Event) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(XmlEvent::Start(BytesStart::new("event")))
        .map_err(encoding_error)?;
    for attr in event.attributes() {
        let mut element = BytesStart::new(FieldType::for_key(&attr.key).tag());
        element.push_attribute(("key", attr.key.as_str()));
        element.push_attribute(("value", attr.value.as_str()));
        writer
            .write_event(XmlEvent::Empty(element))
            .map_err(encoding_error)?;
    }
    writer
        .write_event(XmlEvent::End(BytesEnd::new("event")))
        .map_err(encoding_error)?;

    String::from_utf8(writer.into_inner()).map_err(encoding_error)
}

fn encoding_error(err: impl std::fmt::Display) -> Error {
    Error::Encoding(err.to_string())
}

/// Decode one XES `<event>` element
///
/// `<log>`/`<trace>` wrappers are tolerated. Attribute elements missing a key or
/// value are skipped with a warning; the resulting event must still carry every
/// required attribute.
pub fn decode_event(xml: &str) -> Result<Event> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut saw_event = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(element)) | Ok(XmlEvent::Empty(element)) => {
                let name = element.name();
                if name.as_ref() == EVENT_TAG {
                    if saw_event {
                        return Err(Error::MalformedEvent(
                            "payload holds more than one <event>".to_string(),
                        ));
                    }
                    saw_event = true;
                } else if ATTRIBUTE_TAGS.contains(&name.as_ref()) {
                    if !saw_event {
                        return Err(Error::MalformedEvent(
                            "attribute outside of <event>".to_string(),
                        ));
                    }
                    match read_key_value(&element)? {
                        (Some(key), Some(value)) => pairs.push((key, value)),
                        (key, _) => warn!(?key, "Skipping XES attribute without key or value"),
                    }
                }
            }
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::MalformedEvent(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !saw_event {
        return Err(Error::MalformedEvent("no <event> element".to_string()));
    }
    Event::from_attributes(pairs)
}

fn read_key_value(element: &BytesStart<'_>) -> Result<(Option<String>, Option<String>)> {
    let mut key = None;
    let mut value = None;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::MalformedEvent(e.to_string()))?;
        let text = attr
            .unescape_value()
            .map_err(|e| Error::MalformedEvent(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"key" => key = Some(text),
            b"value" => value = Some(text),
            _ => {}
        }
    }
    Ok((key, value))
}
