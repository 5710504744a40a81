//! Response decoding and presence validation.
//!
//! Raw XML is turned into a `serde_json::Value` with the usual
//! XML-to-mapping conventions:
//!
//! - an element becomes an object keyed by its (prefixed) name
//! - attributes, namespace declarations included, become `@name` keys
//! - an element holding only text becomes a string
//! - an empty element becomes `null`
//! - repeated sibling elements become an array
//! - text next to attributes or children is stored under `#text`
//!
//! Each device family names one presence path. An absent or empty value at
//! that path is how "interface not found" is told apart from "found".

use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::NetconfError;
use crate::family::DeviceFamily;

/// Result of checking a family's presence path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// A decoded response. Lives for one operation only.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolResponse {
    pub raw: String,
    pub data: Value,
}

impl ProtocolResponse {
    /// Decodes `raw`; does not validate.
    pub fn decode(raw: String) -> Result<Self, NetconfError> {
        let data = decode(&raw)?;
        Ok(Self { raw, data })
    }

    pub fn presence(&self, family: DeviceFamily) -> Presence {
        presence(&self.data, family)
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, NetconfError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value()?.into_owned();
            fields.insert(key, Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

fn attach(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

/// Decodes an XML document into a mapping.
pub fn decode(raw: &str) -> Result<Value, NetconfError> {
    let mut reader = Reader::from_str(raw);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.fields, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    NetconfError::Protocol("unbalanced closing tag in response".to_string())
                })?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.fields, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(NetconfError::Protocol(
            "truncated response: unclosed elements".to_string(),
        ));
    }
    if root.is_empty() {
        return Err(NetconfError::Protocol("empty response document".to_string()));
    }
    Ok(Value::Object(root))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

fn lookup_present(value: &Value, path: &[&str]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return !is_empty(value);
    };
    match value {
        Value::Object(fields) => fields
            .get(*head)
            .map(|child| lookup_present(child, rest))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| lookup_present(item, path)),
        _ => false,
    }
}

/// Checks the family's presence path without failing.
pub fn presence(mapping: &Value, family: DeviceFamily) -> Presence {
    if lookup_present(mapping, family.presence_path()) {
        Presence::Present
    } else {
        Presence::Absent
    }
}

/// Fails with [`NetconfError::InvalidData`] when the presence path is absent
/// or empty.
pub fn validate(mapping: &Value, family: DeviceFamily) -> Result<(), NetconfError> {
    match presence(mapping, family) {
        Presence::Present => Ok(()),
        Presence::Absent => {
            trace!("{family} response without presence key: {mapping}");
            Err(NetconfError::InvalidData(format!(
                "{family} response has no {}",
                family.presence_path().join(".")
            )))
        }
    }
}

/// Decodes `raw` and validates it for `family`.
pub fn decode_and_validate(
    raw: String,
    family: DeviceFamily,
) -> Result<ProtocolResponse, NetconfError> {
    let response = ProtocolResponse::decode(raw)?;
    validate(&response.data, family)?;
    Ok(response)
}
