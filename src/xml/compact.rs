//! Compact XML → JSON tree conversion.
//!
//! Elements become objects keyed by their qualified child names, attributes
//! are collected under `_attributes` and character data under `_text`.
//! A child name that occurs once maps to an object; repeated names map to
//! an array. Callers must therefore treat any "one or more" position with
//! [`one_or_many`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use std::str;

use crate::xml::utils::{normalize_line_endings, resolve_reference};
use crate::xml::{Error, Result};

pub const TEXT: &str = "_text";
pub const ATTRIBUTES: &str = "_attributes";

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> Result<Self> {
        let name = str::from_utf8(e.name().into_inner())?.to_string();

        let mut attributes = Map::new();
        for attr in e.attributes().with_checks(false) {
            let attr = attr?;
            let key = str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, Value::String(value));
        }

        let mut fields = Map::new();
        if !attributes.is_empty() {
            fields.insert(ATTRIBUTES.to_string(), Value::Object(attributes));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn into_value(mut self) -> (String, Value) {
        // whitespace between child elements is not content
        if !self.text.trim().is_empty() {
            self.fields.insert(TEXT.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(self.fields))
    }
}

/// Convert an XML document (or fragment with a single root) to a compact tree
pub fn to_compact(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut document = Map::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Frame::open(&e)?),
            Event::Empty(e) => {
                let (name, value) = Frame::open(&e)?.into_value();
                attach(&mut stack, &mut document, name, value);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("Unexpected end tag".into()))?;
                let (name, value) = frame.into_value();
                attach(&mut stack, &mut document, name, value);
            }
            Event::Text(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&normalize_line_endings(&e.decode()?));
                }
            }
            Event::CData(e) => {
                if let Some(frame) = stack.last_mut() {
                    let raw = e.into_inner();
                    frame.text.push_str(str::from_utf8(&raw)?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&resolve_reference(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Xml("Unclosed element at end of document".into()));
    }
    Ok(Value::Object(document))
}

fn attach(stack: &mut [Frame], document: &mut Map<String, Value>, name: String, value: Value) {
    let fields = match stack.last_mut() {
        Some(parent) => &mut parent.fields,
        None => document,
    };
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

/// Local part of a qualified name
pub fn local_name(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

/// First child whose local name matches, whatever its namespace prefix
pub fn child<'a>(node: &'a Value, local: &str) -> Option<&'a Value> {
    node.as_object()?
        .iter()
        .find(|(key, _)| !key.starts_with('_') && local_name(key) == local)
        .map(|(_, value)| value)
}

/// Character data of an element
pub fn text(node: &Value) -> Option<&str> {
    node.get(TEXT)?.as_str()
}

/// Attribute value of an element
pub fn attribute<'a>(node: &'a Value, name: &str) -> Option<&'a str> {
    node.get(ATTRIBUTES)?.get(name)?.as_str()
}

/// Coerce a "one or more" position to a list.
///
/// The compact form collapses a single child to a bare object; an absent
/// child yields an empty list.
pub fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
