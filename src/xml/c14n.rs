use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, BTreeSet};
use std::str;

use crate::xml::utils::{normalize_line_endings, resolve_reference};
use crate::xml::{Error, Result};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

type NsMap = BTreeMap<String, String>;

/// Exclusive XML Canonicalization (without comments) with optional
/// inclusive namespace prefixes.
///
/// Content outside the document element and comments are dropped;
/// empty elements are expanded.
pub fn canonicalize(xml: impl AsRef<str>, inclusive_ns: Option<&[&str]>) -> Result<String> {
    let mut reader = Reader::from_str(xml.as_ref());
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut c14n = Canonicalizer::new(inclusive_ns.unwrap_or_default());

    loop {
        match reader.read_event()? {
            Event::Start(e) => c14n.start(&e)?,
            Event::End(e) => {
                let name = str::from_utf8(e.name().into_inner())?;
                c14n.end(name);
            }
            Event::Text(e) => {
                let text = e.decode()?;
                c14n.text(&normalize_line_endings(&text));
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                let text = str::from_utf8(&raw)?;
                c14n.text(&normalize_line_endings(text));
            }
            Event::GeneralRef(e) => {
                let resolved = resolve_reference(&e)?;
                c14n.text(&resolved);
            }
            Event::PI(e) => {
                let target = str::from_utf8(e.target())?;
                let data = str::from_utf8(e.content())?.trim_start();
                c14n.processing_instruction(target, data);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if c14n.depth != 0 {
        return Err(Error::Xml("Unbalanced element nesting".into()));
    }
    Ok(c14n.output)
}

struct Canonicalizer<'a> {
    output: String,
    depth: usize,
    inclusive: &'a [&'a str],
    /// In-scope namespace declarations per open element
    declared: Vec<NsMap>,
    /// Namespace declarations already rendered by output ancestors
    rendered: Vec<NsMap>,
}

impl<'a> Canonicalizer<'a> {
    fn new(inclusive: &'a [&'a str]) -> Self {
        Self {
            output: String::new(),
            depth: 0,
            inclusive,
            declared: vec![NsMap::new()],
            rendered: vec![NsMap::new()],
        }
    }

    fn start(&mut self, e: &BytesStart) -> Result<()> {
        let mut declared = self.declared.last().cloned().unwrap_or_default();
        let mut rendered = self.rendered.last().cloned().unwrap_or_default();

        let mut attrs = Vec::new();
        for attr in e.attributes().with_checks(false) {
            let attr = attr?;
            let key = str::from_utf8(attr.key.as_ref())?;
            let value = attribute_value(&attr)?;
            if key == "xmlns" {
                declared.insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declared.insert(prefix.to_string(), value);
            } else {
                attrs.push((key.to_string(), value));
            }
        }

        let name = str::from_utf8(e.name().into_inner())?;

        // Prefixes visibly utilized by the element name and its attributes
        let mut utilized = BTreeSet::new();
        utilized.insert(prefix_of(name).unwrap_or_default().to_string());
        for (key, _) in &attrs {
            if let Some(prefix) = prefix_of(key).filter(|p| *p != "xml") {
                utilized.insert(prefix.to_string());
            }
        }
        for prefix in self.inclusive {
            let prefix = if *prefix == "#default" { "" } else { prefix };
            if declared.contains_key(prefix) {
                utilized.insert(prefix.to_string());
            }
        }

        let mut render_ns = Vec::new();
        for prefix in &utilized {
            let current = declared.get(prefix).map(String::as_str).unwrap_or_default();
            let previous = rendered.get(prefix).map(String::as_str).unwrap_or_default();
            if current != previous {
                // an empty default namespace is only rendered to undo an ancestor's
                render_ns.push((prefix.clone(), current.to_string()));
            }
        }

        let mut attr_info = Vec::with_capacity(attrs.len());
        for (key, value) in attrs {
            let (ns_uri, local) = match key.split_once(':') {
                Some(("xml", local)) => (XML_NAMESPACE.to_string(), local.to_string()),
                Some((prefix, local)) => (
                    declared.get(prefix).cloned().unwrap_or_default(),
                    local.to_string(),
                ),
                None => (String::new(), key.clone()),
            };
            attr_info.push((ns_uri, local, key, value));
        }
        attr_info.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        self.output.push('<');
        self.output.push_str(name);
        for (prefix, uri) in &render_ns {
            if prefix.is_empty() {
                self.output.push_str(" xmlns=\"");
            } else {
                self.output.push_str(" xmlns:");
                self.output.push_str(prefix);
                self.output.push_str("=\"");
            }
            escape_attr_value(uri, &mut self.output);
            self.output.push('"');
        }
        for (_, _, key, value) in &attr_info {
            self.output.push(' ');
            self.output.push_str(key);
            self.output.push_str("=\"");
            escape_attr_value(value, &mut self.output);
            self.output.push('"');
        }
        self.output.push('>');

        for (prefix, uri) in render_ns {
            rendered.insert(prefix, uri);
        }
        self.declared.push(declared);
        self.rendered.push(rendered);
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self, name: &str) {
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
        self.declared.pop();
        self.rendered.pop();
        self.depth = self.depth.saturating_sub(1);
    }

    fn processing_instruction(&mut self, target: &str, data: &str) {
        if self.depth == 0 {
            return;
        }
        self.output.push_str("<?");
        self.output.push_str(target);
        if !data.is_empty() {
            self.output.push(' ');
            self.output.push_str(data);
        }
        self.output.push_str("?>");
    }

    fn text(&mut self, text: &str) {
        if self.depth == 0 {
            return;
        }
        escape_text_value(text, &mut self.output);
    }
}

/// Attribute value as a parser reports it: literal tab, CR and LF become
/// spaces, while character references to them are kept
fn attribute_value(attr: &Attribute<'_>) -> Result<String> {
    let raw = str::from_utf8(&attr.value)?.replace("\r\n", " ");
    let normalized = raw.replace(['\t', '\n', '\r'], " ");
    let value = unescape(&normalized).map_err(|e| Error::Xml(e.to_string()))?;
    Ok(value.into_owned())
}

fn prefix_of(qname: &str) -> Option<&str> {
    qname.split_once(':').map(|(prefix, _)| prefix)
}

/// Escape attribute value per C14N rules.
fn escape_attr_value(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Escape text node value per C14N rules.
fn escape_text_value(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}
