use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Reader};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str;

use crate::xml::{Error, Result};

/// Byte range of an element (start tag through end tag) within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies completely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Locate elements by local name, optionally restricted to a namespace URI
/// and to a nesting depth (the document element has depth 1).
///
/// Spans are returned in document order.
pub fn find_elements(
    xml: &str,
    local_name: &str,
    namespace: Option<&str>,
    depth: Option<usize>,
) -> Result<Vec<Span>> {
    collect_spans(xml, |resolved, e, element_depth| {
        if depth.is_some_and(|d| d != element_depth) {
            return false;
        }
        if e.local_name().as_ref() != local_name.as_bytes() {
            return false;
        }
        match namespace {
            Some(uri) => matches!(resolved, ResolveResult::Bound(Namespace(ns)) if *ns == uri.as_bytes()),
            None => true,
        }
    })
}

/// Every element carrying an `Id`, `ID` or `id` attribute equal to `id`
pub fn find_elements_by_id(xml: &str, id: &str) -> Result<Vec<Span>> {
    collect_spans(xml, |_, e, _| {
        e.attributes().filter_map(|a| a.ok()).any(|attr| {
            matches!(attr.key.local_name().as_ref(), b"Id" | b"ID" | b"id")
                && attr.unescape_value().ok().as_deref() == Some(id)
        })
    })
}

/// Span of the document element
pub fn document_element(xml: &str) -> Result<Span> {
    collect_spans(xml, |_, _, depth| depth == 1)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Xml("Document has no element".into()))
}

fn collect_spans<F>(xml: &str, mut predicate: F) -> Result<Vec<Span>>
where
    F: FnMut(&ResolveResult<'_>, &BytesStart<'_>, usize) -> bool,
{
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    // (start offset, depth) of matched elements that are still open
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut spans = Vec::new();

    loop {
        let offset = reader.buffer_position() as usize;
        let (matched, event) = {
            let (resolved, event) = reader.read_resolved_event()?;
            let matched = match &event {
                Event::Start(e) | Event::Empty(e) => predicate(&resolved, e, depth + 1),
                _ => false,
            };
            (matched, event)
        };

        match event {
            Event::Start(_) => {
                depth += 1;
                if matched {
                    open.push((offset, depth));
                }
            }
            Event::Empty(_) => {
                if matched {
                    spans.push(Span {
                        start: offset,
                        end: reader.buffer_position() as usize,
                    });
                }
            }
            Event::End(_) => {
                if open.last().is_some_and(|&(_, d)| d == depth) {
                    if let Some((start, _)) = open.pop() {
                        spans.push(Span {
                            start,
                            end: reader.buffer_position() as usize,
                        });
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    spans.sort_by_key(|span| span.start);
    Ok(spans)
}

/// Extract the element at `span` as a standalone fragment.
///
/// Namespace declarations inherited from ancestors are copied onto the
/// fragment's start tag so that it canonicalizes exactly as it would in place.
pub fn extract_in_context(xml: &str, span: Span) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut scopes: Vec<Vec<(String, String)>> = Vec::new();

    loop {
        let offset = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) if offset == span.start => {
                let after_tag = reader.buffer_position() as usize;
                let mut fragment = render_start_in_scope(&e, &scopes, false)?;
                fragment.push_str(&xml[after_tag..span.end]);
                return Ok(fragment);
            }
            Event::Empty(e) if offset == span.start => {
                return render_start_in_scope(&e, &scopes, true);
            }
            Event::Start(e) => scopes.push(namespace_declarations(&e)?),
            Event::End(_) => {
                scopes.pop();
            }
            Event::Eof => {
                return Err(Error::Xml(format!(
                    "No element starts at offset {}",
                    span.start
                )));
            }
            _ => {}
        }
    }
}

fn render_start_in_scope(
    e: &BytesStart<'_>,
    scopes: &[Vec<(String, String)>],
    empty: bool,
) -> Result<String> {
    let own: Vec<String> = namespace_declarations(e)?
        .into_iter()
        .map(|(key, _)| key)
        .collect();

    let mut in_scope = BTreeMap::new();
    for (key, value) in scopes.iter().flatten() {
        in_scope.insert(key.as_str(), value.as_str());
    }

    let mut start = e.to_owned();
    for (key, value) in in_scope {
        if !own.iter().any(|k| k == key) {
            start.push_attribute((key, value));
        }
    }

    let mut tag = String::from("<");
    tag.push_str(str::from_utf8(&start)?);
    tag.push_str(if empty { "/>" } else { ">" });
    Ok(tag)
}

fn namespace_declarations(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut declarations = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            declarations.push((key.to_string(), attr.unescape_value()?.into_owned()));
        }
    }
    Ok(declarations)
}

/// Remove the bytes covered by `span`
pub fn remove_span(xml: &str, span: Span) -> String {
    let mut out = String::with_capacity(xml.len() - span.len());
    out.push_str(&xml[..span.start]);
    out.push_str(&xml[span.end..]);
    out
}

/// Insert `fragment` as the last child of the document element
pub fn insert_before_root_end(xml: &str, fragment: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut depth = 0usize;
    loop {
        let offset = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let mut out = String::with_capacity(xml.len() + fragment.len());
                    out.push_str(&xml[..offset]);
                    out.push_str(fragment);
                    out.push_str(&xml[offset..]);
                    return Ok(out);
                }
            }
            Event::Eof => {
                return Err(Error::Xml(
                    "Document element has no end tag to insert before".into(),
                ));
            }
            _ => {}
        }
    }
}

/// Resolve a character or predefined entity reference to its text
pub(crate) fn resolve_reference(e: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = e.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = e.decode()?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| Error::Xml(format!("Unknown entity reference '&{name};'")))
}

/// Normalize line endings to LF as an XML parser would
pub(crate) fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}
