//! XML parsing into [`XmlDocument`]
//!
//! Comments, processing instructions and doctypes are dropped. Text is kept
//! verbatim, except whitespace-only runs that sit between elements, which are
//! indentation. An element holding nothing but whitespace keeps it. Entities
//! are unescaped.

use super::document::{NodeId, XmlDocument};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::Path;

impl XmlDocument {
    /// Read and parse an XML file from disk.
    ///
    /// # Errors
    /// Returns an error naming the file if it cannot be read or parsed.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<XmlDocument> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        XmlDocument::parse(&content).map_err(|e| Error::XmlParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse XML from a string.
    ///
    /// # Errors
    /// Returns an error if the XML is malformed.
    pub fn parse(content: &str) -> Result<XmlDocument> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = Reader::from_str(content);
        reader.trim_text(false);

        let mut doc = XmlDocument::new();
        let mut stack: Vec<NodeId> = vec![doc.document_node()];
        let mut lines = LineCounter::new(content);
        // Whitespace seen since the last tag, kept only if the element closes empty
        let mut pending_ws: Option<String> = None;

        loop {
            let event = reader.read_event()?;
            let line = lines.line_at(reader.buffer_position());
            if !matches!(event, Event::Text(_) | Event::End(_)) {
                pending_ws = None;
            }
            match event {
                Event::Start(e) => {
                    let node = start_element(&mut doc, &e, line)?;
                    attach(&mut doc, &stack, node);
                    stack.push(node);
                }
                Event::Empty(e) => {
                    let node = start_element(&mut doc, &e, line)?;
                    attach(&mut doc, &stack, node);
                }
                Event::End(_) => {
                    if let (Some(text), Some(&open)) = (pending_ws.take(), stack.last()) {
                        if stack.len() > 1 && doc.children(open).is_empty() {
                            let node = doc.create_text(&text);
                            attach(&mut doc, &stack, node);
                        }
                    }
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    if stack.len() > 1 && !text.is_empty() {
                        if text.trim().is_empty() {
                            pending_ws.get_or_insert_with(String::new).push_str(&text);
                        } else {
                            pending_ws = None;
                            let node = doc.create_text(&text);
                            attach(&mut doc, &stack, node);
                        }
                    }
                }
                Event::CData(e) => {
                    if stack.len() > 1 {
                        let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        let node = doc.create_text(&text);
                        attach(&mut doc, &stack, node);
                    }
                }
                Event::Eof => break,
                // Comments, declarations, PIs and doctypes carry no library data
                _ => {}
            }
        }

        if doc.root().is_none() {
            return Err(Error::EmptyDocument);
        }
        Ok(doc)
    }
}

fn start_element(doc: &mut XmlDocument, e: &BytesStart<'_>, line: u32) -> Result<NodeId> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = IndexMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(doc.create_element_at(&name, attributes, line))
}

fn attach(doc: &mut XmlDocument, stack: &[NodeId], node: NodeId) {
    if let Some(&parent) = stack.last() {
        doc.append_child(parent, node);
    }
}

/// Incremental byte-offset to line-number conversion.
struct LineCounter<'a> {
    content: &'a [u8],
    offset: usize,
    line: u32,
}

impl<'a> LineCounter<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content: content.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, position: usize) -> u32 {
        let position = position.min(self.content.len());
        if position > self.offset {
            let newlines = self.content[self.offset..position]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.line += newlines as u32;
            self.offset = position;
        }
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_are_stripped() {
        let doc = XmlDocument::parse("<a><!-- note --><b/><!-- other --></a>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn test_entities_and_text() {
        let doc = XmlDocument::parse(r#"<a v="x &amp; y"><b>1 &lt; 2</b></a>"#).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.attribute(root, "v"), Some("x & y"));
        let b = doc.first_child_element(root, "b").unwrap();
        assert_eq!(doc.text(b).as_deref(), Some("1 < 2"));
    }

    #[test]
    fn test_mixed_content_round_trips() {
        let doc = XmlDocument::parse(
            "<t>\n  <l id='1'>Hull </l>\n  <m>a <b>bold</b> word</m>\n  <s> </s>\n  <e>\n  </e>\n</t>",
        )
        .unwrap();
        let root = doc.root().unwrap();
        let l = doc.first_child_element(root, "l").unwrap();
        assert_eq!(doc.text(l).as_deref(), Some("Hull "));
        let m = doc.first_child_element(root, "m").unwrap();
        assert_eq!(doc.string_value(m), "a bold word");
        let s = doc.first_child_element(root, "s").unwrap();
        assert_eq!(doc.text(s).as_deref(), Some(" "));
        // Indentation between elements is not kept
        assert_eq!(doc.children(root).len(), 4);

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<l id="1">Hull </l>"#), "{xml}");
        assert!(xml.contains("<m>a <b>bold</b> word</m>"), "{xml}");
        assert!(xml.contains("<s> </s>"), "{xml}");
        let reparsed = XmlDocument::parse(&xml).unwrap();
        assert_eq!(reparsed.to_xml_string().unwrap(), xml);
    }

    #[test]
    fn test_source_lines() {
        let doc = XmlDocument::parse("<a>\n  <b/>\n  <c/>\n</a>").unwrap();
        let root = doc.root().unwrap();
        let c = doc.first_child_element(root, "c").unwrap();
        assert_eq!(doc.line(root), 1);
        assert_eq!(doc.line(c), 3);
    }

    #[test]
    fn test_malformed_is_an_error() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(matches!(XmlDocument::parse("   "), Err(Error::EmptyDocument)));
    }
}
