//! XML serialization
//!
//! Output is pretty-printed with two-space indentation and an UTF-8
//! declaration. Elements holding text stay on one line.

use super::document::{NodeId, XmlDocument};
use crate::error::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use std::path::Path;

impl XmlDocument {
    /// Serialize the document to a string.
    ///
    /// # Errors
    /// Returns an error if XML serialization fails.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut output = Vec::new();
        let mut writer = Writer::new_with_indent(&mut output, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        for &child in self.children(self.document_node()) {
            write_node(&mut writer, self, child)?;
        }

        let mut xml = String::from_utf8(output)?;
        xml.push('\n');
        Ok(xml)
    }

    /// Write the document to disk, replacing the destination atomically.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let xml = self.to_xml_string()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(xml.as_bytes())?;
        tmp.persist(path)?;
        Ok(())
    }

    /// Serialize a single subtree (no declaration), used for diagnostics.
    ///
    /// # Errors
    /// Returns an error if XML serialization fails.
    pub fn subtree_to_string(&self, node: NodeId) -> Result<String> {
        let mut output = Vec::new();
        let mut writer = Writer::new(&mut output);
        write_node(&mut writer, self, node)?;
        Ok(String::from_utf8(output)?)
    }
}

fn write_node<W: std::io::Write>(
    writer: &mut Writer<W>,
    doc: &XmlDocument,
    node: NodeId,
) -> Result<()> {
    if let Some(text) = doc.text_content(node) {
        writer.write_event(Event::Text(BytesText::new(text)))?;
        return Ok(());
    }
    let Some(element) = doc.element(node) else {
        return Ok(());
    };

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children = doc.children(node);
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for &child in children {
        write_node(writer, doc, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
