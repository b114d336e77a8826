//! XML library documents
//!
//! An arena-backed DOM read and written with `quick-xml`, and a selector
//! engine covering the XPath subset used by library merges and patch files.

mod document;
mod reader;
mod selector;
mod writer;

pub use document::{Element, NodeId, XmlDocument};
pub use selector::Selector;
