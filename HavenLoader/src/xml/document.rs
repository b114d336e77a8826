//! Arena-backed XML document
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Every
//! node keeps a parent link, so structural edits (insert after, replace,
//! detach) never need to search the tree for a parent. Detached nodes stay in
//! the arena until [`XmlDocument::compact`] rebuilds it.

use indexmap::IndexMap;

use super::selector::Selector;
use crate::error::{Error, Result};

/// Index of a node inside an [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An element: name, ordered attributes and the line it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: IndexMap<String, String>,
    /// 1-based source line of the start tag (0 for generated nodes).
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable XML tree.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<NodeData>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Creates an empty document (no root element yet).
    #[must_use]
    pub fn new() -> Self {
        XmlDocument {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Creates a document whose root element is `name`.
    #[must_use]
    pub fn with_root(name: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.create_element(name);
        doc.push_child(doc.document_node(), root);
        doc
    }

    /// Creates a standalone document holding a deep copy of `node` from `source`.
    #[must_use]
    pub fn from_subtree(source: &XmlDocument, node: NodeId) -> Self {
        let mut doc = Self::new();
        let copy = doc.import_subtree(source, node);
        doc.push_child(doc.document_node(), copy);
        doc
    }

    /// The invisible node above the root element.
    #[must_use]
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The root element, if any.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.element_children(self.document_node()).next()
    }

    /// The root element, or [`Error::EmptyDocument`].
    pub fn require_root(&self) -> Result<NodeId> {
        self.root().ok_or(Error::EmptyDocument)
    }

    // ==================== Node inspection ====================

    /// Returns true if `id` is an element node.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Element data for `id`, if it is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Tag name of an element node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Source line of an element node (0 if unknown).
    #[must_use]
    pub fn line(&self, id: NodeId) -> u32 {
        self.element(id).map_or(0, |e| e.line)
    }

    /// Text content of a text node.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of the node's direct text children, if it has any.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<String> {
        let mut out: Option<String> = None;
        for &child in &self.nodes[id.0].children {
            if let NodeKind::Text(t) = &self.nodes[child.0].kind {
                out.get_or_insert_with(String::new).push_str(t);
            }
        }
        out
    }

    /// XPath string-value: all descendant text concatenated.
    #[must_use]
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(t) = &self.nodes[node.0].kind {
                out.push_str(t);
            }
        }
        out
    }

    /// Value of attribute `name` on an element node.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    /// Returns true if the element carries attribute `name`.
    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Sets (or overwrites) an attribute. No-op on non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)
            .and_then(|e| e.attributes.shift_remove(name))
    }

    // ==================== Navigation ====================

    /// Parent node (may be the document node).
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parent node, only if it is an element.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// All children, text included.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// First element child named `name`.
    #[must_use]
    pub fn first_child_element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(id)
            .find(|&c| self.name(c) == Some(name))
    }

    /// `id` and everything below it, in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    /// Preorder rank of every node reachable from the document node.
    /// Detached nodes get `usize::MAX`.
    #[must_use]
    pub fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        for (rank, node) in self.descendants(self.document_node()).into_iter().enumerate() {
            order[node.0] = rank;
        }
        order
    }

    // ==================== Mutation ====================

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_at(name, IndexMap::new(), 0)
    }

    pub(crate) fn create_element_at(
        &mut self,
        name: &str,
        attributes: IndexMap<String, String>,
        line: u32,
    ) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            name: name.to_string(),
            attributes,
            line,
        }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Creates an element and appends it under `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        let child = self.create_element(name);
        self.push_child(parent, child);
        child
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.push_child(parent, child);
    }

    /// Inserts `node` as the next sibling of `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<()> {
        let parent = self.require_parent_element(sibling)?;
        self.detach(node);
        let index = self.child_index(parent, sibling);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index + 1, node);
        Ok(())
    }

    /// Puts `new` where `old` was and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self.require_parent_element(old)?;
        self.detach(new);
        let index = self.child_index(parent, old);
        self.nodes[parent.0].children[index] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    /// Removes an element from its parent element.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.require_parent_element(id)?;
        self.detach(id);
        Ok(())
    }

    /// Unlinks `id` from its parent (no-op if already detached).
    ///
    /// The node keeps its arena slot; see [`XmlDocument::compact`].
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    fn require_parent_element(&self, id: NodeId) -> Result<NodeId> {
        self.parent_element(id).ok_or_else(|| Error::OrphanedNode {
            name: self.name(id).unwrap_or("#text").to_string(),
        })
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or(0)
    }

    /// Number of arena slots, detached nodes included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Rebuilds the arena from the nodes reachable from the document node.
    ///
    /// Every [`NodeId`] handed out before the call is invalidated.
    pub fn compact(&mut self) {
        let mut compacted = Self::new();
        let document = compacted.document_node();
        for &child in &self.nodes[document.0].children {
            let copy = compacted.import_subtree(self, child);
            compacted.push_child(document, copy);
        }
        tracing::debug!(
            "Compacted XML arena from {} to {} nodes",
            self.nodes.len(),
            compacted.nodes.len()
        );
        *self = compacted;
    }

    /// Deep-copies `node` (and its subtree) from `source` into this document.
    ///
    /// The copy is detached and shares nothing with the original.
    pub fn import_subtree(&mut self, source: &XmlDocument, node: NodeId) -> NodeId {
        let kind = match &source.nodes[node.0].kind {
            // A document node is copied as its root element.
            NodeKind::Document => {
                return match source.root() {
                    Some(root) => self.import_subtree(source, root),
                    None => self.create_text(""),
                };
            }
            other => other.clone(),
        };
        let copy = self.alloc(kind);
        for &child in &source.nodes[node.0].children {
            let child_copy = self.import_subtree(source, child);
            self.push_child(copy, child_copy);
        }
        copy
    }

    // ==================== Queries ====================

    /// Evaluates `expr` from the document node.
    pub fn select(&self, expr: &str) -> Result<Vec<NodeId>> {
        Selector::parse(expr)?.select(self, self.document_node())
    }

    /// First match of `expr`, if any.
    pub fn select_first(&self, expr: &str) -> Result<Option<NodeId>> {
        Ok(self.select(expr)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XmlDocument {
        XmlDocument::parse("<data><Item mid='1'><a/></Item><Item mid='2'/></data>").unwrap()
    }

    #[test]
    fn test_structure_and_parents() {
        let doc = sample();
        let root = doc.root().unwrap();
        assert_eq!(doc.name(root), Some("data"));
        assert_eq!(doc.parent_element(root), None);
        let items: Vec<_> = doc.element_children(root).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(doc.parent_element(items[0]), Some(root));
        assert_eq!(doc.attribute(items[1], "mid"), Some("2"));
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut doc = sample();
        let root = doc.root().unwrap();
        let items: Vec<_> = doc.element_children(root).collect();

        let extra = doc.create_element("Extra");
        doc.insert_after(items[0], extra).unwrap();
        let names: Vec<_> = doc.element_children(root).map(|c| doc.name(c).unwrap().to_string()).collect();
        assert_eq!(names, ["Item", "Extra", "Item"]);

        let swap = doc.create_element("Swap");
        doc.replace(extra, swap).unwrap();
        assert_eq!(doc.parent(extra), None);

        doc.remove(items[1]).unwrap();
        let names: Vec<_> = doc.element_children(root).map(|c| doc.name(c).unwrap().to_string()).collect();
        assert_eq!(names, ["Item", "Swap"]);
    }

    #[test]
    fn test_root_has_no_parent_element() {
        let mut doc = sample();
        let root = doc.root().unwrap();
        assert!(matches!(doc.remove(root), Err(Error::OrphanedNode { .. })));
        let node = doc.create_element("x");
        assert!(matches!(doc.insert_after(root, node), Err(Error::OrphanedNode { .. })));
    }

    #[test]
    fn test_compact_drops_detached_nodes() {
        let mut doc = sample();
        let root = doc.root().unwrap();
        let first = doc.element_children(root).next().unwrap();
        let replacement = doc.create_element("Item");
        doc.set_attribute(replacement, "mid", "9");
        doc.replace(first, replacement).unwrap();
        let before = doc.to_xml_string().unwrap();
        let slots = doc.node_count();

        doc.compact();

        assert_eq!(doc.node_count(), slots - 2);
        assert_eq!(doc.to_xml_string().unwrap(), before);
        let root = doc.root().unwrap();
        assert_eq!(doc.line(root), 1);
        let mids: Vec<_> = doc
            .element_children(root)
            .map(|c| doc.attribute(c, "mid").unwrap().to_string())
            .collect();
        assert_eq!(mids, ["9", "2"]);
    }

    #[test]
    fn test_import_is_a_deep_copy() {
        let source = sample();
        let item = source.select_first("/data/Item").unwrap().unwrap();

        let mut target = XmlDocument::with_root("root");
        let root = target.root().unwrap();
        let first = target.import_subtree(&source, item);
        let second = target.import_subtree(&source, item);
        target.append_child(root, first);
        target.append_child(root, second);

        target.set_attribute(first, "mid", "99");
        let inner = target.element_children(first).next().unwrap();
        target.set_attribute(inner, "changed", "yes");

        assert_eq!(target.attribute(second, "mid"), Some("1"));
        let other_inner = target.element_children(second).next().unwrap();
        assert!(!target.has_attribute(other_inner, "changed"));
        assert_eq!(source.attribute(item, "mid"), Some("1"));
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let mut doc = XmlDocument::parse(r#"<t b="1" a="2" c="3"/>"#).unwrap();
        let root = doc.root().unwrap();
        doc.remove_attribute(root, "a");
        doc.set_attribute(root, "d", "4");
        let keys: Vec<_> = doc.element(root).unwrap().attributes.keys().cloned().collect();
        assert_eq!(keys, ["b", "c", "d"]);
    }
}
