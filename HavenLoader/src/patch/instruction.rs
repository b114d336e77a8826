//! Patch instruction parsing
//!
//! ```xml
//! <Patch Class="AttributeMath">
//!     <xpath>/data/Item/i[@mid='5']</xpath>
//!     <attribute>hp</attribute>
//!     <value opType="multiply">1.5</value>
//! </Patch>
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::xml::{NodeId, XmlDocument};

/// Arithmetic of `AttributeMath`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOperator {
    /// `opType="add"`
    Add,
    /// `opType="subtract"`
    Subtract,
    /// `opType="multiply"`
    Multiply,
    /// `opType="divide"`
    Divide,
}

impl FromStr for MathOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            other => Err(Error::UnknownMathOperator(other.to_string())),
        }
    }
}

impl MathOperator {
    /// Applies the operator; `attribute` names the target in the error.
    ///
    /// # Errors
    /// Returns [`Error::DivideByZero`] when dividing by zero.
    pub fn apply(self, current: f64, operand: f64, attribute: &str) -> Result<f64> {
        Ok(match self {
            Self::Add => current + operand,
            Self::Subtract => current - operand,
            Self::Multiply => current * operand,
            Self::Divide => {
                if operand == 0.0 {
                    return Err(Error::DivideByZero {
                        attribute: attribute.to_string(),
                    });
                }
                current / operand
            }
        })
    }
}

/// The closed set of patch operations, with their payloads.
#[derive(Debug, Clone)]
pub enum PatchOperation {
    /// Set an attribute on every match, adding it if absent.
    AttributeSet {
        /// Attribute name.
        attribute: String,
        /// New value.
        value: String,
    },
    /// Add an attribute to every match; fails if a match already has it.
    AttributeAdd {
        /// Attribute name.
        attribute: String,
        /// New value.
        value: String,
    },
    /// Remove an attribute from every match; fails if a match lacks it.
    AttributeRemove {
        /// Attribute name.
        attribute: String,
    },
    /// Update a numeric attribute in place.
    AttributeMath {
        /// Attribute name.
        attribute: String,
        /// Operation.
        operator: MathOperator,
        /// Right-hand side.
        operand: f64,
    },
    /// Append a copy of `node` as the last child of every match.
    Add {
        /// Fragment holding the node to copy.
        node: XmlDocument,
    },
    /// Insert a copy of `node` right after every match.
    Insert {
        /// Fragment holding the node to copy.
        node: XmlDocument,
    },
    /// Delete every match.
    Remove,
    /// Replace every match with a copy of `node`.
    Replace {
        /// Fragment holding the node to copy.
        node: XmlDocument,
    },
}

impl PatchOperation {
    /// The `Class` name of the operation.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AttributeSet { .. } => "AttributeSet",
            Self::AttributeAdd { .. } => "AttributeAdd",
            Self::AttributeRemove { .. } => "AttributeRemove",
            Self::AttributeMath { .. } => "AttributeMath",
            Self::Add { .. } => "Add",
            Self::Insert { .. } => "Insert",
            Self::Remove => "Remove",
            Self::Replace { .. } => "Replace",
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// The `Class` of a patch instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// `Class="AttributeSet"`
    AttributeSet,
    /// `Class="AttributeAdd"`
    AttributeAdd,
    /// `Class="AttributeRemove"`
    AttributeRemove,
    /// `Class="AttributeMath"`
    AttributeMath,
    /// `Class="Add"`
    Add,
    /// `Class="Insert"`
    Insert,
    /// `Class="Remove"`
    Remove,
    /// `Class="Replace"`
    Replace,
}

impl FromStr for PatchKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "AttributeSet" => Self::AttributeSet,
            "AttributeAdd" => Self::AttributeAdd,
            "AttributeRemove" => Self::AttributeRemove,
            "AttributeMath" => Self::AttributeMath,
            "Add" => Self::Add,
            "Insert" => Self::Insert,
            "Remove" => Self::Remove,
            "Replace" => Self::Replace,
            other => return Err(Error::UnknownPatchOperation(other.to_string())),
        })
    }
}

impl PatchKind {
    /// The `Class` name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributeSet => "AttributeSet",
            Self::AttributeAdd => "AttributeAdd",
            Self::AttributeRemove => "AttributeRemove",
            Self::AttributeMath => "AttributeMath",
            Self::Add => "Add",
            Self::Insert => "Insert",
            Self::Remove => "Remove",
            Self::Replace => "Replace",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction of a patch file.
///
/// Only `Class` and `xpath` are read up front. The payload fields are read
/// by [`PatchInstruction::operation`] once the selector has matched, so a
/// malformed payload behind a selector miss is never reported.
#[derive(Debug, Clone)]
pub struct PatchInstruction {
    /// 1-based index among the patch root's element children.
    pub position: usize,
    /// Source line of the instruction element.
    pub line: u32,
    /// Selector of the nodes to patch.
    pub selector: String,
    /// Operation class.
    pub kind: PatchKind,
    /// The instruction element in its patch document.
    pub element: NodeId,
}

impl PatchInstruction {
    /// Parses the header of instruction element `node`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownPatchOperation`] for an unknown `Class`, or
    /// [`Error::MissingPatchField`] without an `xpath`.
    pub fn parse(doc: &XmlDocument, node: NodeId, position: usize) -> Result<Self> {
        let kind = doc.attribute(node, "Class").unwrap_or_default().parse()?;
        let selector = field_text(doc, node, "xpath")?;
        Ok(Self {
            position,
            line: doc.line(node),
            selector,
            kind,
            element: node,
        })
    }

    /// Reads the payload of the instruction from its patch document `doc`.
    ///
    /// # Errors
    /// Returns [`Error::MissingPatchField`] when a field the operation needs
    /// is absent, or the error of a malformed `AttributeMath` operand.
    pub fn operation(&self, doc: &XmlDocument) -> Result<PatchOperation> {
        let node = self.element;
        Ok(match self.kind {
            PatchKind::AttributeSet => PatchOperation::AttributeSet {
                attribute: field_text(doc, node, "attribute")?,
                value: field_text(doc, node, "value")?,
            },
            PatchKind::AttributeAdd => PatchOperation::AttributeAdd {
                attribute: field_text(doc, node, "attribute")?,
                value: field_text(doc, node, "value")?,
            },
            PatchKind::AttributeRemove => PatchOperation::AttributeRemove {
                attribute: field_text(doc, node, "attribute")?,
            },
            PatchKind::AttributeMath => {
                let attribute = field_text(doc, node, "attribute")?;
                let value = field(doc, node, "value")?;
                let operator = doc.attribute(value, "opType").unwrap_or_default().parse()?;
                let text = doc.text(value).unwrap_or_default();
                let operand = parse_number(&text)?;
                PatchOperation::AttributeMath {
                    attribute,
                    operator,
                    operand,
                }
            }
            PatchKind::Add => PatchOperation::Add {
                node: value_fragment(doc, node)?,
            },
            PatchKind::Insert => PatchOperation::Insert {
                node: value_fragment(doc, node)?,
            },
            PatchKind::Remove => PatchOperation::Remove,
            PatchKind::Replace => PatchOperation::Replace {
                node: value_fragment(doc, node)?,
            },
        })
    }
}

fn field(doc: &XmlDocument, node: NodeId, name: &'static str) -> Result<NodeId> {
    doc.first_child_element(node, name)
        .ok_or(Error::MissingPatchField { field: name })
}

fn field_text(doc: &XmlDocument, node: NodeId, name: &'static str) -> Result<String> {
    let element = field(doc, node, name)?;
    Ok(doc.text(element).unwrap_or_default().trim().to_string())
}

fn value_fragment(doc: &XmlDocument, node: NodeId) -> Result<XmlDocument> {
    let value = field(doc, node, "value")?;
    let child = doc
        .element_children(value)
        .next()
        .ok_or(Error::MissingPatchField { field: "value" })?;
    Ok(XmlDocument::from_subtree(doc, child))
}

pub(crate) fn parse_number(text: &str) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|_| Error::InvalidNumber {
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<PatchInstruction> {
        let doc = XmlDocument::parse(xml).unwrap();
        let root = doc.root().unwrap();
        PatchInstruction::parse(&doc, root, 1)
    }

    fn operation(xml: &str) -> Result<PatchOperation> {
        let doc = XmlDocument::parse(xml).unwrap();
        let root = doc.root().unwrap();
        PatchInstruction::parse(&doc, root, 1)?.operation(&doc)
    }

    #[test]
    fn test_attribute_math() {
        let xml = r#"<Patch Class="AttributeMath">
                 <xpath>//i[@mid='5']</xpath>
                 <attribute>hp</attribute>
                 <value opType="multiply">1.5</value>
               </Patch>"#;
        let instruction = parse(xml).unwrap();
        assert_eq!(instruction.selector, "//i[@mid='5']");
        assert_eq!(instruction.kind, PatchKind::AttributeMath);
        assert!(matches!(
            operation(xml).unwrap(),
            PatchOperation::AttributeMath { ref attribute, operator: MathOperator::Multiply, operand }
                if attribute == "hp" && operand == 1.5
        ));
    }

    #[test]
    fn test_node_payload() {
        let op = operation(
            "<Patch Class='Add'><xpath>/data</xpath><value><Item mid='9'><x/></Item></value></Patch>",
        )
        .unwrap();
        let PatchOperation::Add { node } = op else {
            panic!("expected Add");
        };
        let root = node.root().unwrap();
        assert_eq!(node.name(root), Some("Item"));
        assert_eq!(node.attribute(root, "mid"), Some("9"));
    }

    #[test]
    fn test_unknown_class() {
        let err = parse("<Patch Class='Frobnicate'><xpath>/a</xpath></Patch>").unwrap_err();
        assert!(matches!(err, Error::UnknownPatchOperation(ref kind) if kind == "Frobnicate"));
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse("<Patch Class='Remove'/>"),
            Err(Error::MissingPatchField { field: "xpath" })
        ));
        assert!(parse("<Patch Class='Replace'><xpath>/a</xpath></Patch>").is_ok());
        assert!(matches!(
            operation("<Patch Class='AttributeSet'><xpath>/a</xpath><value>1</value></Patch>"),
            Err(Error::MissingPatchField { field: "attribute" })
        ));
        assert!(matches!(
            operation("<Patch Class='Replace'><xpath>/a</xpath><value>text only</value></Patch>"),
            Err(Error::MissingPatchField { field: "value" })
        ));
        assert!(matches!(
            operation("<Patch Class='AttributeMath'><xpath>/a</xpath><attribute>v</attribute><value opType='pow'>2</value></Patch>"),
            Err(Error::UnknownMathOperator(_))
        ));
    }

    #[test]
    fn test_math_operators() {
        assert_eq!(MathOperator::Add.apply(5.0, 2.5, "v").unwrap(), 7.5);
        assert_eq!(MathOperator::Subtract.apply(5.0, 2.0, "v").unwrap(), 3.0);
        assert_eq!(MathOperator::Divide.apply(5.0, 2.0, "v").unwrap(), 2.5);
        assert!(matches!(
            MathOperator::Divide.apply(5.0, 0.0, "v"),
            Err(Error::DivideByZero { .. })
        ));
    }
}
