//! Patch execution against the merged core library

use serde::Serialize;

use super::instruction::{PatchInstruction, PatchOperation, parse_number};
use crate::error::{Error, Result};
use crate::install::CoreLibraryState;
use crate::library::{LibraryDocuments, LibraryTarget, LoadedDocument};
use crate::xml::{NodeId, XmlDocument};

/// Result of one instruction that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionOutcome {
    /// The operation ran on `matched` nodes.
    Applied {
        /// Number of selected nodes.
        matched: usize,
    },
    /// The selector matched nothing; the instruction was skipped.
    SelectorMiss,
}

/// Result of one patch file that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file carries a `Noload` marker.
    Skipped,
    /// Every instruction ran.
    Processed {
        /// Instructions that matched at least one node.
        applied: usize,
        /// Instructions whose selector matched nothing.
        missed: usize,
    },
}

/// Counters for one mod's patches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    /// Patch files processed.
    pub files: usize,
    /// Files skipped because of a `Noload` marker.
    pub skipped_files: usize,
    /// Instructions applied.
    pub applied: usize,
    /// Instructions whose selector matched nothing.
    pub missed: usize,
}

/// Runs one instruction of `patch` against `core`.
///
/// The payload is only read once the selector has matched.
///
/// # Errors
/// Returns the operation's failure; the caller adds the file location.
pub fn apply_instruction(
    core: &mut XmlDocument,
    target: LibraryTarget,
    patch: &XmlDocument,
    instruction: &PatchInstruction,
) -> Result<InstructionOutcome> {
    let matches = core.select(&instruction.selector)?;
    tracing::info!(
        "XPATH => {:>18}: {:18}{}",
        target.as_str(),
        instruction.kind.as_str(),
        instruction.selector
    );
    if matches.is_empty() {
        tracing::info!("Unable to perform patch. XPath found no results {}", instruction.selector);
        return Ok(InstructionOutcome::SelectorMiss);
    }

    match &instruction.operation(patch)? {
        PatchOperation::AttributeSet { attribute, value } => {
            for &node in &matches {
                core.set_attribute(node, attribute, value);
            }
        }
        PatchOperation::AttributeAdd { attribute, value } => {
            for &node in &matches {
                if core.has_attribute(node, attribute) {
                    return Err(Error::AttributeAlreadyPresent {
                        attribute: attribute.clone(),
                    });
                }
                core.set_attribute(node, attribute, value);
            }
        }
        PatchOperation::AttributeRemove { attribute } => {
            tracing::warn!("Removing attributes may break the game");
            for &node in &matches {
                if core.remove_attribute(node, attribute).is_none() {
                    return Err(Error::AttributeMissing {
                        attribute: attribute.clone(),
                    });
                }
            }
        }
        PatchOperation::AttributeMath {
            attribute,
            operator,
            operand,
        } => {
            for &node in &matches {
                let current = core.attribute(node, attribute).unwrap_or("0");
                let is_float = current.contains('.');
                let updated = operator.apply(parse_number(current)?, *operand, attribute)?;
                core.set_attribute(node, attribute, &format_math_result(updated, is_float));
            }
        }
        PatchOperation::Add { node } => {
            for &parent in &matches {
                let copy = core.import_subtree(node, node.document_node());
                core.append_child(parent, copy);
            }
        }
        PatchOperation::Insert { node } => {
            for &sibling in &matches {
                let copy = core.import_subtree(node, node.document_node());
                core.insert_after(sibling, copy)?;
            }
        }
        PatchOperation::Remove => {
            for &target in &matches {
                core.remove(target)?;
            }
        }
        PatchOperation::Replace { node } => {
            for &old in &matches {
                let copy = core.import_subtree(node, node.document_node());
                core.replace(old, copy)?;
            }
        }
    }
    Ok(InstructionOutcome::Applied {
        matched: matches.len(),
    })
}

/// Formats an `AttributeMath` result: one decimal if the old value had a
/// decimal point, otherwise truncated toward zero.
fn format_math_result(value: f64, is_float: bool) -> String {
    if is_float {
        format!("{value:.1}")
    } else {
        format!("{}", value.trunc() as i64)
    }
}

/// Runs a patch file against the core document for `target`.
///
/// A file containing a `Noload` element is skipped untouched. Instructions
/// run in document order; the first failure stops the file.
///
/// # Errors
/// Returns [`Error::PatchFailed`] wrapping the failing instruction's error.
pub fn apply_patch_file(
    core: &mut XmlDocument,
    target: LibraryTarget,
    patch: &LoadedDocument,
) -> Result<FileOutcome> {
    let doc = &patch.document;
    if doc.select_first("//Noload")?.is_some() {
        tracing::info!("Skipping file {} (Noload tag)", patch.path.display());
        return Ok(FileOutcome::Skipped);
    }
    let root = doc.require_root()?;

    let mut applied = 0;
    let mut missed = 0;
    for (index, node) in doc.element_children(root).enumerate() {
        let position = index + 1;
        let outcome = PatchInstruction::parse(doc, node, position)
            .and_then(|instruction| apply_instruction(core, target, doc, &instruction));
        match outcome {
            Ok(InstructionOutcome::Applied { .. }) => applied += 1,
            Ok(InstructionOutcome::SelectorMiss) => missed += 1,
            Err(err) => return Err(patch_failed(patch, node, position, err)),
        }
    }
    Ok(FileOutcome::Processed { applied, missed })
}

fn patch_failed(patch: &LoadedDocument, node: NodeId, position: usize, err: Error) -> Error {
    let line = patch.document.line(node);
    tracing::error!(
        "Failed to apply patch operation {}:{}, reason: {}",
        patch.path.display(),
        line,
        err
    );
    Error::PatchFailed {
        file: patch.path.clone(),
        position,
        line,
        source: Box::new(err),
    }
}

/// Applies all of a mod's patch files to the merged core library.
///
/// # Errors
/// Returns the first [`Error::PatchFailed`]; later files are not run.
pub fn apply_patches(state: &mut CoreLibraryState, patches: &LibraryDocuments) -> Result<PatchSummary> {
    let mut summary = PatchSummary::default();
    for target in patches.targets() {
        let core = state.library.document_mut(target);
        for patch in patches.documents(target) {
            summary.files += 1;
            match apply_patch_file(core, target, patch)? {
                FileOutcome::Skipped => summary.skipped_files += 1,
                FileOutcome::Processed { applied, missed } => {
                    summary.applied += applied;
                    summary.missed += missed;
                }
            }
        }
        core.compact();
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::CoreLibrary;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const CORE: &str = "<data><Item><i mid='5' hp='5' dmg='5.0'><stats/></i><i mid='6' hp='10'/></Item></data>";

    fn patch(xml: &str) -> LoadedDocument {
        LoadedDocument {
            path: PathBuf::from("patches/haven.xml"),
            document: XmlDocument::parse(xml).unwrap(),
        }
    }

    fn run(core: &mut XmlDocument, xml: &str) -> Result<FileOutcome> {
        apply_patch_file(core, LibraryTarget::Haven, &patch(xml))
    }

    fn attr(doc: &XmlDocument, expr: &str, name: &str) -> Vec<String> {
        doc.select(expr)
            .unwrap()
            .into_iter()
            .map(|n| doc.attribute(n, name).unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_attribute_math_formatting() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        let outcome = run(
            &mut core,
            "<Patches>\
               <Patch Class='AttributeMath'><xpath>//i[@mid='5']</xpath><attribute>hp</attribute><value opType='add'>2.5</value></Patch>\
               <Patch Class='AttributeMath'><xpath>//i[@mid='5']</xpath><attribute>dmg</attribute><value opType='add'>2.5</value></Patch>\
               <Patch Class='AttributeMath'><xpath>//i[@mid='6']</xpath><attribute>armor</attribute><value opType='subtract'>3</value></Patch>\
             </Patches>",
        )
        .unwrap();
        assert_eq!(outcome, FileOutcome::Processed { applied: 3, missed: 0 });
        assert_eq!(attr(&core, "//i[@mid='5']", "hp"), ["7"]);
        assert_eq!(attr(&core, "//i[@mid='5']", "dmg"), ["7.5"]);
        assert_eq!(attr(&core, "//i[@mid='6']", "armor"), ["-3"]);
    }

    #[test]
    fn test_attribute_set_add_remove() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        run(
            &mut core,
            "<Patches>\
               <Patch Class='AttributeSet'><xpath>//i</xpath><attribute>tier</attribute><value>2</value></Patch>\
               <Patch Class='AttributeAdd'><xpath>//i[@mid='6']</xpath><attribute>rare</attribute><value>yes</value></Patch>\
               <Patch Class='AttributeRemove'><xpath>//i[@mid='5']</xpath><attribute>dmg</attribute></Patch>\
             </Patches>",
        )
        .unwrap();
        assert_eq!(attr(&core, "//i", "tier"), ["2", "2"]);
        assert_eq!(attr(&core, "//i", "rare"), ["-", "yes"]);
        assert_eq!(attr(&core, "//i", "dmg"), ["-", "-"]);

        let err = run(
            &mut core,
            "<Patches><Patch Class='AttributeAdd'><xpath>//i</xpath><attribute>tier</attribute><value>3</value></Patch></Patches>",
        )
        .unwrap_err();
        let Error::PatchFailed { source, position, .. } = err else {
            panic!("expected PatchFailed");
        };
        assert_eq!(position, 1);
        assert!(matches!(*source, Error::AttributeAlreadyPresent { .. }));

        let err = run(
            &mut core,
            "<Patches><Patch Class='AttributeRemove'><xpath>//i</xpath><attribute>rare</attribute></Patch></Patches>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::AttributeMissing { .. })));
    }

    #[test]
    fn test_structural_operations() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        run(
            &mut core,
            "<Patches>\
               <Patch Class='Add'><xpath>//i</xpath><value><tag v='new'/></value></Patch>\
               <Patch Class='Insert'><xpath>//i[@mid='5']</xpath><value><i mid='55'/></value></Patch>\
               <Patch Class='Replace'><xpath>//stats</xpath><value><gauge/></value></Patch>\
             </Patches>",
        )
        .unwrap();
        assert_eq!(attr(&core, "/data/Item/i", "mid"), ["5", "55", "6"]);
        assert_eq!(attr(&core, "//tag", "v"), ["new", "new"]);
        assert!(core.select("//stats").unwrap().is_empty());
        assert_eq!(core.select("//i[@mid='5']/gauge").unwrap().len(), 1);

        // Copies spliced into several places are independent
        let tags = core.select("//tag").unwrap();
        core.set_attribute(tags[0], "v", "changed");
        assert_eq!(attr(&core, "//tag", "v"), ["changed", "new"]);

        run(
            &mut core,
            "<Patches><Patch Class='Remove'><xpath>//i[@mid='6']</xpath></Patch></Patches>",
        )
        .unwrap();
        assert_eq!(attr(&core, "/data/Item/i", "mid"), ["5", "55"]);
    }

    #[test]
    fn test_selector_miss_then_unknown_kind() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        let err = run(
            &mut core,
            "<Patches>\
               <Patch Class='AttributeSet'><xpath>//nothing</xpath><attribute>a</attribute><value>1</value></Patch>\
               <Patch Class='Frobnicate'><xpath>//i</xpath></Patch>\
             </Patches>",
        )
        .unwrap_err();
        let Error::PatchFailed { position, source, .. } = err else {
            panic!("expected PatchFailed");
        };
        assert_eq!(position, 2);
        assert!(matches!(*source, Error::UnknownPatchOperation(_)));

        let outcome = run(
            &mut core,
            "<Patches><Patch Class='Remove'><xpath>//nothing</xpath></Patch></Patches>",
        )
        .unwrap();
        assert_eq!(outcome, FileOutcome::Processed { applied: 0, missed: 1 });
    }

    #[test]
    fn test_noload_has_no_effect() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        let before = core.to_xml_string().unwrap();
        let outcome = run(
            &mut core,
            "<Patches><Noload/>\
               <Patch Class='Remove'><xpath>//i</xpath></Patch>\
               <Patch Class='Frobnicate'><xpath>//i</xpath></Patch>\
             </Patches>",
        )
        .unwrap();
        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(core.to_xml_string().unwrap(), before);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        let err = run(
            &mut core,
            "<Patches><Patch Class='Remove'><xpath>/data</xpath></Patch></Patches>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::OrphanedNode { .. })));
    }

    #[test]
    fn test_root_cannot_be_inserted_after_or_replaced() {
        for class in ["Insert", "Replace"] {
            let mut core = XmlDocument::parse(CORE).unwrap();
            let before = core.to_xml_string().unwrap();
            let err = run(
                &mut core,
                &format!("<Patches><Patch Class='{class}'><xpath>/data</xpath><value><x/></value></Patch></Patches>"),
            )
            .unwrap_err();
            assert!(
                matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::OrphanedNode { ref name } if name == "data")),
                "{class}: {err:?}"
            );
            assert_eq!(core.to_xml_string().unwrap(), before);
        }
    }

    #[test]
    fn test_payload_is_read_only_after_a_match() {
        let mut core = XmlDocument::parse(CORE).unwrap();
        let outcome = run(
            &mut core,
            "<Patches>\
               <Patch Class='Add'><xpath>//nothing</xpath></Patch>\
               <Patch Class='AttributeSet'><xpath>//nothing</xpath><value>1</value></Patch>\
             </Patches>",
        )
        .unwrap();
        assert_eq!(outcome, FileOutcome::Processed { applied: 0, missed: 2 });

        let err = run(
            &mut core,
            "<Patches><Patch Class='Add'><xpath>//i[@mid='6']</xpath></Patch></Patches>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::MissingPatchField { field: "value" })));
    }

    #[test]
    fn test_patching_frees_detached_nodes() {
        let library = CoreLibrary::from_documents(
            "/core",
            [
                (LibraryTarget::Haven, XmlDocument::parse(CORE).unwrap()),
                (LibraryTarget::Texts, XmlDocument::parse("<t/>").unwrap()),
                (
                    LibraryTarget::Animations,
                    XmlDocument::parse("<AllAnimations/>").unwrap(),
                ),
                (
                    LibraryTarget::Textures,
                    XmlDocument::parse("<AllTexturesAndRegions><regions><re n='1'/></regions></AllTexturesAndRegions>")
                        .unwrap(),
                ),
            ],
        )
        .unwrap();
        let mut state = CoreLibraryState::new(library).unwrap();
        let mut patches = LibraryDocuments::new();
        patches.push(
            LibraryTarget::Haven,
            patch("<Patches><Patch Class='Remove'><xpath>//i</xpath></Patch></Patches>"),
        );
        let slots = state.library.document(LibraryTarget::Haven).node_count();

        let summary = apply_patches(&mut state, &patches).unwrap();

        assert_eq!(summary.applied, 1);
        let haven = state.library.document(LibraryTarget::Haven);
        assert!(haven.select("//i").unwrap().is_empty());
        assert_eq!(haven.node_count(), slots - 3);
    }

    #[test]
    fn test_divide_by_zero_and_bad_numbers() {
        let mut core = XmlDocument::parse("<data><i v='abc' w='4'/></data>").unwrap();
        let err = run(
            &mut core,
            "<Patches><Patch Class='AttributeMath'><xpath>//i</xpath><attribute>w</attribute><value opType='divide'>0</value></Patch></Patches>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::DivideByZero { .. })));

        let err = run(
            &mut core,
            "<Patches><Patch Class='AttributeMath'><xpath>//i</xpath><attribute>v</attribute><value opType='add'>1</value></Patch></Patches>",
        )
        .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { ref source, .. } if matches!(**source, Error::InvalidNumber { .. })));
    }
}
