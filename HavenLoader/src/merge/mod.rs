//! ID-keyed merging of mod definitions into the core library
//!
//! Each merge pass names a container in the core tree and the attribute that
//! identifies its children. Every child a mod declares under the same
//! container replaces all core children sharing its ID, so the last
//! declaration of an ID wins.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::install::CoreLibraryState;
use crate::library::{LibraryDocuments, LibraryTarget};
use crate::registry::ModRegistry;
use crate::textures::{TextureDetection, detect_textures};
use crate::xml::XmlDocument;

/// One merge pass: a container selector and the ID attribute of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeTarget {
    /// Library file the pass runs on.
    pub target: LibraryTarget,
    /// Selector of the container element.
    pub selector: &'static str,
    /// Attribute identifying the container's children.
    pub id_attribute: &'static str,
}

impl MergeTarget {
    const fn new(target: LibraryTarget, selector: &'static str, id_attribute: &'static str) -> Self {
        Self {
            target,
            selector,
            id_attribute,
        }
    }
}

/// Definition kinds of `library/haven` and their ID attributes, in merge order.
pub const HAVEN_TARGETS: &[MergeTarget] = &[
    MergeTarget::new(LibraryTarget::Haven, "/data/BackPack", "mid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/BackStory", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/CelestialObject", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Character", "cid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/CharacterCondition", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/CharacterSet", "cid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/CharacterTrait", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/CostGroup", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Craft", "cid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/DataLog", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/DataLogFragment", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/DefaultStuff", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/DialogChoice", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/DifficultySettings", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Effect", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Element", "mid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Encounter", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Faction", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/GOAPAction", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/IdleAnim", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/IsoFX", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Item", "mid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/MainCat", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Monster", "cid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Notes", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/ObjectiveCollection", "nid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/PersonalitySettings", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Plan", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Product", "eid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/RandomShip", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Randomizer", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Room", "rid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Sector", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/Ship", "rid"),
    MergeTarget::new(LibraryTarget::Haven, "/data/SubCat", "id"),
    MergeTarget::new(LibraryTarget::Haven, "/data/TradingValues", "id"),
];

/// The `library/texts` pass.
pub const TEXT_TARGETS: &[MergeTarget] = &[MergeTarget::new(LibraryTarget::Texts, "/t", "id")];

/// The `library/animations` pass.
pub const ANIMATION_TARGETS: &[MergeTarget] = &[MergeTarget::new(
    LibraryTarget::Animations,
    "/AllAnimations/animations",
    "n",
)];

/// The `library/textures` passes: pages, then regions.
pub const TEXTURE_TARGETS: &[MergeTarget] = &[
    MergeTarget::new(LibraryTarget::Textures, "/AllTexturesAndRegions/textures", "i"),
    MergeTarget::new(LibraryTarget::Textures, "/AllTexturesAndRegions/regions", "n"),
];

/// Counters for one mod's merge passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Elements copied into the core library.
    pub merged: usize,
    /// Core elements removed because a mod redeclared their ID.
    pub replaced: usize,
    /// New region IDs allocated for the mod.
    pub regions_allocated: usize,
    /// Regions whose pixels the mod supplies.
    pub modded_textures: usize,
    /// Atlas page generated for auto-packed images.
    pub generated_page: Option<String>,
}

/// Merges the children of `selector` in each mod document into the core.
///
/// Returns `(merged, replaced)`. A core tree without the container is
/// skipped with a warning; a mod document without it is ignored.
///
/// # Errors
/// Returns an error if the selector cannot be evaluated.
pub fn merge_definitions(
    core: &mut XmlDocument,
    mod_docs: &[&XmlDocument],
    selector: &str,
    id_attribute: &str,
) -> Result<(usize, usize)> {
    let Some(base) = core.select_first(selector)? else {
        tracing::warn!("Core library has nothing at {}, skipping merge", selector);
        return Ok((0, 0));
    };

    let mut merged = 0;
    let mut replaced = 0;
    for mod_doc in mod_docs {
        let Some(mod_root) = mod_doc.select_first(selector)? else {
            continue;
        };
        for element in mod_doc.element_children(mod_root) {
            let id = mod_doc.attribute(element, id_attribute);
            let conflicts: Vec<_> = core
                .element_children(base)
                .filter(|&child| core.attribute(child, id_attribute) == id)
                .collect();
            for conflict in conflicts {
                core.detach(conflict);
                replaced += 1;
            }
            let copy = core.import_subtree(mod_doc, element);
            core.append_child(base, copy);
            merged += 1;
        }
    }
    if merged > 0 {
        tracing::info!("Merged {} elements into {}", merged, selector);
    }
    Ok((merged, replaced))
}

fn merge_passes(
    state: &mut CoreLibraryState,
    library: &LibraryDocuments,
    passes: &[MergeTarget],
    summary: &mut MergeSummary,
) -> Result<()> {
    let Some(first) = passes.first() else {
        return Ok(());
    };
    if !library.contains(first.target) {
        tracing::info!("No merges needed: {}", first.target);
        return Ok(());
    }
    let mod_docs: Vec<&XmlDocument> = library
        .documents(first.target)
        .iter()
        .map(|loaded| &loaded.document)
        .collect();
    for pass in passes {
        let core = state.library.document_mut(pass.target);
        let (merged, replaced) =
            merge_definitions(core, &mod_docs, pass.selector, pass.id_attribute)?;
        summary.merged += merged;
        summary.replaced += replaced;
    }
    Ok(())
}

/// Runs every merge pass for one mod, in order: haven, texts, texture
/// detection, animations, textures.
///
/// Texture detection rewrites the mod's animation and texture documents in
/// place, so it has to run before those two are merged.
///
/// # Errors
/// Returns the first merge or texture detection error.
pub fn do_merges(
    state: &mut CoreLibraryState,
    library: &mut LibraryDocuments,
    mod_dir: &Path,
    registry: &dyn ModRegistry,
) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();
    merge_passes(state, library, HAVEN_TARGETS, &mut summary)?;
    merge_passes(state, library, TEXT_TARGETS, &mut summary)?;

    let TextureDetection {
        modded,
        mapping,
        generated_page,
    } = detect_textures(state, library, mod_dir, registry)?;
    summary.regions_allocated = mapping.len();
    summary.modded_textures = modded.len();
    summary.generated_page = generated_page;
    // Later mods override earlier textures for the same region
    state.all_modded_textures.extend(modded);

    merge_passes(state, library, ANIMATION_TARGETS, &mut summary)?;
    merge_passes(state, library, TEXTURE_TARGETS, &mut summary)?;
    Ok(summary)
}
