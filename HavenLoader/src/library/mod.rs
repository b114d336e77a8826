//! Library documents: the four XML targets of a Space Haven install
//!
//! The core install keeps each target as one extension-less file under
//! `library/`. Mods may split a target across several fragment files (for
//! example `library/haven_items.xml` and `library/haven_rooms.xml`); those are
//! loaded in file-name order and kept as separate documents.

mod core_library;
mod loader;

pub use core_library::CoreLibrary;
pub use loader::build_library;

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::xml::XmlDocument;

/// The logical XML targets mods can merge into and patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LibraryTarget {
    /// Game definitions (`library/haven`)
    Haven,
    /// Localized strings (`library/texts`)
    Texts,
    /// Animation definitions (`library/animations`)
    Animations,
    /// Atlas pages and texture regions (`library/textures`)
    Textures,
}

impl LibraryTarget {
    /// Every target, in load order.
    pub const ALL: [LibraryTarget; 4] = [
        LibraryTarget::Haven,
        LibraryTarget::Texts,
        LibraryTarget::Animations,
        LibraryTarget::Textures,
    ];

    /// Logical name, as used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Haven => "library/haven",
            Self::Texts => "library/texts",
            Self::Animations => "library/animations",
            Self::Textures => "library/textures",
        }
    }

    /// File stem used to discover the target in `library/` or `patches/`.
    #[must_use]
    pub fn stem(self) -> &'static str {
        match self {
            Self::Haven => "haven",
            Self::Texts => "texts",
            Self::Animations => "animations",
            Self::Textures => "textures",
        }
    }
}

impl std::fmt::Display for LibraryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed fragment and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Source file (empty for documents synthesized in memory).
    pub path: PathBuf,
    /// The parsed tree.
    pub document: XmlDocument,
}

impl LoadedDocument {
    /// Wraps a document built in memory.
    #[must_use]
    pub fn synthesized(document: XmlDocument) -> Self {
        Self {
            path: PathBuf::new(),
            document,
        }
    }
}

/// Fragments of one location (`library/` or `patches/`) of a mod, per target.
#[derive(Debug, Clone, Default)]
pub struct LibraryDocuments {
    targets: IndexMap<LibraryTarget, Vec<LoadedDocument>>,
}

impl LibraryDocuments {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if at least one fragment exists for `target`.
    #[must_use]
    pub fn contains(&self, target: LibraryTarget) -> bool {
        self.targets.get(&target).is_some_and(|docs| !docs.is_empty())
    }

    /// Fragments for `target` (empty if none).
    #[must_use]
    pub fn documents(&self, target: LibraryTarget) -> &[LoadedDocument] {
        self.targets
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable fragments for `target` (empty if none).
    pub fn documents_mut(&mut self, target: LibraryTarget) -> &mut [LoadedDocument] {
        self.targets
            .get_mut(&target)
            .map(Vec::as_mut_slice)
            .unwrap_or(&mut [])
    }

    /// Appends a fragment for `target`.
    pub fn push(&mut self, target: LibraryTarget, document: LoadedDocument) {
        self.targets.entry(target).or_default().push(document);
    }

    /// Targets with fragments, in discovery order.
    pub fn targets(&self) -> impl Iterator<Item = LibraryTarget> + '_ {
        self.targets
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(target, _)| *target)
    }

    /// Total number of fragments across all targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }

    /// Returns true if no fragment was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
