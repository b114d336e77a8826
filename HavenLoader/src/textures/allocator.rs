//! Region ID allocation and the records kept for modded textures

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::xml::XmlDocument;

/// Hands out region IDs above the highest one the core install declares.
///
/// One allocator is shared by every mod of an install run, so new regions get
/// consecutive IDs across mods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionIdAllocator {
    last_core: u32,
    next: u32,
}

impl RegionIdAllocator {
    /// Starts allocating at `last_core + 1`.
    #[must_use]
    pub fn new(last_core: u32) -> Self {
        Self {
            last_core,
            next: last_core + 1,
        }
    }

    /// Seeds the allocator from the highest numeric `n` of the core's `re` elements.
    ///
    /// # Errors
    /// Returns [`Error::NoCoreRegions`] if no region has a numeric ID.
    pub fn from_core_textures(textures: &XmlDocument) -> Result<Self> {
        let last_core = textures
            .select("//re[@n]")?
            .into_iter()
            .filter_map(|node| textures.attribute(node, "n")?.parse::<u32>().ok())
            .max()
            .ok_or(Error::NoCoreRegions)?;
        tracing::debug!("Last core region ID is {}", last_core);
        Ok(Self::new(last_core))
    }

    /// Highest region ID owned by the core install.
    #[must_use]
    pub fn last_core(&self) -> u32 {
        self.last_core
    }

    /// The ID the next allocation will return.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next
    }

    /// Returns true if `id` names a region shipped with the core install.
    #[must_use]
    pub fn is_core_region(&self, id: &str) -> bool {
        parse_region_id(id).is_some_and(|n| n <= self.last_core)
    }

    /// Takes the next free ID.
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Parses a purely decimal region identifier.
pub(crate) fn parse_region_id(id: &str) -> Option<u32> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// A region whose pixels come from a mod image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModdedTexture {
    /// Image file name inside the mod's `textures/` directory.
    pub filename: String,
    /// Full path to the image.
    pub path: PathBuf,
    /// The identifier the mod used for this region.
    pub mapped_from: String,
    /// The mod that supplied the image.
    pub mod_dir: PathBuf,
}

/// An atlas page declaration (`<t i=".." w=".." h=".."/>`), attributes kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtlasPageSpec {
    /// All attributes of the declaration, in document order.
    pub attributes: IndexMap<String, String>,
}

impl AtlasPageSpec {
    /// Declaration for a generated square page.
    #[must_use]
    pub fn square(page: &str, size: u32) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("i".to_string(), page.to_string());
        attributes.insert("w".to_string(), size.to_string());
        attributes.insert("h".to_string(), size.to_string());
        Self { attributes }
    }

    /// Page width.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNumber`] if `w` is missing or not a number.
    pub fn width(&self) -> Result<u32> {
        self.dimension("w")
    }

    /// Page height.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNumber`] if `h` is missing or not a number.
    pub fn height(&self) -> Result<u32> {
        self.dimension("h")
    }

    fn dimension(&self, key: &str) -> Result<u32> {
        let value = self.attributes.get(key).map_or("", String::as_str);
        value.trim().parse().map_err(|_| Error::InvalidNumber {
            value: value.to_string(),
        })
    }

    fn same_dimensions(&self, other: &AtlasPageSpec) -> bool {
        self.attributes.get("w") == other.attributes.get("w")
            && self.attributes.get("h") == other.attributes.get("h")
    }
}

/// Atlas pages declared by mods during a run, keyed by page ID.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AtlasPageRegistry {
    pages: IndexMap<String, AtlasPageSpec>,
}

impl AtlasPageRegistry {
    /// Records a page declaration.
    ///
    /// A page keeps the dimensions it was first declared with; a later
    /// declaration with different dimensions is ignored with a warning.
    pub fn register(&mut self, page: &str, spec: AtlasPageSpec) {
        match self.pages.get(page) {
            Some(existing) if !existing.same_dimensions(&spec) => {
                tracing::warn!(
                    "Atlas page {} already declared as {}x{}, ignoring redeclaration as {}x{}",
                    page,
                    existing.attributes.get("w").map_or("?", String::as_str),
                    existing.attributes.get("h").map_or("?", String::as_str),
                    spec.attributes.get("w").map_or("?", String::as_str),
                    spec.attributes.get("h").map_or("?", String::as_str),
                );
            }
            _ => {
                self.pages.insert(page.to_string(), spec);
            }
        }
    }

    /// Declaration for `page`, if any mod declared it.
    #[must_use]
    pub fn get(&self, page: &str) -> Option<&AtlasPageSpec> {
        self.pages.get(page)
    }

    /// Number of declared pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no page was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_from_highest_numeric_region() {
        let doc = XmlDocument::parse(
            "<AllTexturesAndRegions><regions>\
             <re n='7'/><re n='100'/><re n='42'/><re n='custom'/>\
             </regions></AllTexturesAndRegions>",
        )
        .unwrap();
        let mut allocator = RegionIdAllocator::from_core_textures(&doc).unwrap();
        assert_eq!(allocator.last_core(), 100);
        assert_eq!(allocator.allocate(), 101);
        assert_eq!(allocator.allocate(), 102);
        assert_eq!(allocator.next_id(), 103);
    }

    #[test]
    fn test_no_numeric_regions_is_fatal() {
        let doc = XmlDocument::parse("<AllTexturesAndRegions><regions><re n='x'/></regions></AllTexturesAndRegions>")
            .unwrap();
        assert!(matches!(
            RegionIdAllocator::from_core_textures(&doc),
            Err(Error::NoCoreRegions)
        ));
    }

    #[test]
    fn test_core_region_detection() {
        let allocator = RegionIdAllocator::new(100);
        assert!(allocator.is_core_region("42"));
        assert!(allocator.is_core_region("100"));
        assert!(!allocator.is_core_region("101"));
        assert!(!allocator.is_core_region("foo"));
        assert!(!allocator.is_core_region("-4"));
    }

    #[test]
    fn test_page_keeps_first_dimensions() {
        let mut pages = AtlasPageRegistry::default();
        pages.register("4242", AtlasPageSpec::square("4242", 128));
        pages.register("4242", AtlasPageSpec::square("4242", 256));
        assert_eq!(pages.get("4242").unwrap().width().unwrap(), 128);
        assert_eq!(pages.len(), 1);
    }
}
