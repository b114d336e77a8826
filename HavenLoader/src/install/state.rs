//! Run-scoped core library state

use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::library::{CoreLibrary, LibraryTarget};
use crate::textures::{AtlasPageRegistry, ModdedTexture, RegionIdAllocator};

/// Everything an install run accumulates across mods.
///
/// Created once per run and lent to each step by `&mut`.
#[derive(Debug, Clone)]
pub struct CoreLibraryState {
    /// The core documents being merged into and patched.
    pub library: CoreLibrary,
    /// Shared region ID sequence.
    pub regions: RegionIdAllocator,
    /// Regions whose pixels come from a mod image, keyed by core region ID.
    pub all_modded_textures: IndexMap<u32, ModdedTexture>,
    /// Atlas pages declared by mods, keyed by page ID.
    pub custom_textures_cim: AtlasPageRegistry,
}

impl CoreLibraryState {
    /// Wraps a loaded core library, seeding the region allocator from it.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoCoreRegions`] if the textures document has no numeric region.
    pub fn new(library: CoreLibrary) -> Result<Self> {
        let regions =
            RegionIdAllocator::from_core_textures(library.document(LibraryTarget::Textures))?;
        Ok(Self {
            library,
            regions,
            all_modded_textures: IndexMap::new(),
            custom_textures_cim: AtlasPageRegistry::default(),
        })
    }

    /// Loads the core library of the install at `core_path`.
    ///
    /// # Errors
    /// Returns an error if a core file is missing or malformed.
    pub fn load<P: AsRef<Path>>(core_path: P) -> Result<Self> {
        Self::new(CoreLibrary::load(core_path)?)
    }
}
