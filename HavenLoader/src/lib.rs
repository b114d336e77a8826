#![allow(non_snake_case)]
//! # HavenLoader
//!
//! A pure-Rust mod installer for Space Haven.
//!
//! ## What an install does
//!
//! - **Library merge** - mod `library/` fragments are merged into the core
//!   `haven`, `texts`, `animations` and `textures` documents by element ID
//! - **Patches** - `patches/` files run XPath-addressed edits against the
//!   merged documents
//! - **Texture regions** - mod images get fresh region IDs and are packed
//!   into generated atlas pages
//! - **CIM atlases** - the game's ZLIB-wrapped atlas pages are rebuilt with
//!   the modded pixels
//!
//! ## Quick Start
//!
//! ```no_run
//! use havenloader::prelude::*;
//!
//! let registry = InfoFileRegistry::new().with_override("MoreItems", 4242);
//! let report = install_mods(
//!     "/games/SpaceHaven",
//!     &["/games/SpaceHaven/mods/MoreItems"],
//!     &registry,
//!     &InstallOptions::default(),
//! )?;
//! for page in report.extra_assets() {
//!     println!("extra asset: {page}");
//! }
//! # Ok::<(), havenloader::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `havenloader` command-line binary

pub mod config;
pub mod error;
pub mod install;
pub mod library;
pub mod merge;
pub mod patch;
pub mod registry;
pub mod textures;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::config::Config;
    pub use crate::install::{
        CoreLibraryState, InstallOptions, InstallPhase, InstallProgress, InstallReport,
        install_mods, install_mods_with_progress,
    };
    pub use crate::library::{CoreLibrary, LibraryDocuments, LibraryTarget, build_library};
    pub use crate::merge::{MergeSummary, do_merges, merge_definitions};
    pub use crate::patch::{PatchInstruction, PatchOperation, PatchSummary, apply_patches};
    pub use crate::registry::{InfoFileRegistry, ModRegistry, StaticRegistry};
    pub use crate::textures::{CimFormat, CimImage, RegionIdAllocator, pack_page, write_atlases};
    pub use crate::xml::{NodeId, Selector, XmlDocument};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
