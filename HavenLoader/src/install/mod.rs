//! Install runs: merge, patch, flush XML, rebuild atlases
//!
//! ```no_run
//! use havenloader::install::{InstallOptions, install_mods};
//! use havenloader::registry::InfoFileRegistry;
//!
//! let report = install_mods(
//!     "/games/SpaceHaven",
//!     &["/mods/MoreItems", "/mods/ShipSkins"],
//!     &InfoFileRegistry::new(),
//!     &InstallOptions::default(),
//! )?;
//! println!("New atlas pages: {:?}", report.atlas.created_pages);
//! # Ok::<(), havenloader::Error>(())
//! ```

mod pipeline;
mod progress;
mod state;

pub use pipeline::{InstallOptions, InstallReport, ModReport, install_mods, install_mods_with_progress};
pub use progress::{InstallPhase, InstallProgress, InstallProgressCallback};
pub use state::CoreLibraryState;
