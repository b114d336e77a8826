//! The install run driver

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::progress::{InstallPhase, InstallProgress, InstallProgressCallback};
use super::state::CoreLibraryState;
use crate::error::Result;
use crate::library::build_library;
use crate::merge::{MergeSummary, do_merges};
use crate::patch::{PatchSummary, apply_patches};
use crate::registry::ModRegistry;
use crate::textures::{AtlasReport, write_atlases};

/// Options for an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOptions {
    /// Save every rebuilt atlas page as `modded_cim_<page>.png` into the
    /// `textures/` folder of the mods that contributed to it.
    pub export_debug_pages: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            export_debug_pages: true,
        }
    }
}

/// What happened to one mod.
#[derive(Debug, Clone, Serialize)]
pub struct ModReport {
    /// Mod directory.
    pub path: PathBuf,
    /// Merge counters.
    pub merge: MergeSummary,
    /// Patch counters.
    pub patches: PatchSummary,
}

/// Outcome of an install run.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// The core install that was modified.
    pub core_path: PathBuf,
    /// Highest region ID shipped with the core install.
    pub last_core_region_id: u32,
    /// Per-mod results, in install order.
    pub mods: Vec<ModReport>,
    /// Atlas pages written.
    pub atlas: AtlasReport,
}

impl InstallReport {
    /// Library paths of the atlas pages this run created.
    ///
    /// The game only loads these extra assets if the launcher announces them.
    #[must_use]
    pub fn extra_assets(&self) -> Vec<String> {
        self.atlas
            .created_pages
            .iter()
            .map(|page| format!("library/{page}.cim"))
            .collect()
    }

    /// New region IDs allocated across all mods.
    #[must_use]
    pub fn regions_allocated(&self) -> usize {
        self.mods.iter().map(|m| m.merge.regions_allocated).sum()
    }
}

fn mod_name(mod_dir: &Path) -> String {
    mod_dir.file_name().map_or_else(
        || mod_dir.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Installs `mod_dirs`, in order, into the game at `core_path`.
///
/// # Errors
/// Returns the first fatal error. The core XML files are only written after
/// every patch succeeded.
pub fn install_mods<P: AsRef<Path>, M: AsRef<Path>>(
    core_path: P,
    mod_dirs: &[M],
    registry: &dyn ModRegistry,
    options: &InstallOptions,
) -> Result<InstallReport> {
    install_mods_with_progress(core_path, mod_dirs, registry, options, &|_| {})
}

/// Installs `mod_dirs` into the game at `core_path` with progress callback.
///
/// # Errors
/// Returns the first fatal error. The core XML files are only written after
/// every patch succeeded.
pub fn install_mods_with_progress<P: AsRef<Path>, M: AsRef<Path>>(
    core_path: P,
    mod_dirs: &[M],
    registry: &dyn ModRegistry,
    options: &InstallOptions,
    progress: InstallProgressCallback,
) -> Result<InstallReport> {
    let core_path = core_path.as_ref();
    let total = mod_dirs.len();
    tracing::info!("Loading core library from {}", core_path.display());
    let mut state = CoreLibraryState::load(core_path)?;
    let last_core_region_id = state.regions.last_core();

    let mut reports = Vec::with_capacity(total);
    for (index, mod_dir) in mod_dirs.iter().enumerate() {
        let mod_dir = mod_dir.as_ref();
        let name = mod_name(mod_dir);
        progress(&InstallProgress::with_mod(InstallPhase::Installing, index + 1, total, &name));
        tracing::info!("Loading mod {}...", mod_dir.display());

        let mut library = build_library(mod_dir, "library")?;
        let merge = do_merges(&mut state, &mut library, mod_dir, registry)?;
        reports.push(ModReport {
            path: mod_dir.to_path_buf(),
            merge,
            patches: PatchSummary::default(),
        });
        state.library.compact_all();
    }

    // Patches run after every merge so later mods cannot clobber them
    for (index, report) in reports.iter_mut().enumerate() {
        let name = mod_name(&report.path);
        progress(&InstallProgress::with_mod(InstallPhase::Patching, index + 1, total, &name));
        tracing::info!("Loading patches {}...", report.path.display());

        let patches = build_library(&report.path, "patches")?;
        report.patches = apply_patches(&mut state, &patches)?;
    }

    progress(&InstallProgress::new(InstallPhase::UpdatingXml, 1, 1));
    state.library.write_all()?;

    progress(&InstallProgress::new(InstallPhase::PackingTextures, 1, 1));
    let atlas = write_atlases(&state, options.export_debug_pages)?;

    progress(&InstallProgress::new(InstallPhase::Complete, 1, 1));
    tracing::info!(
        "Installed {} mods, {} new regions, {} new atlas pages",
        total,
        reports.iter().map(|r| r.merge.regions_allocated).sum::<usize>(),
        atlas.created_pages.len()
    );

    Ok(InstallReport {
        core_path: core_path.to_path_buf(),
        last_core_region_id,
        mods: reports,
        atlas,
    })
}
