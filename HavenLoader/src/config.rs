//! `havenloader.toml` install configuration
//!
//! ```toml
//! core_path = "~/Games/SpaceHaven"
//! export_debug_pages = false
//!
//! [[mods]]
//! path = "~/Games/SpaceHaven/mods/MoreItems"
//! prefix = 4242
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::install::InstallOptions;
use crate::registry::InfoFileRegistry;

fn default_true() -> bool {
    true
}

/// A mod listed in the configuration, in install order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    /// Mod directory. `~` is expanded.
    pub path: PathBuf,
    /// Overrides the prefix read from the mod's info file.
    #[serde(default)]
    pub prefix: Option<u32>,
}

/// Install configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Game install directory. `~` is expanded.
    #[serde(default)]
    pub core_path: Option<PathBuf>,
    /// Save rebuilt atlas pages as PNGs into contributing mods.
    #[serde(default = "default_true")]
    pub export_debug_pages: bool,
    /// Mods to install, in order.
    #[serde(default)]
    pub mods: Vec<ModEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core_path: None,
            export_debug_pages: true,
            mods: Vec::new(),
        }
    }
}

impl Config {
    /// Platform config location, e.g. `~/.config/HavenLoader/havenloader.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("HavenLoader").join("havenloader.toml"))
    }

    /// Parses a configuration file.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be read or is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Loads the file at [`Config::default_path`], or the defaults if there is none.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file exists but is invalid.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses configuration text, expanding `~` in every path.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.core_path = config.core_path.as_deref().map(expand_path);
        for entry in &mut config.mods {
            entry.path = expand_path(&entry.path);
        }
        Ok(config)
    }

    /// Mod directories in install order.
    #[must_use]
    pub fn mod_paths(&self) -> Vec<PathBuf> {
        self.mods.iter().map(|m| m.path.clone()).collect()
    }

    /// A registry honouring the configured prefix overrides.
    #[must_use]
    pub fn registry(&self) -> InfoFileRegistry {
        let mut registry = InfoFileRegistry::new();
        for entry in &self.mods {
            if let Some(prefix) = entry.prefix {
                registry.set_override(entry.path.to_string_lossy(), prefix);
            }
        }
        registry
    }

    /// Options for [`crate::install::install_mods`].
    #[must_use]
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            export_debug_pages: self.export_debug_pages,
        }
    }
}

/// Expands a leading `~` to the home directory.
#[must_use]
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}
