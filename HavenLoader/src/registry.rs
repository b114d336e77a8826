//! Mod namespace prefixes
//!
//! Every mod owns a numeric prefix. It names the atlas page generated for the
//! mod's auto-packed textures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::xml::XmlDocument;

/// Looks up the namespace prefix of a mod.
pub trait ModRegistry {
    /// The prefix of the mod rooted at `mod_dir`.
    ///
    /// # Errors
    /// Returns [`Error::ModPrefixNotFound`] if the mod has none.
    fn prefix(&self, mod_dir: &Path) -> Result<u32>;
}

/// Reads `<prefix>` from the mod's `info` (or `info.xml`) file.
///
/// Overrides, keyed by mod path or mod directory name, take precedence.
#[derive(Debug, Clone, Default)]
pub struct InfoFileRegistry {
    overrides: HashMap<String, u32>,
}

impl InfoFileRegistry {
    /// A registry without overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the prefix for a mod, named by path or directory name.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, prefix: u32) -> Self {
        self.overrides.insert(name.into(), prefix);
        self
    }

    /// Forces the prefix for a mod, named by path or directory name.
    pub fn set_override(&mut self, name: impl Into<String>, prefix: u32) {
        self.overrides.insert(name.into(), prefix);
    }

    fn find_override(&self, mod_dir: &Path) -> Option<u32> {
        let full = mod_dir.to_string_lossy();
        if let Some(&prefix) = self.overrides.get(full.as_ref()) {
            return Some(prefix);
        }
        let name = mod_dir.file_name()?.to_string_lossy();
        self.overrides.get(name.as_ref()).copied()
    }
}

impl ModRegistry for InfoFileRegistry {
    fn prefix(&self, mod_dir: &Path) -> Result<u32> {
        if let Some(prefix) = self.find_override(mod_dir) {
            return Ok(prefix);
        }
        for name in ["info", "info.xml"] {
            let path = mod_dir.join(name);
            if !path.is_file() {
                continue;
            }
            let info = XmlDocument::read(&path)?;
            if let Some(node) = info.select_first("//prefix")? {
                let text = info.text(node).unwrap_or_default();
                return text.trim().parse().map_err(|_| Error::InvalidNumber {
                    value: text.trim().to_string(),
                });
            }
        }
        Err(Error::ModPrefixNotFound {
            mod_path: mod_dir.to_path_buf(),
        })
    }
}

/// In-memory prefixes keyed by mod directory.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    prefixes: HashMap<PathBuf, u32>,
}

impl StaticRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `prefix` for `mod_dir`.
    #[must_use]
    pub fn with(mut self, mod_dir: impl Into<PathBuf>, prefix: u32) -> Self {
        self.prefixes.insert(mod_dir.into(), prefix);
        self
    }
}

impl ModRegistry for StaticRegistry {
    fn prefix(&self, mod_dir: &Path) -> Result<u32> {
        self.prefixes
            .get(mod_dir)
            .copied()
            .ok_or_else(|| Error::ModPrefixNotFound {
                mod_path: mod_dir.to_path_buf(),
            })
    }
}
