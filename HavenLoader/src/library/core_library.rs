//! The core install's library files

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::LibraryTarget;
use crate::error::{Error, Result};
use crate::xml::XmlDocument;

/// The four core library documents of a game install, loaded in memory.
#[derive(Debug, Clone)]
pub struct CoreLibrary {
    root: PathBuf,
    documents: IndexMap<LibraryTarget, XmlDocument>,
}

impl CoreLibrary {
    /// Loads `<core>/library/{haven,texts,animations,textures}`.
    ///
    /// # Errors
    /// Returns [`Error::MissingCoreFile`] if any target is absent, or a parse
    /// error naming the file.
    pub fn load<P: AsRef<Path>>(core_path: P) -> Result<Self> {
        let root = core_path.as_ref().to_path_buf();
        let mut documents = IndexMap::new();
        for target in LibraryTarget::ALL {
            let path = root.join(target.as_str());
            if !path.is_file() {
                return Err(Error::MissingCoreFile { path });
            }
            tracing::debug!("Loading core {}", path.display());
            documents.insert(target, XmlDocument::read(&path)?);
        }
        Ok(Self { root, documents })
    }

    /// Builds a core library from documents already in memory.
    ///
    /// Nothing is read from disk; `write_all` still targets `core_path`.
    pub fn from_documents<P: AsRef<Path>>(
        core_path: P,
        documents: impl IntoIterator<Item = (LibraryTarget, XmlDocument)>,
    ) -> Result<Self> {
        let mut map: IndexMap<_, _> = documents.into_iter().collect();
        let mut ordered = IndexMap::new();
        for target in LibraryTarget::ALL {
            let document = map.shift_remove(&target).ok_or_else(|| Error::MissingCoreFile {
                path: core_path.as_ref().join(target.as_str()),
            })?;
            ordered.insert(target, document);
        }
        Ok(Self {
            root: core_path.as_ref().to_path_buf(),
            documents: ordered,
        })
    }

    /// The install directory this library was loaded from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The document for `target`.
    #[must_use]
    pub fn document(&self, target: LibraryTarget) -> &XmlDocument {
        &self.documents[&target]
    }

    /// Mutable document for `target`.
    pub fn document_mut(&mut self, target: LibraryTarget) -> &mut XmlDocument {
        &mut self.documents[&target]
    }

    /// Path of an atlas page container, `<core>/library/<page>.cim`.
    #[must_use]
    pub fn cim_path(&self, page: &str) -> PathBuf {
        self.root.join("library").join(format!("{page}.cim"))
    }

    /// Frees the nodes merges and patches detached from every document.
    pub fn compact_all(&mut self) {
        for document in self.documents.values_mut() {
            document.compact();
        }
    }

    /// Writes every target back to the install, each file replaced atomically.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_all(&self) -> Result<()> {
        for (target, document) in &self.documents {
            let path = self.root.join(target.as_str());
            tracing::info!("Writing {}", path.display());
            document.write(&path)?;
        }
        Ok(())
    }
}
