//! Fragment discovery for a mod's `library/` and `patches/` directories

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{LibraryDocuments, LibraryTarget, LoadedDocument};
use crate::error::Result;
use crate::xml::XmlDocument;

/// Loads every fragment in `<root>/<location>/` for the four library targets.
///
/// A file belongs to a target when its name starts with the target's stem, so
/// `haven`, `haven.xml` and `haven_items.xml` all feed `library/haven`. Files
/// are visited in lexicographic order. A missing directory yields an empty set.
///
/// # Errors
/// Returns an error naming the file if a fragment cannot be read or parsed.
pub fn build_library<P: AsRef<Path>>(root: P, location: &str) -> Result<LibraryDocuments> {
    let dir = root.as_ref().join(location);
    let mut library = LibraryDocuments::new();
    if !dir.is_dir() {
        return Ok(library);
    }

    let files = list_files(&dir)?;
    for target in LibraryTarget::ALL {
        for file in &files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(target.stem()) {
                continue;
            }
            tracing::info!("{} <= {}/{}", target, location, name);
            let document = XmlDocument::read(file)?;
            library.push(
                target,
                LoadedDocument {
                    path: file.clone(),
                    document,
                },
            );
        }
    }
    Ok(library)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_location_is_empty() {
        let temp = TempDir::new().unwrap();
        let library = build_library(temp.path(), "library").unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_split_fragments_in_name_order() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("library");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("haven_b.xml"), "<data><Item mid='2'/></data>").unwrap();
        fs::write(dir.join("haven_a.xml"), "<data><Item mid='1'/></data>").unwrap();
        fs::write(dir.join("texts"), "<t/>").unwrap();
        fs::write(dir.join("textures.xml"), "<AllTexturesAndRegions/>").unwrap();
        fs::write(dir.join("readme.txt"), "not a fragment").unwrap();

        let library = build_library(temp.path(), "library").unwrap();
        let haven = library.documents(LibraryTarget::Haven);
        assert_eq!(haven.len(), 2);
        assert!(haven[0].path.ends_with("haven_a.xml"));
        assert!(haven[1].path.ends_with("haven_b.xml"));
        assert_eq!(library.documents(LibraryTarget::Texts).len(), 1);
        assert_eq!(library.documents(LibraryTarget::Textures).len(), 1);
        assert!(!library.contains(LibraryTarget::Animations));
        assert_eq!(library.len(), 4);
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("patches");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("haven.xml"), "<Patches><Patch></Patches>").unwrap();

        let err = build_library(temp.path(), "patches").unwrap_err();
        assert!(err.to_string().contains("haven.xml"));
    }
}
