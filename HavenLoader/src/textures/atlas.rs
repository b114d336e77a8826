//! Rebuilding atlas pages from modded regions

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::cim::CimImage;
use crate::error::{Error, Result};
use crate::install::CoreLibraryState;
use crate::library::LibraryTarget;
use crate::xml::{NodeId, XmlDocument};

/// Atlas pages touched by [`write_atlases`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AtlasReport {
    /// Pages that did not exist in the core install.
    pub created_pages: Vec<String>,
    /// Existing core pages that were rewritten.
    pub updated_pages: Vec<String>,
    /// Number of regions blitted.
    pub regions_written: usize,
    /// Debug PNGs written into mod folders.
    pub debug_exports: Vec<PathBuf>,
}

struct PageWork {
    image: CimImage,
    created: bool,
    export_dirs: IndexSet<PathBuf>,
}

/// Blits every modded region into its page and writes the touched pages.
///
/// Regions are taken from the final core textures document, in document
/// order. Existing pages are updated in place; pages declared by mods are
/// created transparent with their declared size. With `export_debug_pages`,
/// each page is also saved as `modded_cim_<page>.png` into the `textures/`
/// folder of every mod that contributed to it.
///
/// # Errors
/// Returns an error if a page is unknown, a container or image cannot be
/// read, or writing fails.
pub fn write_atlases(state: &CoreLibraryState, export_debug_pages: bool) -> Result<AtlasReport> {
    let textures = state.library.document(LibraryTarget::Textures);
    let mut pages: IndexMap<String, PageWork> = IndexMap::new();
    let mut report = AtlasReport::default();

    for region in textures.select("//re[@n]")? {
        let Some(id) = textures.attribute(region, "n").and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        let Some(texture) = state.all_modded_textures.get(&id) else {
            continue;
        };
        let Some(page) = textures.attribute(region, "t") else {
            tracing::warn!("Region {} has no atlas page, skipping", id);
            continue;
        };

        if !pages.contains_key(page) {
            let work = open_page(state, page)?;
            pages.insert(page.to_string(), work);
        }
        let Some(work) = pages.get_mut(page) else {
            continue;
        };

        let [x, y, w, h] = region_rect(textures, region)?;
        tracing::info!("Patching {}.cim with {}", page, texture.path.display());
        let source = image::open(&texture.path)?.to_rgba8();
        if !work.image.blit_rgba(&source, x, y, w, h) {
            tracing::warn!(
                "{} is {}x{} but region {} is {}x{}, clipping",
                texture.filename,
                source.width(),
                source.height(),
                id,
                w,
                h
            );
        }
        work.export_dirs.insert(texture.mod_dir.join("textures"));
        report.regions_written += 1;
    }

    for (page, work) in &pages {
        let path = state.library.cim_path(page);
        tracing::info!("Writing {}", path.display());
        work.image.write(&path)?;
        if work.created {
            report.created_pages.push(page.clone());
        } else {
            report.updated_pages.push(page.clone());
        }
        if export_debug_pages {
            for dir in &work.export_dirs {
                let export = dir.join(format!("modded_cim_{page}.png"));
                work.image.export_png(&export)?;
                report.debug_exports.push(export);
            }
        }
    }
    Ok(report)
}

fn open_page(state: &CoreLibraryState, page: &str) -> Result<PageWork> {
    let path = state.library.cim_path(page);
    let (image, created) = if path.is_file() {
        (CimImage::read(&path)?, false)
    } else {
        let spec = state
            .custom_textures_cim
            .get(page)
            .ok_or_else(|| Error::UnknownAtlasPage {
                page: page.to_string(),
            })?;
        tracing::info!("Creating atlas page {}.cim", page);
        (CimImage::new(spec.width()?, spec.height()?), true)
    };
    Ok(PageWork {
        image,
        created,
        export_dirs: IndexSet::new(),
    })
}

fn region_rect(doc: &XmlDocument, region: NodeId) -> Result<[u32; 4]> {
    let mut rect = [0; 4];
    for (slot, key) in rect.iter_mut().zip(["x", "y", "w", "h"]) {
        let value = doc.attribute(region, key).unwrap_or_default();
        *slot = value.trim().parse().map_err(|_| Error::InvalidNumber {
            value: value.to_string(),
        })?;
    }
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::CoreLibrary;
    use crate::textures::{AtlasPageSpec, ModdedTexture};
    use image::{ImageBuffer, Rgba};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup(core: &Path, regions: &str) -> CoreLibraryState {
        let library = core.join("library");
        fs::create_dir_all(&library).unwrap();
        fs::write(library.join("haven"), "<data/>").unwrap();
        fs::write(library.join("texts"), "<t/>").unwrap();
        fs::write(library.join("animations"), "<AllAnimations/>").unwrap();
        fs::write(
            library.join("textures"),
            format!("<AllTexturesAndRegions><regions><re n='100' t='1' x='0' y='0' w='1' h='1'/>{regions}</regions></AllTexturesAndRegions>"),
        )
        .unwrap();
        CimImage::new(8, 8).write(library.join("1.cim")).unwrap();
        CoreLibraryState::new(CoreLibrary::load(core).unwrap()).unwrap()
    }

    fn modded(mod_dir: &Path, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> ModdedTexture {
        let textures = mod_dir.join("textures");
        fs::create_dir_all(&textures).unwrap();
        let path = textures.join(format!("{name}.png"));
        ImageBuffer::from_pixel(w, h, Rgba(rgba)).save(&path).unwrap();
        ModdedTexture {
            filename: format!("{name}.png"),
            path,
            mapped_from: name.to_string(),
            mod_dir: mod_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_updates_existing_and_creates_new_pages() {
        let core = TempDir::new().unwrap();
        let mod_dir = TempDir::new().unwrap();
        let mut state = setup(
            core.path(),
            "<re n='42' t='1' x='2' y='3' w='2' h='2'/>\
             <re n='101' t='4242' x='0' y='0' w='4' h='4'/>\
             <re n='7' t='1' x='0' y='0' w='1' h='1'/>",
        );
        state.all_modded_textures.insert(42, modded(mod_dir.path(), "42", 2, 2, [255, 0, 0, 255]));
        state.all_modded_textures.insert(101, modded(mod_dir.path(), "ship", 4, 4, [0, 0, 255, 128]));
        state.custom_textures_cim.register("4242", AtlasPageSpec::square("4242", 16));

        let report = write_atlases(&state, true).unwrap();
        assert_eq!(report.updated_pages, ["1"]);
        assert_eq!(report.created_pages, ["4242"]);
        assert_eq!(report.regions_written, 2);

        let page = CimImage::read(core.path().join("library/1.cim")).unwrap();
        assert_eq!(page.pixel(2, 3), Some([255, 0, 0, 255]));
        assert_eq!(page.pixel(1, 1), Some([0, 0, 0, 0]));

        let created = CimImage::read(core.path().join("library/4242.cim")).unwrap();
        assert_eq!((created.width(), created.height()), (16, 16));
        assert_eq!(created.pixel(3, 3), Some([0, 0, 255, 128]));
        assert_eq!(created.pixel(4, 4), Some([0, 0, 0, 0]));

        assert!(mod_dir.path().join("textures/modded_cim_1.png").is_file());
        assert!(mod_dir.path().join("textures/modded_cim_4242.png").is_file());
    }

    #[test]
    fn test_unknown_page_is_fatal() {
        let core = TempDir::new().unwrap();
        let mod_dir = TempDir::new().unwrap();
        let mut state = setup(core.path(), "<re n='101' t='999' x='0' y='0' w='1' h='1'/>");
        state.all_modded_textures.insert(101, modded(mod_dir.path(), "x", 1, 1, [1, 1, 1, 1]));

        let err = write_atlases(&state, false).unwrap_err();
        assert!(matches!(err, Error::UnknownAtlasPage { ref page } if page == "999"));
    }

    #[test]
    fn test_debug_export_can_be_disabled() {
        let core = TempDir::new().unwrap();
        let mod_dir = TempDir::new().unwrap();
        let mut state = setup(core.path(), "<re n='42' t='1' x='0' y='0' w='1' h='1'/>");
        state.all_modded_textures.insert(42, modded(mod_dir.path(), "42", 1, 1, [9, 9, 9, 9]));

        let report = write_atlases(&state, false).unwrap();
        assert!(report.debug_exports.is_empty());
        assert!(!mod_dir.path().join("textures/modded_cim_1.png").exists());
    }
}
