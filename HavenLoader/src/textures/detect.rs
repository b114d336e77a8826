//! Detection of mod textures and region ID remapping
//!
//! Mods name their regions with local identifiers (usually the image file
//! name). Before the mod's animations and textures are merged, every new
//! identifier gets a core-wide region ID and the mod's documents are
//! rewritten in place to use it. Animation frames that only name an image
//! (`<assetPos filename="..."/>`) are packed into a new atlas page owned by
//! the mod.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::allocator::{AtlasPageSpec, ModdedTexture, RegionIdAllocator, parse_region_id};
use super::packer::{PackRequest, pack_page};
use crate::error::{Error, Result};
use crate::install::CoreLibraryState;
use crate::library::{LibraryDocuments, LibraryTarget, LoadedDocument};
use crate::registry::ModRegistry;
use crate::xml::{NodeId, XmlDocument};

/// What texture detection found in one mod.
#[derive(Debug, Clone, Default)]
pub struct TextureDetection {
    /// Regions whose pixels this mod supplies, keyed by core region ID.
    pub modded: IndexMap<u32, ModdedTexture>,
    /// Mod-local identifiers that received a new region ID.
    pub mapping: IndexMap<String, u32>,
    /// Page generated for auto-packed images, if any.
    pub generated_page: Option<String>,
}

struct Resolver<'a> {
    textures_dir: PathBuf,
    mod_dir: &'a Path,
    mapping: IndexMap<String, u32>,
    modded: IndexMap<u32, ModdedTexture>,
}

impl<'a> Resolver<'a> {
    fn new(mod_dir: &'a Path) -> Self {
        Self {
            textures_dir: mod_dir.join("textures"),
            mod_dir,
            mapping: IndexMap::new(),
            modded: IndexMap::new(),
        }
    }

    fn image_path(&self, local_id: &str) -> PathBuf {
        self.textures_dir.join(format!("{local_id}.png"))
    }

    /// Resolves a mod-local identifier, allocating a region ID if it is new.
    fn add_texture(&mut self, local_id: &str, regions: &mut RegionIdAllocator) {
        let core_id = parse_region_id(local_id).filter(|&id| id <= regions.last_core());
        if self.mapping.contains_key(local_id) || core_id.is_some_and(|id| self.modded.contains_key(&id)) {
            return;
        }

        let filename = format!("{local_id}.png");
        let path = self.image_path(local_id);
        let id = if let Some(id) = core_id {
            // A core region is only overridden when the mod ships its image
            if !path.is_file() {
                return;
            }
            tracing::info!("Mod updated texture region {}", id);
            id
        } else {
            let id = regions.allocate();
            self.mapping.insert(local_id.to_string(), id);
            tracing::info!("Allocated new core region idx {:>5} to file {}", id, filename);
            id
        };

        self.modded.insert(
            id,
            ModdedTexture {
                filename,
                path,
                mapped_from: local_id.to_string(),
                mod_dir: self.mod_dir.to_path_buf(),
            },
        );
    }

    /// Core ID for an identifier this mod overrides or introduced.
    fn resolved(&self, local_id: &str) -> Option<u32> {
        self.mapping.get(local_id).copied().or_else(|| {
            parse_region_id(local_id).filter(|id| {
                self.modded
                    .get(id)
                    .is_some_and(|texture| texture.mapped_from == local_id)
            })
        })
    }
}

/// An empty `<AllTexturesAndRegions>` document.
#[must_use]
pub fn empty_textures_document() -> XmlDocument {
    let mut doc = XmlDocument::with_root("AllTexturesAndRegions");
    if let Some(root) = doc.root() {
        doc.append_element(root, "textures");
        doc.append_element(root, "regions");
    }
    doc
}

/// Detects new and overridden textures in a mod and rewrites its documents.
///
/// Runs between the texts and animations merges. New region IDs come from
/// the run's shared allocator; declared atlas pages are recorded in
/// `state.custom_textures_cim`. The caller merges the returned
/// [`TextureDetection::modded`] into `state.all_modded_textures`.
///
/// # Errors
/// Returns an error on a non-numeric `a` without `filename`, an unreadable
/// image, a packing overflow or a missing mod prefix.
pub fn detect_textures(
    state: &mut CoreLibraryState,
    library: &mut LibraryDocuments,
    mod_dir: &Path,
    registry: &dyn ModRegistry,
) -> Result<TextureDetection> {
    let mut resolver = Resolver::new(mod_dir);
    if !resolver.textures_dir.is_dir() {
        return Ok(TextureDetection::default());
    }

    let mut auto_animations = false;
    for loaded in library.documents(LibraryTarget::Animations) {
        if loaded.document.select_first("//assetPos[@filename]")?.is_some() {
            auto_animations = true;
            break;
        }
    }

    if !library.contains(LibraryTarget::Textures) {
        if !auto_animations {
            return Ok(TextureDetection::default());
        }
        library.push(
            LibraryTarget::Textures,
            LoadedDocument::synthesized(empty_textures_document()),
        );
    }

    // Manually declared pages and regions
    let mut manual_ids: HashSet<String> = HashSet::new();
    let mut manual_nodes: Vec<(usize, NodeId)> = Vec::new();
    for (index, loaded) in library.documents(LibraryTarget::Textures).iter().enumerate() {
        let doc = &loaded.document;
        for page in doc.select("//t[@i]")? {
            if let Some(element) = doc.element(page) {
                let id = element.attributes.get("i").cloned().unwrap_or_default();
                state.custom_textures_cim.register(
                    &id,
                    AtlasPageSpec {
                        attributes: element.attributes.clone(),
                    },
                );
            }
        }
        for region in doc.select("//re[@n]")? {
            if let Some(local_id) = doc.attribute(region, "n") {
                manual_ids.insert(local_id.to_string());
                resolver.add_texture(local_id, &mut state.regions);
                manual_nodes.push((index, region));
            }
        }
    }

    if resolver.mapping.is_empty() && !auto_animations {
        return Ok(TextureDetection {
            modded: resolver.modded,
            ..TextureDetection::default()
        });
    }

    // Animation frame references
    let mut needs_packing: Vec<String> = Vec::new();
    for loaded in library.documents_mut(LibraryTarget::Animations) {
        let doc = &mut loaded.document;
        for asset in doc.select("//assetPos[@a | @filename]")? {
            let filename = doc.attribute(asset, "filename").map(str::to_string);
            let local_id = match &filename {
                Some(name) => name.clone(),
                None => {
                    let a = doc.attribute(asset, "a").unwrap_or_default();
                    if parse_region_id(a).is_none() {
                        return Err(Error::NonNumericRegionReference {
                            value: a.to_string(),
                        });
                    }
                    a.to_string()
                }
            };

            resolver.add_texture(&local_id, &mut state.regions);
            if filename.is_some()
                && resolver.mapping.contains_key(&local_id)
                && !manual_ids.contains(&local_id)
                && !needs_packing.contains(&local_id)
            {
                needs_packing.push(local_id.clone());
            }

            let target = if filename.is_some() {
                resolver.resolved(&local_id)
            } else {
                resolver.mapping.get(&local_id).copied()
            };
            if let Some(id) = target {
                doc.set_attribute(asset, "a", &id.to_string());
            }
        }
    }

    let mut generated_page = None;
    if !needs_packing.is_empty() {
        generated_page = Some(pack_auto_regions(
            state,
            library,
            &resolver,
            &needs_packing,
            registry,
        )?);
    }

    // Only the manual declarations still carry mod-local identifiers
    let documents = library.documents_mut(LibraryTarget::Textures);
    for (index, node) in manual_nodes {
        let doc = &mut documents[index].document;
        let Some(local_id) = doc.attribute(node, "n").map(str::to_string) else {
            continue;
        };
        if let Some(&id) = resolver.mapping.get(&local_id) {
            tracing::info!("Mapping texture 're' {} to {}", local_id, id);
            doc.set_attribute(node, "n", &id.to_string());
        }
    }

    Ok(TextureDetection {
        modded: resolver.modded,
        mapping: resolver.mapping,
        generated_page,
    })
}

/// Packs the auto-referenced images into a page named after the mod prefix.
fn pack_auto_regions(
    state: &mut CoreLibraryState,
    library: &mut LibraryDocuments,
    resolver: &Resolver<'_>,
    names: &[String],
    registry: &dyn ModRegistry,
) -> Result<String> {
    let page = registry.prefix(resolver.mod_dir)?.to_string();
    if let Some(existing) = existing_page_file(state, &page) {
        tracing::warn!(
            "Atlas page {} already exists at {}; it will be overwritten",
            page,
            existing.display()
        );
    }

    let mut requests = Vec::with_capacity(names.len());
    for name in names {
        let (width, height) = image::image_dimensions(resolver.image_path(name))?;
        requests.push(PackRequest {
            key: name.clone(),
            width,
            height,
        });
    }
    let packed = pack_page(&requests)?;
    tracing::info!(
        "Packed {} textures into new atlas page {} ({}x{})",
        packed.placements.len(),
        page,
        packed.size,
        packed.size
    );

    let doc = &mut library
        .documents_mut(LibraryTarget::Textures)
        .first_mut()
        .ok_or(Error::EmptyDocument)?
        .document;
    let textures_node = ensure_section(doc, "textures")?;
    let regions_node = ensure_section(doc, "regions")?;

    let spec = AtlasPageSpec::square(&page, packed.size);
    let page_node = doc.append_element(textures_node, "t");
    for (key, value) in &spec.attributes {
        doc.set_attribute(page_node, key, value);
    }
    state.custom_textures_cim.register(&page, spec);

    // Declarations go out in region ID order, whatever the packing order was
    let mut placed: Vec<_> = packed
        .placements
        .iter()
        .filter_map(|(name, rect)| resolver.mapping.get(name).map(|&id| (id, name, *rect)))
        .collect();
    placed.sort_by_key(|(id, _, _)| *id);

    for (id, name, rect) in placed {
        let region = doc.append_element(regions_node, "re");
        doc.set_attribute(region, "n", &id.to_string());
        doc.set_attribute(region, "t", &page);
        doc.set_attribute(region, "x", &rect.x.to_string());
        doc.set_attribute(region, "y", &rect.y.to_string());
        doc.set_attribute(region, "w", &rect.w.to_string());
        doc.set_attribute(region, "h", &rect.h.to_string());
        doc.set_attribute(region, "file", name);
    }
    Ok(page)
}

/// The core container a generated page named `page` would replace.
fn existing_page_file(state: &CoreLibraryState, page: &str) -> Option<PathBuf> {
    let path = state.library.cim_path(page);
    path.is_file().then_some(path)
}

fn ensure_section(doc: &mut XmlDocument, name: &str) -> Result<NodeId> {
    if let Some(node) = doc.select_first(&format!("//{name}"))? {
        return Ok(node);
    }
    let root = doc.require_root()?;
    Ok(doc.append_element(root, name))
}
