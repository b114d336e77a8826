//! Texture regions and atlas pages
//!
//! - [`allocator`]: region ID sequence and modded texture records
//! - [`detect`]: per-mod detection, ID remapping and auto-packing
//! - [`packer`]: MaxRects layout of generated pages
//! - [`cim`]: the CIM page container
//! - [`atlas`]: blitting modded regions into pages after all merges

pub mod allocator;
pub mod atlas;
pub mod cim;
pub mod detect;
pub mod packer;

pub use allocator::{AtlasPageRegistry, AtlasPageSpec, ModdedTexture, RegionIdAllocator};
pub use atlas::{AtlasReport, write_atlases};
pub use cim::{CimFormat, CimImage};
pub use detect::{TextureDetection, detect_textures};
pub use packer::{PackRequest, PackedPage, Rect, pack_page};
