//! Page layout for auto-generated atlas pages
//!
//! Placement is delegated to `tex-packer-core`'s MaxRects packer with the
//! best-short-side-fit heuristic, no rotation, no padding and one square bin.
//! Rectangles are placed largest area first.

use tex_packer_core::packer::Packer;
use tex_packer_core::packer::maxrects::MaxRectsPacker;
use tex_packer_core::{MaxRectsHeuristic, PackerConfig};

pub use tex_packer_core::Rect;

use crate::error::{Error, Result};

/// A rectangle to place, identified by its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest<K> {
    /// Caller's identifier.
    pub key: K,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A fully packed square page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPage<K> {
    /// Side of the square page.
    pub size: u32,
    /// Placements, in packing order.
    pub placements: Vec<(K, Rect)>,
}

/// Side of the square page for the given rectangles:
/// `max(round(sqrt(total area) * 1.2), largest single side)`.
#[must_use]
pub fn estimate_page_size<K>(requests: &[PackRequest<K>]) -> u32 {
    let area: u64 = requests
        .iter()
        .map(|r| u64::from(r.width) * u64::from(r.height))
        .sum();
    let longest = requests
        .iter()
        .map(|r| r.width.max(r.height))
        .max()
        .unwrap_or(0);
    let estimate = ((area as f64).sqrt() * 1.2).round() as u32;
    estimate.max(longest)
}

fn page_packer(size: u32) -> MaxRectsPacker {
    let config = PackerConfig {
        max_width: size,
        max_height: size,
        allow_rotation: false,
        border_padding: 0,
        texture_padding: 0,
        texture_extrusion: 0,
        trim: false,
        mr_heuristic: MaxRectsHeuristic::BestShortSideFit,
        mr_reference: true,
        ..PackerConfig::default()
    };
    MaxRectsPacker::new(config, MaxRectsHeuristic::BestShortSideFit)
}

/// Packs every request into one square page sized by [`estimate_page_size`].
///
/// # Errors
/// Returns [`Error::PackingOverflow`] if any rectangle does not fit.
pub fn pack_page<K: Clone>(requests: &[PackRequest<K>]) -> Result<PackedPage<K>> {
    let size = estimate_page_size(requests);
    let mut order: Vec<&PackRequest<K>> = requests.iter().collect();
    // Stable: equal areas keep request order
    order.sort_by_key(|r| std::cmp::Reverse(u64::from(r.width) * u64::from(r.height)));

    let mut packer = page_packer(size);
    let mut placements = Vec::with_capacity(requests.len());
    for request in order {
        let rect = Rect::new(0, 0, request.width, request.height);
        match packer.pack(request.key.clone(), &rect) {
            Some(frame) => placements.push((frame.key, frame.frame)),
            None => {
                return Err(Error::PackingOverflow {
                    requested: requests.len(),
                    packed: placements.len(),
                    size,
                });
            }
        }
    }
    tracing::debug!("Packed {} regions into a {}x{} page", placements.len(), size, size);
    Ok(PackedPage { size, placements })
}
