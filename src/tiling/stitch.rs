//! Translating per-tile detections back into image coordinates.

use crate::detection::{Detection, Global, Local};

use super::Tile;

/// Converts a tile's detections into image coordinates.
///
/// Pure and order-preserving. Nothing is dropped, merged, clamped or
/// re-scored; two tiles that both see an object both report it.
pub fn to_global(local: &[Detection<Local>], tile: &Tile) -> Vec<Detection<Global>> {
    to_global_at(local, tile.x_offset, tile.y_offset)
}

/// Same as [`to_global`], for callers that only have the offset.
pub fn to_global_at(
    local: &[Detection<Local>],
    x_offset: u32,
    y_offset: u32,
) -> Vec<Detection<Global>> {
    local
        .iter()
        .map(|detection| detection.to_global(x_offset, y_offset))
        .collect()
}
