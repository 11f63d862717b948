//! Fuzz target for the tile grid layout.
//!
//! Checks that every tile of every valid layout lies inside the image.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tilewatch::tiling::{TileGrid, TilingOptions};

fuzz_target!(|input: (u32, u32, u32, f64)| {
    let (width, height, segment_size, overlap_portion) = input;
    let opts = TilingOptions::new(segment_size, overlap_portion);
    let Ok(grid) = TileGrid::new(width, height, &opts) else {
        return;
    };
    // Huge images with tiny strides would only test the allocator.
    if grid.len() > 1 << 16 {
        return;
    }

    for origin in grid.origins() {
        assert!(u64::from(origin.x) + u64::from(grid.tile_width()) <= u64::from(width));
        assert!(u64::from(origin.y) + u64::from(grid.tile_height()) <= u64::from(height));
    }
});
