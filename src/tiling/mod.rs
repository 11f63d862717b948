//! Splitting large images into overlapping, fixed-size tiles.
//!
//! Detection models are trained on a fixed input size (640×640 is common)
//! and small objects vanish when a large image is scaled down to fit. The
//! tiler instead cuts the image into a grid of model-sized windows that
//! overlap by a configurable fraction, so every object is seen at native
//! resolution by at least one tile.
//!
//! # Boundary policy
//!
//! Windows start at multiples of the stride. A window that would run past
//! the right or bottom edge is shifted back so that it ends exactly on the
//! edge. The last row/column therefore overlaps its neighbour by more than
//! the requested fraction, but no tile is padded and no tile samples
//! outside the image. Tiles are only smaller than `segment_size` along an
//! axis where the image itself is smaller.

pub mod stitch;

use image::DynamicImage;

use crate::error::TilewatchError;

/// Tile size used when nothing else is configured.
pub const DEFAULT_SEGMENT_SIZE: u32 = 640;

/// Overlap fraction used when nothing else is configured.
pub const DEFAULT_OVERLAP_PORTION: f64 = 0.5;

/// Parameters controlling the tile grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilingOptions {
    /// Edge length of a square tile in pixels.
    pub segment_size: u32,

    /// Fraction of `segment_size` shared by adjacent tiles, in `[0, 1)`.
    pub overlap_portion: f64,
}

impl Default for TilingOptions {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            overlap_portion: DEFAULT_OVERLAP_PORTION,
        }
    }
}

impl TilingOptions {
    pub fn new(segment_size: u32, overlap_portion: f64) -> Self {
        Self {
            segment_size,
            overlap_portion,
        }
    }

    /// Number of pixels adjacent tiles share: `floor(segment_size * overlap_portion)`.
    pub fn overlap_pixels(&self) -> u32 {
        (f64::from(self.segment_size) * self.overlap_portion).floor() as u32
    }

    /// Distance between the starts of adjacent tiles.
    ///
    /// # Errors
    /// Returns [`TilewatchError::Configuration`] if the options are invalid
    /// or would produce a stride below one pixel.
    pub fn stride(&self) -> Result<u32, TilewatchError> {
        self.validate()?;
        let stride = self.segment_size.saturating_sub(self.overlap_pixels());
        if stride == 0 {
            return Err(TilewatchError::Configuration(format!(
                "overlap_portion {} leaves no stride for segment_size {}",
                self.overlap_portion, self.segment_size
            )));
        }
        Ok(stride)
    }

    /// Checks the options without computing anything else.
    pub fn validate(&self) -> Result<(), TilewatchError> {
        if self.segment_size == 0 {
            return Err(TilewatchError::Configuration(
                "segment_size must be positive".to_string(),
            ));
        }
        if !self.overlap_portion.is_finite()
            || self.overlap_portion < 0.0
            || self.overlap_portion >= 1.0
        {
            return Err(TilewatchError::Configuration(format!(
                "overlap_portion must be in [0, 1), got {}",
                self.overlap_portion
            )));
        }
        Ok(())
    }
}

/// Position of one tile within the grid and within the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileOrigin {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
}

/// The grid layout for one image, derived from its size and the options.
///
/// Nothing here touches pixels, which keeps the layout cheap to compute
/// and easy to test on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    image_width: u32,
    image_height: u32,
    segment_size: u32,
    stride: u32,
    rows: u32,
    cols: u32,
}

impl TileGrid {
    /// Computes the layout for an image of `width × height` pixels.
    ///
    /// # Errors
    /// Returns [`TilewatchError::Configuration`] for invalid options. A
    /// zero-area image is not an error; it yields an empty grid.
    pub fn new(width: u32, height: u32, options: &TilingOptions) -> Result<Self, TilewatchError> {
        let stride = options.stride()?;
        let segment_size = options.segment_size;

        let (rows, cols) = if width == 0 || height == 0 {
            (0, 0)
        } else {
            (
                axis_count(height, segment_size, stride),
                axis_count(width, segment_size, stride),
            )
        };

        Ok(Self {
            image_width: width,
            image_height: height,
            segment_size,
            stride,
            rows,
            cols,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of every tile in the grid.
    pub fn tile_width(&self) -> u32 {
        self.segment_size.min(self.image_width)
    }

    /// Height of every tile in the grid.
    pub fn tile_height(&self) -> u32 {
        self.segment_size.min(self.image_height)
    }

    /// Returns the origin of the tile at `(row, col)`.
    pub fn origin(&self, row: u32, col: u32) -> TileOrigin {
        TileOrigin {
            row,
            col,
            x: axis_start(col, self.image_width, self.segment_size, self.stride),
            y: axis_start(row, self.image_height, self.segment_size, self.stride),
        }
    }

    /// Iterates tile origins in row-major order (top to bottom, left to right).
    pub fn origins(&self) -> impl Iterator<Item = TileOrigin> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.origin(row, col)))
    }
}

fn axis_count(dimension: u32, segment_size: u32, stride: u32) -> u32 {
    if dimension <= segment_size {
        1
    } else {
        (dimension - segment_size).div_ceil(stride) + 1
    }
}

fn axis_start(index: u32, dimension: u32, segment_size: u32, stride: u32) -> u32 {
    let start = u64::from(index) * u64::from(stride);
    if start + u64::from(segment_size) > u64::from(dimension) {
        dimension.saturating_sub(segment_size)
    } else {
        start as u32
    }
}

/// A rectangular crop of a larger image, with its offset in that image.
#[derive(Clone, Debug)]
pub struct Tile {
    pub x_offset: u32,
    pub y_offset: u32,
    pub image: DynamicImage,
}

/// Cuts `image` into tiles, in row-major order.
///
/// Calling this twice with the same inputs yields the same sequence.
///
/// # Errors
/// Returns [`TilewatchError::Configuration`] for invalid options.
pub fn tile_image(image: &DynamicImage, options: &TilingOptions) -> Result<Vec<Tile>, TilewatchError> {
    let grid = TileGrid::new(image.width(), image.height(), options)?;
    let (tile_width, tile_height) = (grid.tile_width(), grid.tile_height());

    Ok(grid
        .origins()
        .map(|origin| Tile {
            x_offset: origin.x,
            y_offset: origin.y,
            image: image.crop_imm(origin.x, origin.y, tile_width, tile_height),
        })
        .collect())
}
