//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between tile-local and whole-image coordinates at compile time.

use std::fmt;

/// Marker type for coordinates relative to a tile's own origin.
///
/// This is the space an inference backend reports in: (0, 0) is the
/// top-left pixel of the tile it was given.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Local {}

/// Marker type for coordinates relative to the original image's origin.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Global {}

impl fmt::Debug for Local {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Global {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
