//! Bounding box types in canonical XYXY format.

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::space::{Global, Local};

/// An axis-aligned bounding box in XYXY format (x1, y1, x2, y2).
///
/// The `TSpace` parameter should be either [`Local`] or [`Global`]. A
/// backend only ever produces `BBoxXYXY<Local>`, and the only way to get a
/// `BBoxXYXY<Global>` out of one is [`BBoxXYXY::to_global`].
///
/// Note: This type does NOT enforce that min < max. Backends are opaque and
/// their boxes are passed through as reported.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from min and max coordinates.
    #[inline]
    pub fn new(min: Coord<TSpace>, max: Coord<TSpace>) -> Self {
        Self { min, max }
    }

    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min: Coord::new(x1, y1),
            max: Coord::new(x2, y2),
        }
    }

    #[inline]
    pub fn x1(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn y1(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn x2(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn y2(&self) -> f64 {
        self.max.y
    }

    /// Returns the box as `[x1, y1, x2, y2]`.
    #[inline]
    pub fn to_array(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

impl BBoxXYXY<Local> {
    /// Translates a tile-local box into image coordinates.
    ///
    /// Both corners are shifted by the tile offset. Nothing is clamped: a
    /// box that pokes past the tile edge keeps doing so in image space.
    #[inline]
    pub fn to_global(&self, x_offset: u32, y_offset: u32) -> BBoxXYXY<Global> {
        let (dx, dy) = (f64::from(x_offset), f64::from(y_offset));
        BBoxXYXY::new(
            self.min.offset_into(dx, dy),
            self.max.offset_into(dx, dy),
        )
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("x1", &self.min.x)
            .field("y1", &self.min.y)
            .field("x2", &self.max.x)
            .field("y2", &self.max.y)
            .finish()
    }
}

// Serialized as a flat `[x1, y1, x2, y2]` array, without TSpace bounds.
impl<TSpace> Serialize for BBoxXYXY<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for BBoxXYXY<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x1, y1, x2, y2] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(BBoxXYXY::from_xyxy(x1, y1, x2, y2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_xyxy() {
        let bbox: BBoxXYXY<Local> = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert_eq!(bbox.x1(), 10.0);
        assert_eq!(bbox.y1(), 20.0);
        assert_eq!(bbox.x2(), 100.0);
        assert_eq!(bbox.y2(), 80.0);
    }

    #[test]
    fn test_bbox_is_finite() {
        let ok: BBoxXYXY<Local> = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert!(ok.is_finite());

        let nan: BBoxXYXY<Local> = BBoxXYXY::from_xyxy(10.0, 20.0, f64::NAN, 80.0);
        assert!(!nan.is_finite());
    }

    #[test]
    fn test_to_global_shifts_both_corners() {
        let local: BBoxXYXY<Local> = BBoxXYXY::from_xyxy(10.0, 10.0, 20.0, 20.0);
        let global = local.to_global(100, 50);
        assert_eq!(global.to_array(), [110.0, 60.0, 120.0, 70.0]);
    }

    #[test]
    fn test_to_global_with_zero_offset_is_identity() {
        let local: BBoxXYXY<Local> = BBoxXYXY::from_xyxy(1.5, 2.25, 30.0, 40.75);
        assert_eq!(local.to_global(0, 0).to_array(), local.to_array());
    }

    #[test]
    fn test_serializes_as_flat_array() {
        let bbox: BBoxXYXY<Global> = BBoxXYXY::from_xyxy(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&bbox).expect("serialize bbox");
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");

        let restored: BBoxXYXY<Global> = serde_json::from_str(&json).expect("parse bbox");
        assert_eq!(restored, bbox);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let result: Result<BBoxXYXY<Global>, _> = serde_json::from_str("[1.0, 2.0, 3.0]");
        assert!(result.is_err());
    }
}
