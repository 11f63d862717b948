//! The detection record exchanged between backends, the stitcher and the
//! JSON output.

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYXY;
use super::class_id::ClassId;
use super::space::{Global, Local};

/// A single predicted object instance.
///
/// Serializes as `{"bbox": [x1, y1, x2, y2], "score": f, "pred_class": n}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Detection<TSpace> {
    /// Bounding box in `TSpace` coordinates.
    pub bbox: BBoxXYXY<TSpace>,

    /// Confidence score reported by the backend, nominally in [0, 1].
    pub score: f64,

    /// Predicted class.
    #[serde(rename = "pred_class")]
    pub class_id: ClassId,
}

impl<TSpace> Detection<TSpace> {
    /// Creates a new detection.
    pub fn new(bbox: BBoxXYXY<TSpace>, score: f64, class_id: impl Into<ClassId>) -> Self {
        Self {
            bbox,
            score,
            class_id: class_id.into(),
        }
    }

    /// True if the box and the score are all finite numbers.
    ///
    /// JSON has no NaN or infinity, so anything else cannot be written out.
    pub fn is_finite(&self) -> bool {
        self.bbox.is_finite() && self.score.is_finite()
    }
}

impl Detection<Local> {
    /// Lifts a tile-local detection into image space.
    ///
    /// Score and class are copied unchanged.
    pub fn to_global(&self, x_offset: u32, y_offset: u32) -> Detection<Global> {
        Detection {
            bbox: self.bbox.to_global(x_offset, y_offset),
            score: self.score,
            class_id: self.class_id,
        }
    }
}
