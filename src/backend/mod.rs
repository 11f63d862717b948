//! The seam between tilewatch and whatever model does the detecting.
//!
//! The model is opaque: it receives one image (a whole image or a single
//! tile) and returns detections in that image's own pixel space. Anything
//! implementing [`InferenceBackend`] can be plugged into a
//! [`Detector`](crate::orchestrator::Detector), including plain closures,
//! which is what the tests use.

mod command;

pub use command::{CommandBackend, CONFIDENCE_THRESHOLD_ENV};

use image::DynamicImage;

use crate::detection::{Detection, Local};
use crate::error::TilewatchError;

/// Confidence threshold used when nothing else is configured.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// An object detector that works on a single image.
///
/// Backends are constructed once at startup and shared between the watch
/// loop or server tasks, hence `Send + Sync` and `&self`.
pub trait InferenceBackend: Send + Sync {
    /// Runs detection on `image`, returning boxes relative to its top-left
    /// corner.
    fn infer(&self, image: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError>;

    /// Human-readable name used in logs and error messages.
    fn name(&self) -> &str;
}

impl<F> InferenceBackend for F
where
    F: Fn(&DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> + Send + Sync,
{
    fn infer(&self, image: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> {
        self(image)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
