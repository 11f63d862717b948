//! Running a backend over an image of any size.
//!
//! [`detect_tiled`] is the tiled path: tile, infer per tile, stitch, and
//! concatenate in tile order. [`Detector`] wraps a backend together with an
//! optional tiling stage so callers do not need to know which one they got.

use std::sync::Arc;

use image::DynamicImage;

use crate::backend::InferenceBackend;
use crate::detection::{Detection, Global, Local};
use crate::error::TilewatchError;
use crate::tiling::stitch::{to_global, to_global_at};
use crate::tiling::{tile_image, TilingOptions};

/// Detects objects in `image` by running `backend` over every tile.
///
/// Output order is all of tile 0's detections (in backend order), then
/// tile 1's, and so on, with tiles in row-major order. There is no
/// cross-tile merging: an object inside an overlap is reported once per
/// tile that sees it.
///
/// # Errors
/// Invalid `options` yield [`TilewatchError::Configuration`]. The first
/// backend failure aborts the whole call; no partial result is returned.
/// A detection with a NaN or infinite coordinate or score counts as a
/// backend failure.
pub fn detect_tiled<B>(
    image: &DynamicImage,
    backend: &B,
    options: &TilingOptions,
) -> Result<Vec<Detection<Global>>, TilewatchError>
where
    B: InferenceBackend + ?Sized,
{
    let tiles = tile_image(image, options)?;
    log::debug!(
        "{}x{} image split into {} tile(s) of {}px, overlap {}",
        image.width(),
        image.height(),
        tiles.len(),
        options.segment_size,
        options.overlap_portion
    );

    let mut detections = Vec::new();
    for (index, tile) in tiles.iter().enumerate() {
        let local = backend.infer(&tile.image).inspect_err(|err| {
            log::warn!(
                "tile {} at ({}, {}) failed in {}: {}",
                index,
                tile.x_offset,
                tile.y_offset,
                backend.name(),
                err
            );
        })?;
        ensure_finite(backend, &local)?;
        detections.extend(to_global(&local, tile));
    }

    Ok(detections)
}

fn ensure_finite<B>(backend: &B, local: &[Detection<Local>]) -> Result<(), TilewatchError>
where
    B: InferenceBackend + ?Sized,
{
    match local.iter().position(|detection| !detection.is_finite()) {
        Some(index) => Err(TilewatchError::Backend {
            backend: backend.name().to_string(),
            message: format!("detection {index} has a non-finite box or score"),
        }),
        None => Ok(()),
    }
}

/// A backend plus an optional tiling stage.
///
/// Cheap to clone; the backend is shared.
#[derive(Clone)]
pub struct Detector {
    backend: Arc<dyn InferenceBackend>,
    tiling: Option<TilingOptions>,
}

impl Detector {
    /// A detector that tiles with the given options.
    ///
    /// # Errors
    /// Rejects invalid tiling options up front, so a misconfigured process
    /// fails at startup instead of on the first image.
    pub fn tiled(
        backend: Arc<dyn InferenceBackend>,
        options: TilingOptions,
    ) -> Result<Self, TilewatchError> {
        options.stride()?;
        Ok(Self {
            backend,
            tiling: Some(options),
        })
    }

    /// A detector that hands whole images to the backend.
    pub fn untiled(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            tiling: None,
        }
    }

    pub fn tiling(&self) -> Option<&TilingOptions> {
        self.tiling.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Detects objects in `image`, returning boxes in image coordinates.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection<Global>>, TilewatchError> {
        match &self.tiling {
            Some(options) => detect_tiled(image, self.backend.as_ref(), options),
            None => {
                let local = self.backend.infer(image)?;
                ensure_finite(self.backend.as_ref(), &local)?;
                Ok(to_global_at(&local, 0, 0))
            }
        }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("backend", &self.backend.name())
            .field("tiling", &self.tiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BBoxXYXY;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    fn fixed_box(_: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> {
        Ok(vec![Detection::new(
            BBoxXYXY::from_xyxy(10.0, 10.0, 20.0, 20.0),
            0.9,
            1u32,
        )])
    }

    #[test]
    fn test_one_detection_per_tile_in_tile_order() {
        let detections =
            detect_tiled(&blank(1000, 700), &fixed_box, &TilingOptions::new(640, 0.5))
                .expect("detect");

        let origins: Vec<(f64, f64)> = detections
            .iter()
            .map(|d| (d.bbox.x1() - 10.0, d.bbox.y1() - 10.0))
            .collect();
        assert_eq!(
            origins,
            vec![
                (0.0, 0.0),
                (320.0, 0.0),
                (360.0, 0.0),
                (0.0, 60.0),
                (320.0, 60.0),
                (360.0, 60.0)
            ]
        );
    }

    #[test]
    fn test_backend_failure_aborts_whole_image() {
        let calls = AtomicUsize::new(0);
        let failing_second = |_: &DynamicImage| -> Result<Vec<Detection<Local>>, TilewatchError> {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(TilewatchError::Backend {
                    backend: "stub".into(),
                    message: "boom".into(),
                });
            }
            fixed_box(&blank(1, 1))
        };

        let result = detect_tiled(&blank(1000, 700), &failing_second, &TilingOptions::default());

        assert!(matches!(result, Err(TilewatchError::Backend { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "stops at the failing tile");
    }

    #[test]
    fn test_configuration_error_propagates() {
        let result = detect_tiled(&blank(10, 10), &fixed_box, &TilingOptions::new(640, 1.0));
        assert!(matches!(result, Err(TilewatchError::Configuration(_))));
    }

    #[test]
    fn test_detector_rejects_bad_options_at_construction() {
        let result = Detector::tiled(Arc::new(fixed_box), TilingOptions::new(0, 0.5));
        assert!(matches!(result, Err(TilewatchError::Configuration(_))));
    }

    #[test]
    fn test_untiled_detector_calls_backend_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let backend = move |image: &DynamicImage| -> Result<Vec<Detection<Local>>, TilewatchError> {
            counter.fetch_add(1, Ordering::SeqCst);
            fixed_box(image)
        };
        let detector = Detector::untiled(Arc::new(backend));

        let detections = detector.detect(&blank(2000, 2000)).expect("detect");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(detections[0].bbox.to_array(), [10.0, 10.0, 20.0, 20.0]);
        assert!(detector.tiling().is_none());
    }

    #[test]
    fn test_multiple_detections_keep_backend_order_within_tile() {
        // The n-th call returns three detections whose class encodes (call, position)
        // and whose scores are deliberately unsorted.
        fn batch(call: u32) -> Vec<Detection<Local>> {
            [(0.3, 5.0), (0.9, 40.0), (0.6, 20.0)]
                .into_iter()
                .enumerate()
                .map(|(k, (score, x))| {
                    Detection::new(
                        BBoxXYXY::from_xyxy(x, x, x + 8.0, x + 8.0),
                        score,
                        call * 10 + k as u32,
                    )
                })
                .collect()
        }

        let calls = AtomicUsize::new(0);
        let backend = |_: &DynamicImage| -> Result<Vec<Detection<Local>>, TilewatchError> {
            Ok(batch(calls.fetch_add(1, Ordering::SeqCst) as u32))
        };
        let image = blank(1000, 700);
        let opts = TilingOptions::default();

        let detections = detect_tiled(&image, &backend, &opts).expect("detect");

        let expected: Vec<Detection<Global>> = tile_image(&image, &opts)
            .expect("tile")
            .iter()
            .enumerate()
            .flat_map(|(i, tile)| to_global(&batch(i as u32), tile))
            .collect();
        assert_eq!(detections.len(), 18);
        assert_eq!(detections, expected);

        let classes: Vec<u32> = detections.iter().map(|d| d.class_id.as_u32()).collect();
        assert_eq!(&classes[..6], &[0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_non_finite_detection_is_backend_error() {
        let nan_box = |_: &DynamicImage| -> Result<Vec<Detection<Local>>, TilewatchError> {
            Ok(vec![
                Detection::new(BBoxXYXY::from_xyxy(1.0, 1.0, 2.0, 2.0), 0.9, 0u32),
                Detection::new(BBoxXYXY::from_xyxy(f64::NAN, 1.0, 2.0, 2.0), 0.9, 0u32),
            ])
        };
        let infinite_score = |_: &DynamicImage| -> Result<Vec<Detection<Local>>, TilewatchError> {
            Ok(vec![Detection::new(
                BBoxXYXY::from_xyxy(1.0, 1.0, 2.0, 2.0),
                f64::INFINITY,
                0u32,
            )])
        };

        let tiled = detect_tiled(&blank(1000, 700), &nan_box, &TilingOptions::default());
        match tiled {
            Err(TilewatchError::Backend { message, .. }) => assert!(message.contains("detection 1")),
            other => panic!("expected backend error, got {other:?}"),
        }

        let untiled = Detector::untiled(Arc::new(infinite_score)).detect(&blank(10, 10));
        assert!(matches!(untiled, Err(TilewatchError::Backend { .. })));
    }
}
