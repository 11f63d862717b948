#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use tilewatch::detection::{BBoxXYXY, Detection, Local};
use tilewatch::tiling::TilingOptions;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Image dimensions, including degenerate ones (0 and 1 pixel).
pub fn arb_dimensions() -> BoxedStrategy<(u32, u32)> {
    (0u32..=3000, 0u32..=3000).boxed()
}

/// Valid tiling options: small segments keep grids dense, overlap below 1.
pub fn arb_tiling_options() -> BoxedStrategy<TilingOptions> {
    (1u32..=700, 0u16..1000)
        .prop_map(|(segment_size, permille)| {
            TilingOptions::new(segment_size, f64::from(permille) / 1000.0)
        })
        .boxed()
}

/// Integer-valued local detections, so shifted coordinates compare exactly.
pub fn arb_local_detections(max: usize) -> BoxedStrategy<Vec<Detection<Local>>> {
    proptest::collection::vec(
        (0u32..640, 0u32..640, 1u32..200, 1u32..200, 0u16..=1000, 0u32..80),
        0..=max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(x, y, w, h, score, class)| {
                let (x, y) = (f64::from(x), f64::from(y));
                Detection::new(
                    BBoxXYXY::from_xyxy(x, y, x + f64::from(w), y + f64::from(h)),
                    f64::from(score) / 1000.0,
                    class,
                )
            })
            .collect()
    })
    .boxed()
}
