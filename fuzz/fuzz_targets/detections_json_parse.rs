//! Fuzz target for detection JSON parsing.
//!
//! This is the parser that reads backend stdout, so it sees whatever an
//! external program prints.
//!
//! Run with:
//!   cargo +nightly fuzz run detections_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use tilewatch::detection::io_json::from_json_slice;
use tilewatch::detection::Local;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_json_slice::<Local>(data);
});
