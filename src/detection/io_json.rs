//! JSON serialization for detection lists.
//!
//! One file per processed image, holding a pretty-printed array of
//! detections in image coordinates. The same encoding is used for HTTP
//! response bodies and for the stdout of command backends.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::model::Detection;
use crate::error::TilewatchError;

/// Returns where the detections for `source` are written: the same file
/// stem with a `.json` extension, inside `output_dir`.
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    let mut file_name = stem;
    file_name.push(".json");
    output_dir.join(file_name)
}

/// Reads a detection list from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_detections_json<TSpace>(path: &Path) -> Result<Vec<Detection<TSpace>>, TilewatchError> {
    let file = File::open(path).map_err(TilewatchError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| TilewatchError::DetectionJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a detection list to a JSON file, indented for readability.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_detections_json<TSpace>(
    path: &Path,
    detections: &[Detection<TSpace>],
) -> Result<(), TilewatchError> {
    let file = File::create(path).map_err(TilewatchError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, detections).map_err(|source| {
        TilewatchError::DetectionJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(TilewatchError::Io)
}

/// Reads a detection list from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_json_str<TSpace>(json: &str) -> Result<Vec<Detection<TSpace>>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads a detection list from a JSON byte slice.
///
/// Useful for fuzzing and for parsing process output without UTF-8
/// validation first.
pub fn from_json_slice<TSpace>(bytes: &[u8]) -> Result<Vec<Detection<TSpace>>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes a detection list to a pretty-printed JSON string.
pub fn to_json_string<TSpace>(detections: &[Detection<TSpace>]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(detections)
}
