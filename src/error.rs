use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tilewatch operations.
#[derive(Debug, Error)]
pub enum TilewatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported file type: {path} (accepted: .png, .jpg, .jpeg, .tiff, .bmp, .gif)")]
    UnsupportedFileType { path: PathBuf },

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to parse detections from {path}: {source}")]
    DetectionJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write detections to {path}: {source}")]
    DetectionJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inference backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error("No inference backend configured (set --backend-cmd or backend.command)")]
    MissingBackend,

    #[error("Request to {url} failed: {message}")]
    Remote { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    RemoteStatus { url: String, status: u16 },

    #[error("Failed to watch folder: {0}")]
    Watch(#[from] notify::Error),

    #[error("Failed to install Ctrl+C handler: {0}")]
    InterruptHandler(#[from] ctrlc::Error),

    #[error("{failed} of {total} image(s) failed")]
    BatchFailed { failed: usize, total: usize },
}
