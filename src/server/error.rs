//! HTTP error mapping for the upload endpoint.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::TilewatchError;
use crate::ingest::ALLOWED_EXTENSIONS;

/// Everything that can go wrong while answering an upload.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing multipart field 'img'")]
    MissingField,

    #[error("Uploaded file has no usable file name")]
    MissingFileName,

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error(transparent)]
    Pipeline(TilewatchError),

    #[error("Detection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<TilewatchError> for ServerError {
    fn from(err: TilewatchError) -> Self {
        match err {
            TilewatchError::ImageDecode(source) => Self::Decode(source),
            TilewatchError::UnsupportedFileType { path } => {
                Self::UnsupportedFileType(path.display().to_string())
            }
            other => Self::Pipeline(other),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingField | Self::MissingFileName | Self::Decode(_) => StatusCode::BAD_REQUEST,
            // Covers both malformed bodies (400) and the upload limit (413).
            Self::Multipart(err) => err.status(),
            Self::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Pipeline(_) | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::UnsupportedFileType(name) => format!(
                "Invalid file type: {}. Accepted file types are: {}",
                name,
                ALLOWED_EXTENSIONS
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            other => other.to_string(),
        };

        if status.is_server_error() {
            log::error!("{}", message);
        } else {
            log::warn!("Rejected upload: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
