//! The detection server: `POST /` with a multipart image upload.
//!
//! The request carries one file field named `img`. The file name is checked
//! against the accepted extensions before the body is read; the image is
//! then decoded and run through the [`Detector`] on the blocking pool, and
//! the detections come back as a JSON array. When configured, the upload
//! and its detections are also written to disk.
//!
//! Two uploads with the same file name that arrive together write the same
//! paths; the last writer wins.

mod error;

pub use error::ServerError;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::detection::io_json::{output_path_for, write_detections_json};
use crate::detection::{Detection, Global};
use crate::error::TilewatchError;
use crate::ingest::is_allowed_image;
use crate::orchestrator::Detector;
use crate::IMAGE_FIELD;

/// Upload size limit used when nothing else is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Where the server keeps uploads and results, and how much it accepts.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Uploaded images are saved here under their own file name.
    pub input_dir: Option<PathBuf>,
    /// Detections are saved here as `<stem>.json`.
    pub output_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

struct AppState {
    detector: Detector,
    config: ServerConfig,
}

/// Builds the router. Exposed separately from [`serve`] so it can be driven
/// without a socket.
pub fn router(detector: Detector, config: ServerConfig) -> Router {
    let limit = config.max_upload_bytes;
    Router::new()
        .route("/", post(upload))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(Arc::new(AppState { detector, config }))
}

/// Binds `addr` and serves until the process exits.
pub async fn serve(
    addr: SocketAddr,
    detector: Detector,
    config: ServerConfig,
) -> Result<(), TilewatchError> {
    for dir in [&config.input_dir, &config.output_dir].into_iter().flatten() {
        std::fs::create_dir_all(dir)?;
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(detector, config)).await?;
    Ok(())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Detection<Global>>>, ServerError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(sanitize_file_name)
            .ok_or(ServerError::MissingFileName)?;
        if !is_allowed_image(Path::new(&file_name)) {
            return Err(ServerError::UnsupportedFileType(file_name));
        }

        let bytes = field.bytes().await?;
        let state = Arc::clone(&state);
        let detections =
            tokio::task::spawn_blocking(move || process_upload(&state, &file_name, &bytes))
                .await??;
        return Ok(Json(detections));
    }

    Err(ServerError::MissingField)
}

fn process_upload(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
) -> Result<Vec<Detection<Global>>, ServerError> {
    if let Some(input_dir) = &state.config.input_dir {
        std::fs::write(input_dir.join(file_name), bytes).map_err(TilewatchError::from)?;
    }

    log::info!("Processing image {}", file_name);
    let image = image::load_from_memory(bytes).map_err(ServerError::Decode)?;
    let detections = state.detector.detect(&image)?;

    if let Some(output_dir) = &state.config.output_dir {
        let output = output_path_for(Path::new(file_name), output_dir);
        write_detections_json(&output, &detections)?;
    }
    log::info!("...done.");

    Ok(detections)
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}
