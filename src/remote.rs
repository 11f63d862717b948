//! HTTP client for a remote tilewatch server.
//!
//! Used by the remote variant of the watch loop: images are uploaded to
//! `POST /` and the JSON detection array in the response is persisted
//! locally, exactly as if detection had run in-process.

use std::path::Path;
use std::time::Duration;

use ureq::unversioned::multipart::{Form, Part};
use url::Url;

use crate::detection::{Detection, Global};
use crate::error::TilewatchError;
use crate::IMAGE_FIELD;

/// Upper bound on one upload round trip, inference included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Uploads images to a detection server.
#[derive(Clone)]
pub struct RemoteClient {
    agent: ureq::Agent,
    url: Url,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl RemoteClient {
    pub fn new(url: Url) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: Url, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = config.into();
        Self { agent, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Uploads an in-memory image and returns the server's detections.
    ///
    /// # Errors
    /// [`TilewatchError::Remote`] for transport failures or an unreadable
    /// body, [`TilewatchError::RemoteStatus`] for any non-2xx response.
    pub fn upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Vec<Detection<Global>>, TilewatchError> {
        log::debug!("uploading {} ({} bytes) to {}", file_name, bytes.len(), self.url);
        let response = self.send(image_form(Part::bytes(bytes).file_name(file_name)))?;
        self.read_detections(response)
    }

    /// Streams `path` from disk and uploads it under its own file name.
    pub fn upload_file(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError> {
        log::debug!("uploading {} to {}", path.display(), self.url);
        let response = self.send(image_form(Part::file(path)?))?;
        self.read_detections(response)
    }

    /// Uploads `path` and returns the HTTP status code, whatever it is.
    pub fn post_file(&self, path: &Path) -> Result<u16, TilewatchError> {
        let response = self.send(image_form(Part::file(path)?))?;
        Ok(response.status().as_u16())
    }

    fn send(&self, form: Form<'_>) -> Result<ureq::http::Response<ureq::Body>, TilewatchError> {
        self.agent
            .post(self.url.as_str())
            .send(form)
            .map_err(|source| self.error(source.to_string()))
    }

    fn read_detections(
        &self,
        mut response: ureq::http::Response<ureq::Body>,
    ) -> Result<Vec<Detection<Global>>, TilewatchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TilewatchError::RemoteStatus {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .body_mut()
            .read_json::<Vec<Detection<Global>>>()
            .map_err(|source| self.error(format!("invalid detection JSON: {source}")))
    }

    fn error(&self, message: String) -> TilewatchError {
        TilewatchError::Remote {
            url: self.url.to_string(),
            message,
        }
    }
}

fn image_form(part: Part<'_>) -> Form<'_> {
    Form::new().part(IMAGE_FIELD, part)
}
