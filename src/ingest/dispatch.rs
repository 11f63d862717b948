//! Turning an accepted image path into detections.

use std::path::Path;

use crate::detection::{Detection, Global};
use crate::error::TilewatchError;
use crate::orchestrator::Detector;
#[cfg(feature = "remote")]
use crate::remote::RemoteClient;

/// Produces image-space detections for the image at a path.
pub trait Dispatch {
    fn dispatch(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError>;
}

impl<T: Dispatch + ?Sized> Dispatch for Box<T> {
    fn dispatch(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError> {
        (**self).dispatch(path)
    }
}

impl<T: Dispatch + ?Sized> Dispatch for &T {
    fn dispatch(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError> {
        (**self).dispatch(path)
    }
}

/// Decodes the image from disk and runs it through a [`Detector`].
#[derive(Clone, Debug)]
pub struct LocalDispatch {
    detector: Detector,
}

impl LocalDispatch {
    pub fn new(detector: Detector) -> Self {
        Self { detector }
    }
}

impl Dispatch for LocalDispatch {
    fn dispatch(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError> {
        let image = image::open(path).map_err(|source| TilewatchError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.detector.detect(&image)
    }
}

/// Uploads the image to a detection server and returns its answer.
#[cfg(feature = "remote")]
#[derive(Clone, Debug)]
pub struct RemoteDispatch {
    client: RemoteClient,
}

#[cfg(feature = "remote")]
impl RemoteDispatch {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[cfg(feature = "remote")]
impl Dispatch for RemoteDispatch {
    fn dispatch(&self, path: &Path) -> Result<Vec<Detection<Global>>, TilewatchError> {
        self.client.upload_file(path)
    }
}
