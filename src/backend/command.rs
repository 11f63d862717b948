//! A backend that shells out to an external detector program.
//!
//! Protocol, per image: the image is PNG-encoded on the program's stdin;
//! the program writes a JSON array of detections
//! (`{"bbox": [x1, y1, x2, y2], "score": f, "pred_class": n}`) to stdout
//! and exits 0. Anything on stderr is only used for error reporting.

use std::ffi::OsString;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{DynamicImage, ImageFormat};

use super::{InferenceBackend, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::detection::io_json::from_json_slice;
use crate::detection::{Detection, Local};
use crate::error::TilewatchError;

/// Environment variable through which the child learns the threshold.
pub const CONFIDENCE_THRESHOLD_ENV: &str = "TILEWATCH_CONFIDENCE_THRESHOLD";

/// Runs a detector program once per image.
#[derive(Clone, Debug)]
pub struct CommandBackend {
    program: OsString,
    args: Vec<OsString>,
    confidence_threshold: f64,
    name: String,
}

impl CommandBackend {
    pub fn new(program: impl Into<OsString>) -> Self {
        let program = program.into();
        let name = program.to_string_lossy().into_owned();
        Self {
            program,
            args: Vec::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            name,
        }
    }

    /// Appends arguments passed to the program on every invocation.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Detections scoring below `threshold` are discarded.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn error(&self, message: impl Into<String>) -> TilewatchError {
        TilewatchError::Backend {
            backend: self.name.clone(),
            message: message.into(),
        }
    }
}

impl InferenceBackend for CommandBackend {
    fn infer(&self, image: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> {
        let png = encode_png(image).map_err(|source| self.error(format!("PNG encode: {source}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(CONFIDENCE_THRESHOLD_ENV, self.confidence_threshold.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.error(format!("failed to start: {source}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.error("stdin was not captured"))?;

        // Feed stdin from a second thread so a child that starts writing
        // before it has read everything cannot deadlock us.
        let (output, write_result) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(&png));
            let output = child.wait_with_output();
            (output, writer.join())
        });

        let output = output.map_err(|source| self.error(format!("wait failed: {source}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.error(format!("exited with {}: {}", output.status, stderr.trim())));
        }
        match write_result {
            Ok(Ok(())) => {}
            // The child may legitimately stop reading once it has what it needs.
            Ok(Err(source)) if source.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(source)) => return Err(self.error(format!("writing image: {source}"))),
            Err(_) => return Err(self.error("stdin writer panicked")),
        }

        let mut detections: Vec<Detection<Local>> = from_json_slice(&output.stdout)
            .map_err(|source| self.error(format!("invalid detection JSON on stdout: {source}")))?;
        detections.retain(|detection| detection.score >= self.confidence_threshold);

        log::debug!(
            "{} returned {} detection(s) for a {}x{} image",
            self.name,
            detections.len(),
            image.width(),
            image.height()
        );
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}
