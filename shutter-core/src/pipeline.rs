//! Capture pipeline: persist received payloads as files and hand them, or files that
//! appear in a watched directory, to the upload sink.
//!
//! Both entry points may run at the same time from different threads. Each call works on
//! its own path; the only shared state is read-only configuration.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::upload::{RemoteId, UploadSink};

/// Case-insensitive set of file extensions accepted from the directory watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(["jpg", "jpeg", "png"])
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where received payloads are written.
    pub capture_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    pub watch_filter: ExtensionFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_dir: PathBuf::from("images"),
            file_prefix: "received_image_".to_string(),
            file_extension: "jpg".to_string(),
            watch_filter: ExtensionFilter::default(),
        }
    }
}

/// A payload written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Timestamp-derived name, without directory.
    pub id: String,
    pub bytes: Vec<u8>,
    pub stored_path: PathBuf,
    /// Remote id if the upload succeeded; None after a logged failure.
    pub uploaded: Option<RemoteId>,
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

pub struct CapturePipeline<S> {
    config: PipelineConfig,
    sink: S,
    clock: Clock,
}

impl<S: UploadSink> CapturePipeline<S> {
    pub fn new(config: PipelineConfig, sink: S) -> Self {
        Self::with_clock(config, sink, unix_seconds)
    }

    /// Use `clock` (unix seconds) for capture names.
    pub fn with_clock(
        config: PipelineConfig,
        sink: S,
        clock: impl Fn() -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            sink,
            clock: Box::new(clock),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name for a capture taken at `secs`. Two captures in the same second share a name.
    pub fn capture_name(&self, secs: u64) -> String {
        format!(
            "{}{}.{}",
            self.config.file_prefix, secs, self.config.file_extension
        )
    }

    /// Write `bytes` verbatim to a timestamp-named file, then upload it.
    /// An upload failure is logged, not returned.
    pub fn on_payload_received(&self, bytes: Vec<u8>) -> io::Result<CapturedImage> {
        let id = self.capture_name((self.clock)());
        std::fs::create_dir_all(&self.config.capture_dir)?;
        let stored_path = self.config.capture_dir.join(&id);
        std::fs::write(&stored_path, &bytes)?;
        tracing::info!(path = %stored_path.display(), bytes = bytes.len(), "image saved");

        let uploaded = self.dispatch_upload(&stored_path);
        Ok(CapturedImage {
            id,
            bytes,
            stored_path,
            uploaded,
        })
    }

    /// Handle a newly created directory entry. Returns true if it passed the filter
    /// and was handed to the sink.
    pub fn on_file_created(&self, path: &Path) -> bool {
        if path.is_dir() {
            return false;
        }
        if !self.config.watch_filter.matches(path) {
            tracing::trace!(path = %path.display(), "ignoring file with unaccepted extension");
            return false;
        }
        tracing::info!(path = %path.display(), "new image detected");
        self.dispatch_upload(path);
        true
    }

    /// Upload one file. Failures are final for that file and only logged.
    fn dispatch_upload(&self, path: &Path) -> Option<RemoteId> {
        match self.sink.upload(path) {
            Ok(id) => {
                tracing::info!(path = %path.display(), remote_id = %id, "upload succeeded");
                Some(id)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "upload failed");
                None
            }
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
