//! Upload sink: push a finished local file to remote storage.

use std::fmt;
use std::io;
use std::path::Path;

/// Identifier assigned by remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    #[error("storage rejected upload (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Accepts finished files. Called from the receive loop and the directory watch at once,
/// always for distinct paths.
pub trait UploadSink: Send + Sync {
    fn upload(&self, path: &Path) -> Result<RemoteId, UploadError>;
}

impl<T: UploadSink + ?Sized> UploadSink for std::sync::Arc<T> {
    fn upload(&self, path: &Path) -> Result<RemoteId, UploadError> {
        (**self).upload(path)
    }
}

/// Remote storage client.
pub trait RemoteStorage: Send + Sync {
    fn create_file(
        &self,
        name: &str,
        parent_folder_id: &str,
        content: Vec<u8>,
    ) -> Result<RemoteId, UploadError>;
}

/// Uploads each file under one remote folder, named after its local base name.
pub struct StorageSink<R> {
    storage: R,
    parent_folder_id: String,
}

impl<R: RemoteStorage> StorageSink<R> {
    pub fn new(storage: R, parent_folder_id: impl Into<String>) -> Self {
        Self {
            storage,
            parent_folder_id: parent_folder_id.into(),
        }
    }
}

impl<R: RemoteStorage> UploadSink for StorageSink<R> {
    fn upload(&self, path: &Path) -> Result<RemoteId, UploadError> {
        let content = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        self.storage
            .create_file(&name, &self.parent_folder_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStorage {
        calls: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl RemoteStorage for RecordingStorage {
        fn create_file(
            &self,
            name: &str,
            parent_folder_id: &str,
            content: Vec<u8>,
        ) -> Result<RemoteId, UploadError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((name.to_string(), parent_folder_id.to_string(), content));
            Ok(RemoteId(format!("id-{}", calls.len())))
        }
    }

    #[test]
    fn uploads_with_base_name_and_folder() {
        let dir = std::env::temp_dir().join(format!("shutter-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("received_image_1700000000.jpg");
        std::fs::write(&path, b"jpegbytes").unwrap();

        let sink = StorageSink::new(RecordingStorage::default(), "folder-1");
        let id = sink.upload(&path).unwrap();
        assert_eq!(id, RemoteId("id-1".into()));

        let calls = sink.storage.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "received_image_1700000000.jpg");
        assert_eq!(calls[0].1, "folder-1");
        assert_eq!(calls[0].2, b"jpegbytes");
        drop(calls);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let sink = StorageSink::new(RecordingStorage::default(), "folder-1");
        let err = sink
            .upload(Path::new("/nonexistent/shutter/none.jpg"))
            .unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
        assert!(sink.storage.calls.lock().unwrap().is_empty());
    }
}
