//! Remote storage on Google Drive v3 (multipart upload). The access token is read once
//! from the credentials file at startup; minting and refreshing it happens elsewhere.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use shutter_core::{RemoteId, RemoteStorage, UploadError};

const BOUNDARY: &str = "shutter-upload-boundary";

#[derive(Deserialize)]
struct Credentials {
    access_token: String,
}

#[derive(Deserialize)]
struct FileResource {
    id: String,
}

pub struct DriveClient {
    http: Client,
    upload_url: String,
    access_token: String,
}

impl DriveClient {
    pub fn from_credentials_file(path: &Path, api_base: &str) -> Result<Self, UploadError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UploadError::Credentials(format!("failed to read {}: {}", path.display(), e))
        })?;
        let creds: Credentials = serde_json::from_str(&text).map_err(|e| {
            UploadError::Credentials(format!("failed to parse {}: {}", path.display(), e))
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| UploadError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            upload_url: format!(
                "{}/upload/drive/v3/files?uploadType=multipart",
                api_base.trim_end_matches('/')
            ),
            access_token: creds.access_token,
        })
    }
}

impl RemoteStorage for DriveClient {
    fn create_file(
        &self,
        name: &str,
        parent_folder_id: &str,
        content: Vec<u8>,
    ) -> Result<RemoteId, UploadError> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_folder_id],
        });
        let body = multipart_related(&metadata.to_string(), mime_for(name), &content);
        let resp = self
            .http
            .post(&self.upload_url)
            .bearer_auth(&self.access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .body(body)
            .send()
            .map_err(|e| UploadError::Unreachable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| UploadError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        let file: FileResource = serde_json::from_str(&text).map_err(|e| UploadError::Rejected {
            status: status.as_u16(),
            body: format!("unexpected response ({e}): {text}"),
        })?;
        Ok(RemoteId(file.id))
    }
}

fn mime_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Metadata part (JSON) followed by the media part.
fn multipart_related(metadata_json: &str, media_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {media_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
