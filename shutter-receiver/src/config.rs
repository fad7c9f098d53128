//! Load receiver config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use shutter_core::{ExtensionFilter, PipelineConfig};

/// Receiver configuration. File: $SHUTTER_CONFIG, ~/.config/shutter/receiver.toml or /etc/shutter/receiver.toml.
/// Env overrides: SHUTTER_CAPTURE_DIR, SHUTTER_RADIO_PORT, SHUTTER_WATCH_DIR, SHUTTER_PARENT_FOLDER_ID.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where received payloads are written (default images).
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    /// Serial device of the radio bridge.
    #[serde(default = "default_radio_port")]
    pub radio_port: String,
    #[serde(default = "default_radio_baud")]
    pub radio_baud: u32,
    /// Wait between polls when the radio is idle (default 5 ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Directory watch. Files created here that pass the extension filter are uploaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_capture_dir")]
    pub dir: PathBuf,
    /// Accepted extensions, case-insensitive. Raw formats (e.g. CR2) must be listed explicitly.
    #[serde(default = "default_watch_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// OAuth token file, `{"access_token": "..."}`, read once at startup (default
    /// drive_token.json). A service-account key file is not accepted; mint a token from it first.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_parent_folder_id")]
    pub parent_folder_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_file_prefix() -> String {
    "received_image_".to_string()
}
fn default_file_extension() -> String {
    "jpg".to_string()
}
fn default_radio_port() -> String {
    "/dev/ttyACM0".to_string()
}
fn default_radio_baud() -> u32 {
    115_200
}
fn default_poll_interval_ms() -> u64 {
    5
}
fn default_watch_extensions() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into()]
}
fn default_credentials_path() -> PathBuf {
    PathBuf::from("drive_token.json")
}
fn default_parent_folder_id() -> String {
    "1jS2ZKF_eA78difWcCjyFpAfVet_ozHEr".to_string()
}
fn default_api_base() -> String {
    "https://www.googleapis.com".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_capture_dir(),
            extensions: default_watch_extensions(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            parent_folder_id: default_parent_folder_id(),
            api_base: default_api_base(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_dir: default_capture_dir(),
            file_prefix: default_file_prefix(),
            file_extension: default_file_extension(),
            radio_port: default_radio_port(),
            radio_baud: default_radio_baud(),
            poll_interval_ms: default_poll_interval_ms(),
            watch: WatchConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Config {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            capture_dir: self.capture_dir.clone(),
            file_prefix: self.file_prefix.clone(),
            file_extension: self.file_extension.clone(),
            watch_filter: ExtensionFilter::new(&self.watch.extensions),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("SHUTTER_CAPTURE_DIR") {
        c.capture_dir = PathBuf::from(s);
    }
    if let Ok(s) = std::env::var("SHUTTER_RADIO_PORT") {
        c.radio_port = s;
    }
    if let Ok(s) = std::env::var("SHUTTER_WATCH_DIR") {
        c.watch.dir = PathBuf::from(s);
        c.watch.enabled = true;
    }
    if let Ok(s) = std::env::var("SHUTTER_PARENT_FOLDER_ID") {
        c.upload.parent_folder_id = s;
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    if let Some(p) = std::env::var_os("SHUTTER_CONFIG") {
        return vec![PathBuf::from(p)];
    }
    let mut out = Vec::new();
    if let Some(h) = std::env::var_os("HOME").map(PathBuf::from) {
        out.push(h.join(".config/shutter/receiver.toml"));
    }
    out.push(PathBuf::from("/etc/shutter/receiver.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            return match std::fs::read_to_string(&p).map(|s| toml::from_str::<Config>(&s)) {
                Ok(Ok(c)) => Some(c),
                Ok(Err(e)) => {
                    tracing::warn!(path = %p.display(), error = %e, "invalid config, using defaults");
                    None
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "unreadable config, using defaults");
                    None
                }
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn empty_file_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.capture_dir, PathBuf::from("images"));
        assert_eq!(c.poll_interval(), Duration::from_millis(5));
        assert!(!c.watch.enabled);
        assert_eq!(c.watch.extensions, vec!["jpg", "jpeg", "png"]);
        assert_eq!(c.upload.api_base, "https://www.googleapis.com");
        assert_eq!(c.upload.credentials_path, PathBuf::from("drive_token.json"));
    }

    #[test]
    fn nested_tables_parse() {
        let c: Config = toml::from_str(
            r#"
            capture_dir = "/var/lib/shutter"
            [watch]
            enabled = true
            dir = "/home/pi/camera"
            extensions = ["jpg", "CR2"]
            [upload]
            parent_folder_id = "abc"
            "#,
        )
        .unwrap();
        assert!(c.watch.enabled);
        assert_eq!(c.upload.parent_folder_id, "abc");
        let p = c.pipeline_config();
        assert_eq!(p.capture_dir, PathBuf::from("/var/lib/shutter"));
        assert!(p.watch_filter.matches(Path::new("IMG_1.cr2")));
        assert!(!p.watch_filter.matches(Path::new("IMG_1.png")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[watch]\nrecursive = true").is_err());
    }
}
