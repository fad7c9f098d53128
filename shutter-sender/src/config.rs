//! Load sender config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use shutter_core::{ProbeConfig, TransmitConfig};

/// Sender configuration. File: $SHUTTER_CONFIG, ~/.config/shutter/sender.toml or /etc/shutter/sender.toml.
/// Env overrides: SHUTTER_IMAGE_PATH, SHUTTER_CHUNK_SIZE, SHUTTER_PACE_MS, SHUTTER_BAUD_RATE.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Image to send (default latest_image.png).
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
    /// Frame payload size in bytes (default 1024).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Delay between frames in milliseconds (default 50).
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Handshake written to each candidate port.
    #[serde(default = "default_probe")]
    pub probe: String,
    /// Reply identifying the relay device.
    #[serde(default = "default_expected_reply")]
    pub expected_reply: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Encoding applied before framing: "png" or "jpeg".
    #[serde(default = "default_image_format")]
    pub image_format: String,
}

fn default_image_path() -> PathBuf {
    PathBuf::from("latest_image.png")
}
fn default_chunk_size() -> usize {
    1024
}
fn default_pace_ms() -> u64 {
    50
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_probe() -> String {
    "hello".to_string()
}
fn default_expected_reply() -> String {
    "ESP32".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_image_format() -> String {
    "png".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            chunk_size: default_chunk_size(),
            pace_ms: default_pace_ms(),
            baud_rate: default_baud_rate(),
            probe: default_probe(),
            expected_reply: default_expected_reply(),
            probe_timeout_ms: default_probe_timeout_ms(),
            image_format: default_image_format(),
        }
    }
}

impl Config {
    pub fn transmit_config(&self) -> TransmitConfig {
        let timeout = Duration::from_millis(self.probe_timeout_ms);
        TransmitConfig {
            chunk_size: self.chunk_size,
            pace_delay: Duration::from_millis(self.pace_ms),
            baud_rate: self.baud_rate,
            io_timeout: timeout,
            probe: ProbeConfig {
                probe: self.probe.as_bytes().to_vec(),
                expected_reply: self.expected_reply.as_bytes().to_vec(),
                baud_rate: self.baud_rate,
                timeout,
            },
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("SHUTTER_IMAGE_PATH") {
        c.image_path = PathBuf::from(s);
    }
    if let Ok(s) = std::env::var("SHUTTER_CHUNK_SIZE") {
        if let Ok(n) = s.parse::<usize>() {
            c.chunk_size = n;
        }
    }
    if let Ok(s) = std::env::var("SHUTTER_PACE_MS") {
        if let Ok(n) = s.parse::<u64>() {
            c.pace_ms = n;
        }
    }
    if let Ok(s) = std::env::var("SHUTTER_BAUD_RATE") {
        if let Ok(n) = s.parse::<u32>() {
            c.baud_rate = n;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    if let Some(p) = std::env::var_os("SHUTTER_CONFIG") {
        return vec![PathBuf::from(p)];
    }
    let mut out = Vec::new();
    if let Some(h) = std::env::var_os("HOME").map(PathBuf::from) {
        out.push(h.join(".config/shutter/sender.toml"));
    }
    out.push(PathBuf::from("/etc/shutter/sender.toml"));
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

    #[test]
    fn empty_file_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.chunk_size, 1024);
        assert_eq!(c.pace_ms, 50);
        assert_eq!(c.baud_rate, 115_200);
        assert_eq!(c.expected_reply, "ESP32");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("chunk = 5").is_err());
    }

    #[test]
    fn transmit_config_carries_probe_settings() {
        let c: Config = toml::from_str(
            "chunk_size = 512\npace_ms = 10\nprobe = \"ping\"\nexpected_reply = \"PONG\"",
        )
        .unwrap();
        let t = c.transmit_config();
        assert_eq!(t.chunk_size, 512);
        assert_eq!(t.pace_delay, Duration::from_millis(10));
        assert_eq!(t.probe.probe, b"ping");
        assert_eq!(t.probe.expected_reply, b"PONG");
        assert_eq!(t.probe.timeout, Duration::from_millis(1000));
    }
}
