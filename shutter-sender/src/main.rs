// Shutter sender: frame one image and push it to the relay device over serial.

mod codec;
mod config;
mod serial;

use std::path::PathBuf;

use anyhow::Context;
use shutter_core::{TransmitError, Transmitter};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    let mut image_override = None;
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("shutter-sender {}", VERSION);
            return Ok(());
        }
        image_override = Some(PathBuf::from(arg));
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = config::load();
    let image_path = image_override.unwrap_or_else(|| cfg.image_path.clone());

    let tx = Transmitter::new(
        serial::SystemPorts,
        codec::Reencoder::from_name(&cfg.image_format),
        cfg.transmit_config(),
    );

    match tx.transmit(&image_path) {
        Ok(report) => {
            tracing::info!(
                endpoint = %report.endpoint.identifier,
                frames = report.frames_sent,
                bytes = report.bytes_sent,
                "image transmission completed"
            );
            Ok(())
        }
        Err(TransmitError::NoDevice) => {
            tracing::error!("relay device not detected; ensure it is connected and try again");
            std::process::exit(2);
        }
        Err(e) => Err(e).with_context(|| format!("failed to transmit {}", image_path.display())),
    }
}
