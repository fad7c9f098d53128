//! Image codec backed by the `image` crate: decode any supported file, re-encode in memory.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use shutter_core::{CodecError, ImageCodec};

pub struct Reencoder {
    format: ImageFormat,
}

impl Reencoder {
    /// `name` is "png" or "jpeg"/"jpg"; anything else falls back to PNG.
    pub fn from_name(name: &str) -> Self {
        let format = match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            other => {
                tracing::warn!(format = other, "unsupported image format, using png");
                ImageFormat::Png
            }
        };
        Self { format }
    }
}

impl ImageCodec for Reencoder {
    fn encode(&self, path: &Path) -> Result<Vec<u8>, CodecError> {
        let reader = image::ImageReader::open(path).map_err(|source| CodecError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let img = reader
            .with_guessed_format()
            .map_err(|source| CodecError::Read {
                path: path.display().to_string(),
                source,
            })?
            .decode()
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, self.format)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}
