//! Image decode/encode for mip pyramid pipelines.
//!
//! Everything crosses this boundary as packed RGBA8: files of any
//! supported format decode to it, pyramid levels encode from it.

mod error;

pub use error::{IoError, IoResult};

use std::path::Path;

use tracing::debug;

/// Decode an image file to packed RGBA8.
///
/// Returns the pixel bytes and dimensions. Non-RGBA sources are
/// expanded; 16-bit sources are narrowed to 8.
pub fn read_rgba8(path: impl AsRef<Path>) -> IoResult<(Vec<u8>, u32, u32)> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| IoError::Decode(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "decoded source image");

    Ok((rgba.into_raw(), width, height))
}

/// Write packed RGBA8 pixels as a PNG file.
pub fn write_png_rgba8(path: impl AsRef<Path>, pixels: &[u8], width: u32, height: u32) -> IoResult<()> {
    let path = path.as_ref();
    let expected = (width as usize) * (height as usize) * 4;
    if pixels.len() != expected {
        return Err(IoError::DimensionMismatch { expected, actual: pixels.len() });
    }

    image::save_buffer(path, pixels, width, height, image::ColorType::Rgba8)
        .map_err(|e| IoError::Encode(e.to_string()))?;
    debug!(path = %path.display(), width, height, "wrote PNG");
    Ok(())
}
