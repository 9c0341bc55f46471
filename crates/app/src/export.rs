//! Image decode and PNG export

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use painting::raster::unpremultiply;
use painting::{ImageData, PaintError};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Framebuffer holds {actual} pixels, expected {width}x{height}")]
    Size { width: u32, height: u32, actual: usize },

    #[error(transparent)]
    Pixels(#[from] PaintError),
}

/// Decode any supported image file into straight-alpha float pixels
pub fn load_image(path: &Path) -> Result<ImageData, ImageError> {
    let decoded = image::open(path).map_err(|source| ImageError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    debug!("Decoded {} ({}x{})", path.display(), rgba.width(), rgba.height());
    Ok(ImageData::from_rgba8(rgba.width(), rgba.height(), rgba.as_raw())?)
}

/// Convert premultiplied, bottom-row-first framebuffer pixels into
/// straight-alpha 8-bit RGBA rows, top row first
pub fn to_rgba8(width: u32, height: u32, pixels: &[[f32; 4]]) -> Result<Vec<u8>, ImageError> {
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(ImageError::Size {
            width,
            height,
            actual: pixels.len(),
        });
    }
    if expected == 0 {
        return Ok(Vec::new());
    }

    Ok(pixels
        .chunks_exact(width as usize)
        .rev()
        .flat_map(|row| row.iter().flat_map(|&px| unpremultiply(px).map(to_byte)))
        .collect())
}

/// Write framebuffer pixels to a PNG file
pub fn save_png(
    path: &Path,
    width: u32,
    height: u32,
    pixels: &[[f32; 4]],
) -> Result<(), ImageError> {
    let bytes = to_rgba8(width, height, pixels)?;
    let actual = bytes.len() / 4;
    let image = RgbaImage::from_raw(width, height, bytes).ok_or(ImageError::Size {
        width,
        height,
        actual,
    })?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ImageError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

#[inline]
fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rgba8_flips_rows_and_unpremultiplies() {
        let bottom = [0.0, 0.0, 0.5, 0.5];
        let top = [1.0, 0.0, 0.0, 1.0];
        let bytes = to_rgba8(1, 2, &[bottom, top]).unwrap();
        assert_eq!(bytes, vec![255, 0, 0, 255, 0, 0, 255, 128]);
    }

    #[test]
    fn test_to_rgba8_checks_size() {
        assert!(matches!(
            to_rgba8(2, 2, &[[0.0; 4]; 3]),
            Err(ImageError::Size { actual: 3, .. })
        ));
    }

    #[test]
    fn test_transparent_pixels_export_as_zero() {
        assert_eq!(to_rgba8(1, 1, &[[0.0; 4]]).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_png_round_trip_through_disk() {
        let path = std::env::temp_dir().join(format!("impasto-export-{}.png", std::process::id()));
        let pixels = vec![[0.0, 1.0, 0.0, 1.0]; 6];
        save_png(&path, 3, 2, &pixels).unwrap();

        let image = load_image(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.pixels[0], [0.0, 1.0, 0.0, 1.0]);
    }
}
