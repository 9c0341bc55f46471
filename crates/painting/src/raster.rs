//! Decoded image pixels handed to the layer stack

use crate::error::PaintError;

/// RGBA image with rows stored top-first and straight (unpremultiplied) alpha,
/// the layout image decoders produce
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Result<Self, PaintError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(PaintError::ImageSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-color image
    pub fn solid(width: u32, height: u32, color: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// From tightly packed 8-bit RGBA bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, PaintError> {
        let expected = width as usize * height as usize;
        if bytes.len() != expected * 4 {
            return Err(PaintError::ImageSize {
                expected,
                actual: bytes.len() / 4,
            });
        }
        let texels: &[[u8; 4]] =
            bytemuck::try_cast_slice(bytes).map_err(|_| PaintError::ImageSize {
                expected,
                actual: bytes.len() / 4,
            })?;
        let pixels = texels.iter().map(|&px| px_to_f32(px)).collect();
        Self::new(width, height, pixels)
    }

    /// Pixels with color multiplied by alpha, in the same top-first order
    pub fn premultiplied(&self) -> Vec<[f32; 4]> {
        self.pixels.iter().map(|&px| premultiply(px)).collect()
    }
}

/// Straight to premultiplied alpha
#[inline]
pub fn premultiply([r, g, b, a]: [f32; 4]) -> [f32; 4] {
    [r * a, g * a, b * a, a]
}

/// Premultiplied to straight alpha; fully transparent pixels stay black
#[inline]
pub fn unpremultiply([r, g, b, a]: [f32; 4]) -> [f32; 4] {
    if a <= 0.0 {
        return [0.0; 4];
    }
    [r / a, g / a, b / a, a]
}

#[inline]
fn px_to_f32(px: [u8; 4]) -> [f32; 4] {
    px.map(|c| c as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_size() {
        assert!(ImageData::new(2, 2, vec![[0.0; 4]; 4]).is_ok());
        let err = ImageData::new(2, 2, vec![[0.0; 4]; 3]).unwrap_err();
        assert!(matches!(err, PaintError::ImageSize { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_from_rgba8() {
        let image = ImageData::from_rgba8(1, 2, &[255, 0, 0, 255, 0, 0, 255, 0]).unwrap();
        assert_eq!(image.pixels, vec![[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 0.0]]);
        assert!(ImageData::from_rgba8(2, 2, &[0; 12]).is_err());
        assert!(matches!(
            ImageData::from_rgba8(1, 1, &[0; 5]),
            Err(PaintError::ImageSize { expected: 1, actual: 1 })
        ));
    }

    #[test]
    fn test_premultiplied_keeps_row_order() {
        let top = [1.0, 1.0, 1.0, 0.5];
        let bottom = [0.0, 1.0, 0.0, 1.0];
        let image = ImageData::new(1, 2, vec![top, bottom]).unwrap();
        assert_eq!(image.premultiplied(), vec![[0.5, 0.5, 0.5, 0.5], bottom]);
    }

    #[test]
    fn test_unpremultiply_transparent() {
        assert_eq!(unpremultiply([0.0, 0.0, 0.0, 0.0]), [0.0; 4]);
        assert_eq!(unpremultiply([0.5, 0.25, 0.0, 0.5]), [1.0, 0.5, 0.0, 0.5]);
    }
}
