//! CPU surface for the software backend - float RGBA storage

use crate::backend::BlendState;

/// A float RGBA CPU surface
///
/// Stores pixels as [f32; 4], premultiplied alpha, row-major with row 0 at
/// the bottom (the same orientation as a GL framebuffer).
#[derive(Debug, Clone)]
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    /// Pixel data in row-major order, each pixel is [r, g, b, a] as f32
    pixels: Vec<[f32; 4]>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; pixel_count],
        }
    }

    /// Clear the surface to a solid color
    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [f32; 4]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Blend a fragment onto an existing pixel with the given blend function
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: [f32; 4], blend: &BlendState) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = blend.apply(color, self.pixels[i]);
        }
    }

    /// Nearest-texel lookup at normalized coordinates, clamped to the edge
    #[inline]
    pub fn sample_nearest(&self, u: f32, v: f32) -> [f32; 4] {
        if self.pixels.is_empty() {
            return [0.0; 4];
        }
        let x = texel_index(u, self.width);
        let y = texel_index(v, self.height);
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Replace all pixels from row-major data
    ///
    /// Returns false (and leaves the surface untouched) if the length doesn't match.
    pub fn upload(&mut self, pixels: &[[f32; 4]]) -> bool {
        if pixels.len() != self.pixels.len() {
            return false;
        }
        self.pixels.copy_from_slice(pixels);
        true
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }
}

/// Edge-clamped texel index for a normalized coordinate
#[inline]
fn texel_index(coord: f32, size: u32) -> u32 {
    let max = size.saturating_sub(1) as f32;
    (coord * size as f32).floor().clamp(0.0, max) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface() {
        let surface = CpuSurface::new(100, 100);
        assert_eq!(surface.width, 100);
        assert_eq!(surface.height, 100);
        assert_eq!(surface.pixel_count(), 10000);
        assert_eq!(surface.get_pixel(50, 50), Some([0.0; 4]));
    }

    #[test]
    fn test_get_set_pixel() {
        let mut surface = CpuSurface::new(10, 10);
        let color = [1.0, 0.5, 0.25, 1.0];

        surface.set_pixel(5, 5, color);
        assert_eq!(surface.get_pixel(5, 5), Some(color));

        // Out of bounds should return None
        assert_eq!(surface.get_pixel(100, 100), None);
    }

    #[test]
    fn test_clear() {
        let mut surface = CpuSurface::new(3, 2);
        surface.clear([0.0, 0.0, 1.0, 1.0]);
        assert!(surface.pixels().iter().all(|&p| p == [0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn test_blend_pixel_over() {
        let mut surface = CpuSurface::new(10, 10);
        surface.clear([1.0, 1.0, 1.0, 1.0]);

        // 50% premultiplied red
        surface.blend_pixel(5, 5, [0.5, 0.0, 0.0, 0.5], &BlendState::OVER);

        let result = surface.get_pixel(5, 5).unwrap();
        assert!((result[0] - 1.0).abs() < 0.01);
        assert!((result[1] - 0.5).abs() < 0.01);
        assert!((result[2] - 0.5).abs() < 0.01);
        assert!((result[3] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_sample_nearest_clamps() {
        let mut surface = CpuSurface::new(2, 2);
        surface.set_pixel(0, 0, [1.0, 0.0, 0.0, 1.0]);
        surface.set_pixel(1, 1, [0.0, 0.0, 1.0, 1.0]);

        assert_eq!(surface.sample_nearest(0.25, 0.25), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(surface.sample_nearest(0.75, 0.75), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(surface.sample_nearest(-1.0, -1.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(surface.sample_nearest(1.0, 1.0), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_upload_checks_length() {
        let mut surface = CpuSurface::new(2, 1);
        assert!(!surface.upload(&[[1.0; 4]]));
        assert!(surface.upload(&[[1.0; 4], [0.5; 4]]));
        assert_eq!(surface.get_pixel(1, 0), Some([0.5; 4]));
    }
}
