//! Projection and pan state shared by the brush and the compositor

use glam::{Mat4, Vec3};
use tracing::debug;

use crate::geometry::Point;

/// Orthographic projection plus a pannable model-view matrix
///
/// `inverse_model_view` is kept in step with `model_view` by applying the
/// opposite translation on every pan, so the two are always exact inverses
/// without ever inverting a matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub projection: Mat4,
    pub model_view: Mat4,
    pub inverse_model_view: Mat4,
    width: f32,
    height: f32,
}

impl ViewTransform {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            projection: Mat4::orthographic_rh_gl(0.0, width, 0.0, height, 1.0, -1.0),
            model_view: Mat4::IDENTITY,
            inverse_model_view: Mat4::IDENTITY,
            width,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Shift the view by `delta` screen pixels
    pub fn pan(&mut self, delta: Point) {
        let d = Vec3::new(delta.x, delta.y, 0.0);
        self.model_view *= Mat4::from_translation(d);
        self.inverse_model_view *= Mat4::from_translation(-d);
        debug!("ViewTransform::pan: delta=({}, {}) offset={:?}", delta.x, delta.y, self.offset());
    }

    /// Accumulated pan
    pub fn offset(&self) -> Point {
        self.model_view.w_axis.truncate().truncate()
    }

    /// Map a screen position into layer space
    pub fn screen_to_layer(&self, screen: Point) -> Point {
        self.inverse_model_view
            .transform_point3(screen.extend(0.0))
            .truncate()
    }

    /// Map a layer position onto the screen
    pub fn layer_to_screen(&self, layer: Point) -> Point {
        self.model_view.transform_point3(layer.extend(0.0)).truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_identity() {
        let view = ViewTransform::new(783.0, 801.0);
        assert_eq!(view.model_view, Mat4::IDENTITY);
        assert_eq!(view.inverse_model_view, Mat4::IDENTITY);
        assert_eq!(view.offset(), Point::ZERO);
    }

    #[test]
    fn test_projection_maps_canvas_to_ndc() {
        let view = ViewTransform::new(200.0, 100.0);
        let corner = view.projection.transform_point3(Vec3::new(200.0, 100.0, 0.0));
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
        let origin = view.projection.transform_point3(Vec3::ZERO);
        assert!((origin.x + 1.0).abs() < 1e-6);
        assert!((origin.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pan_keeps_exact_inverse() {
        let mut view = ViewTransform::new(100.0, 100.0);
        for delta in [Point::new(12.0, -3.0), Point::new(-4.5, 8.25), Point::new(0.0, 1.0)] {
            view.pan(delta);
        }
        assert_eq!(view.model_view * view.inverse_model_view, Mat4::IDENTITY);
        assert_eq!(view.offset(), Point::new(7.5, 6.25));
    }

    #[test]
    fn test_screen_layer_round_trip() {
        let mut view = ViewTransform::new(100.0, 100.0);
        view.pan(Point::new(10.0, 20.0));
        let screen = Point::new(50.0, 50.0);
        let layer = view.screen_to_layer(screen);
        assert_eq!(layer, Point::new(40.0, 30.0));
        assert_eq!(view.layer_to_screen(layer), screen);
    }
}
