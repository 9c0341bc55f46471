//! Shared configuration for Impasto
//!
//! This crate provides the single source of truth for canvas dimensions and
//! brush defaults, shared by the painting core and the application binary.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default canvas width in pixels
pub const DEFAULT_CANVAS_WIDTH: u32 = 783;

/// Default canvas height in pixels
pub const DEFAULT_CANVAS_HEIGHT: u32 = 801;

/// Default brush radius in pixels
pub const DEFAULT_BRUSH_RADIUS: f32 = 100.0;

/// Default brush color (magenta)
pub const DEFAULT_BRUSH_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

/// Distance between consecutive stamp centers as a fraction of the radius.
pub const SPACING_RATIO: f32 = 0.2;

/// Smallest radius that still stamps. Zero is accepted and draws nothing.
pub const MIN_BRUSH_RADIUS: f32 = 0.5;

/// Environment variable overriding the canvas width
pub const ENV_CANVAS_WIDTH: &str = "IMPASTO_CANVAS_WIDTH";

/// Environment variable overriding the canvas height
pub const ENV_CANVAS_HEIGHT: &str = "IMPASTO_CANVAS_HEIGHT";

/// Environment variable overriding the brush radius
pub const ENV_BRUSH_RADIUS: &str = "IMPASTO_BRUSH_RADIUS";

/// Canvas configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl CanvasConfig {
    /// Create a new canvas config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get width as f32 for calculations
    pub fn width_f32(&self) -> f32 {
        self.width as f32
    }

    /// Get height as f32 for calculations
    pub fn height_f32(&self) -> f32 {
        self.height as f32
    }
}

/// Brush defaults applied when a painting session starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushConfig {
    /// Stamp radius in pixels
    pub radius: f32,
    /// RGB color, each channel in [0, 1]
    pub color: [f32; 3],
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BRUSH_RADIUS,
            color: DEFAULT_BRUSH_COLOR,
        }
    }
}

impl BrushConfig {
    /// Stamp spacing derived from the radius
    pub fn spacing(&self) -> f32 {
        spacing_for_radius(self.radius)
    }
}

/// Spacing between stamp centers for a brush of the given radius
#[inline]
pub fn spacing_for_radius(radius: f32) -> f32 {
    SPACING_RATIO * radius
}

/// Whether a brush can be set to `radius`: zero, or finite and at least
/// [`MIN_BRUSH_RADIUS`]
#[inline]
pub fn is_usable_radius(radius: f32) -> bool {
    radius == 0.0 || (radius.is_finite() && radius >= MIN_BRUSH_RADIUS)
}

/// Combined configuration for a painting session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpastoConfig {
    pub canvas: CanvasConfig,
    pub brush: BrushConfig,
}

impl ImpastoConfig {
    /// Defaults with overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from an arbitrary key lookup
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(width) = parse_override::<u32>(&lookup, ENV_CANVAS_WIDTH) {
            config.canvas.width = width;
        }
        if let Some(height) = parse_override::<u32>(&lookup, ENV_CANVAS_HEIGHT) {
            config.canvas.height = height;
        }
        if let Some(radius) = parse_override::<f32>(&lookup, ENV_BRUSH_RADIUS) {
            if is_usable_radius(radius) {
                config.brush.radius = radius;
            } else {
                warn!("{ENV_BRUSH_RADIUS}={radius} is not a usable radius, keeping default");
            }
        }

        config
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparsable {key}={raw:?}");
            None
        }
    }
}
