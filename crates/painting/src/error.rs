//! Error types for painting operations.

use crate::backend::BackendError;

/// Errors that can occur while stamping strokes or compositing layers.
#[derive(Debug, thiserror::Error)]
pub enum PaintError {
    #[error("Rendering backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Invalid brush radius: {0}")]
    InvalidRadius(f32),

    #[error("Invalid brush color: {0:?}")]
    InvalidColor([f32; 3]),

    #[error("Stamp list has an odd number of coordinates ({0})")]
    OddCoordinateCount(usize),

    #[error("No active layer to draw into")]
    NoActiveLayer,

    #[error("Layer index {index} out of range ({len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    #[error("Image data holds {actual} pixels, expected {expected}")]
    ImageSize { expected: usize, actual: usize },
}
