//! Error types for rendering backend operations.

use super::Primitive;

/// Errors surfaced by a [`RenderBackend`](super::RenderBackend).
///
/// The painting core never retries these; they are fatal to the current
/// frame and propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to build shader program '{label}': {reason}")]
    ShaderCompile { label: String, reason: String },

    #[error("Unknown program handle {0}")]
    InvalidProgram(u32),

    #[error("Unknown buffer handle {0}")]
    InvalidBuffer(u32),

    #[error("Unknown texture handle {0}")]
    InvalidTexture(u32),

    #[error("Unknown framebuffer handle {0}")]
    InvalidFramebuffer(u32),

    #[error("No program is current")]
    NoProgram,

    #[error("Program '{program}' has no uniform named '{name}'")]
    UnknownUniform { program: String, name: String },

    #[error("Program '{program}' has no attribute named '{name}'")]
    UnknownAttribute { program: String, name: String },

    #[error("Attribute '{0}' has no buffer bound")]
    UnboundAttribute(String),

    #[error("No index buffer bound")]
    NoIndexBuffer,

    #[error("Uniform '{0}' was read before being set")]
    UnsetUniform(String),

    #[error("Uniform '{name}' holds the wrong kind of value")]
    UniformType { name: String },

    #[error("Buffer {buffer} does not hold {expected} data")]
    BufferKind { buffer: u32, expected: &'static str },

    #[error("Index {index} is out of range for a {len}-element buffer")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No texture bound to unit {0}")]
    NoTexture(u32),

    #[error("{primitive:?} draw with {count} vertices is not supported by this program")]
    UnsupportedDraw { primitive: Primitive, count: usize },

    #[error("Pixel data holds {actual} texels, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
