pub use impasto_config::{MIN_BRUSH_RADIUS, SPACING_RATIO};

/// Lengths and squared magnitudes below this are treated as zero.
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// Smallest stamp spacing a generator walks; anything finer stamps nothing.
pub const MIN_STAMP_SPACING: f32 = SPACING_RATIO * MIN_BRUSH_RADIUS;

/// Upper bound on stamps emitted by one straight walk, and on the samples
/// taken along one curve.
pub const MAX_STAMPS_PER_SEGMENT: usize = 1 << 20;

/// Most stamps issued by a single draw call. Indices are u16.
pub const MAX_STAMPS_PER_DRAW: usize = u16::MAX as usize;

/// Texture unit layers are bound to while compositing.
pub const COMPOSITE_TEXTURE_UNIT: u32 = 1;

/// Color the destination is cleared to before compositing.
pub const COMPOSITE_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];
