//! Rendering backend abstraction
//!
//! The painting core talks to the graphics context through [`RenderBackend`],
//! a trait shaped after the GL-style API it was designed against: a global
//! "current program", a global framebuffer binding and a global blend
//! function, plus handle-based programs, buffers, textures and framebuffers.
//!
//! Because that state is global, any operation that needs a different
//! program or binding than its caller enters a [`StateScope`], which restores
//! the caller's state when it goes out of scope.
//!
//! [`SoftwareBackend`] implements the trait on the CPU so the stroke and
//! compositing logic can run headless.

mod error;
mod scope;
mod shader;
mod software;

use glam::Mat4;
use serde::{Deserialize, Serialize};

pub use error::BackendError;
pub use scope::StateScope;
pub use shader::{ShaderInterface, ShaderKind, ShaderSource};
pub use software::SoftwareBackend;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Handle to a vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// Handle to a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

/// Handle to an off-screen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub(crate) u32);

/// A texture with a framebuffer attached to it
///
/// Drawing goes through `framebuffer`, reading back (sampling) goes
/// through `texture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub texture: TextureHandle,
    pub framebuffer: FramebufferHandle,
    pub width: u32,
    pub height: u32,
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Array,
    /// Element indices
    ElementArray,
}

/// Usage hint passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
}

/// Buffer contents
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    F32(Vec<f32>),
    U16(Vec<u16>),
}

impl BufferData {
    /// Number of scalar elements
    pub fn len(&self) -> usize {
        match self {
            BufferData::F32(data) => data.len(),
            BufferData::U16(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Texel storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit float RGBA. Repeated blending needs the precision to avoid banding.
    #[default]
    Rgba32Float,
}

/// Blend factor applied to the source or destination term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

impl BlendFactor {
    /// Scalar weight for this factor given the incoming source alpha
    #[inline]
    pub fn weight(self, src_alpha: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcAlpha => src_alpha,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_alpha,
        }
    }
}

/// Blend function: `out = src * src_factor + dst * dst_factor`,
/// with separate factors for the alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendState {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendState {
    /// Same factors for color and alpha
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self::separate(src, dst, src, dst)
    }

    pub const fn separate(
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Self {
        Self {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        }
    }

    /// `(ONE, ZERO)`: replace the destination. Used for the first draw of
    /// freshly loaded image data, where the destination holds nothing
    /// worth keeping.
    pub const OVERWRITE: Self = Self::new(BlendFactor::One, BlendFactor::Zero);

    /// `(ONE, ONE_MINUS_SRC_ALPHA)`: premultiplied "over". Used when
    /// compositing layers, whose contents are already premultiplied.
    pub const OVER: Self = Self::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

    /// Straight-alpha color over, premultiplied alpha accumulation.
    /// Brush stamps write straight colors into premultiplied layers.
    pub const STAMP: Self = Self::separate(
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
    );

    /// Blend a source fragment onto a destination pixel
    #[inline]
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let a = src[3];
        let (sc, dc) = (self.src_rgb.weight(a), self.dst_rgb.weight(a));
        let (sa, da) = (self.src_alpha.weight(a), self.dst_alpha.weight(a));
        [
            src[0] * sc + dst[0] * dc,
            src[1] * sc + dst[1] * dc,
            src[2] * sc + dst[2] * dc,
            src[3] * sa + dst[3] * da,
        ]
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::OVERWRITE
    }
}

/// Primitive assembly mode for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    TriangleFan,
}

/// Value stored in a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec3([f32; 3]),
    Mat4(Mat4),
    /// Texture unit index
    Sampler(u32),
}

/// The global binding state that scoped operations save and restore
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendState {
    pub program: Option<ProgramHandle>,
    pub framebuffer: Option<FramebufferHandle>,
    pub blend: BlendState,
}

/// Graphics context consumed by the painting core
///
/// Uniform, attribute and index bindings apply to the current program, the
/// same way a GL context behaves. `None` framebuffer means the visible
/// (default) framebuffer.
pub trait RenderBackend {
    /// Compile and link a program from vertex and fragment sources
    fn create_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, BackendError>;

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: BufferData,
        usage: BufferUsage,
    ) -> Result<BufferHandle, BackendError>;

    /// Replace a buffer's contents. Every consumer of the buffer sees the change.
    fn update_buffer(&mut self, buffer: BufferHandle, data: BufferData) -> Result<(), BackendError>;

    /// Create a texture, optionally initialized with row-major pixels
    fn create_texture(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: Option<&[[f32; 4]]>,
    ) -> Result<TextureHandle, BackendError>;

    /// Attach a texture to a new framebuffer
    fn create_framebuffer(
        &mut self,
        texture: TextureHandle,
    ) -> Result<FramebufferHandle, BackendError>;

    fn current_program(&self) -> Option<ProgramHandle>;

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), BackendError>;

    fn bound_framebuffer(&self) -> Option<FramebufferHandle>;

    fn bind_framebuffer(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Result<(), BackendError>;

    fn blend(&self) -> BlendState;

    fn set_blend(&mut self, blend: BlendState);

    /// Set a uniform on the current program
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BackendError>;

    /// Read a uniform back from a program; `None` if never set
    fn uniform(
        &self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<Option<UniformValue>, BackendError>;

    /// Source an attribute of the current program from a buffer
    fn bind_attribute(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        components: usize,
    ) -> Result<(), BackendError>;

    fn bind_index_buffer(&mut self, buffer: BufferHandle) -> Result<(), BackendError>;

    fn bind_texture(
        &mut self,
        unit: u32,
        texture: Option<TextureHandle>,
    ) -> Result<(), BackendError>;

    /// Clear the bound framebuffer
    fn clear(&mut self, color: [f32; 4]) -> Result<(), BackendError>;

    /// Draw `count` indexed vertices with the current program
    fn draw_elements(&mut self, primitive: Primitive, count: usize) -> Result<(), BackendError>;

    /// Read back a framebuffer as row-major pixels, bottom row first
    fn read_pixels(
        &self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Result<Vec<[f32; 4]>, BackendError>;

    /// Create a texture with an attached framebuffer
    fn create_render_target(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, BackendError> {
        let texture = self.create_texture(format, width, height, None)?;
        let framebuffer = self.create_framebuffer(texture)?;
        Ok(RenderTarget {
            texture,
            framebuffer,
            width,
            height,
        })
    }

    /// Snapshot of the global binding state
    fn state(&self) -> BackendState {
        BackendState {
            program: self.current_program(),
            framebuffer: self.bound_framebuffer(),
            blend: self.blend(),
        }
    }

    /// Restore a snapshot taken with [`RenderBackend::state`]
    fn restore(&mut self, state: BackendState) -> Result<(), BackendError> {
        self.set_blend(state.blend);
        self.bind_framebuffer(state.framebuffer)?;
        self.use_program(state.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_ignores_destination() {
        let out = BlendState::OVERWRITE.apply([0.2, 0.3, 0.4, 0.5], [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(out, [0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_over_is_premultiplied() {
        // 50% premultiplied red over opaque white
        let out = BlendState::OVER.apply([0.5, 0.0, 0.0, 0.5], [1.0, 1.0, 1.0, 1.0]);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stamp_premultiplies_into_transparent() {
        let out = BlendState::STAMP.apply([1.0, 0.0, 1.0, 1.0], [0.0; 4]);
        assert_eq!(out, [1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_over_onto_transparent_is_identity() {
        let src = [0.25, 0.1, 0.0, 0.25];
        assert_eq!(BlendState::OVER.apply(src, [0.0; 4]), src);
    }
}
