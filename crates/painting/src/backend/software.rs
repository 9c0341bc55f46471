//! CPU implementation of the rendering backend
//!
//! Rasterizes the two programs the painting core uses: round stamps drawn
//! as point primitives and textured quads drawn as a four-vertex fan.
//! Framebuffer row 0 is the bottom row, matching GL conventions.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec4};
use tracing::{debug, trace};

use super::{
    BackendError, BlendState, BufferData, BufferHandle, BufferTarget, BufferUsage,
    FramebufferHandle, PixelFormat, Primitive, ProgramHandle, RenderBackend, ShaderInterface,
    ShaderKind, ShaderSource, TextureHandle, UniformValue,
};
use crate::surface::CpuSurface;

#[derive(Debug, Clone, Copy)]
struct AttributeBinding {
    buffer: BufferHandle,
    components: usize,
}

#[derive(Debug)]
struct Program {
    label: String,
    kind: ShaderKind,
    interface: ShaderInterface,
    uniforms: HashMap<String, UniformValue>,
    attributes: HashMap<String, AttributeBinding>,
}

impl Program {
    fn uniform(&self, name: &str) -> Result<UniformValue, BackendError> {
        self.uniforms
            .get(name)
            .copied()
            .ok_or_else(|| BackendError::UnsetUniform(name.to_string()))
    }

    fn mat4(&self, name: &str) -> Result<Mat4, BackendError> {
        match self.uniform(name)? {
            UniformValue::Mat4(m) => Ok(m),
            _ => Err(BackendError::UniformType { name: name.to_string() }),
        }
    }

    fn float(&self, name: &str) -> Result<f32, BackendError> {
        match self.uniform(name)? {
            UniformValue::F32(v) => Ok(v),
            _ => Err(BackendError::UniformType { name: name.to_string() }),
        }
    }

    fn vec3(&self, name: &str) -> Result<[f32; 3], BackendError> {
        match self.uniform(name)? {
            UniformValue::Vec3(v) => Ok(v),
            _ => Err(BackendError::UniformType { name: name.to_string() }),
        }
    }

    fn sampler(&self, name: &str) -> Result<u32, BackendError> {
        match self.uniform(name)? {
            UniformValue::Sampler(unit) => Ok(unit),
            _ => Err(BackendError::UniformType { name: name.to_string() }),
        }
    }

    /// Full transform from attribute space to clip space
    fn transform(&self) -> Result<Mat4, BackendError> {
        Ok(self.mat4("projMatrix")? * self.mat4("mvMatrix")?)
    }
}

#[derive(Debug)]
struct Buffer {
    target: BufferTarget,
    usage: BufferUsage,
    data: BufferData,
}

/// A single shaded fragment waiting to be blended
type Fragment = (u32, u32, [f32; 4]);

/// Headless rendering backend backed by [`CpuSurface`]s
///
/// Textures are sampled nearest-texel. Point primitives use the `uRadius`
/// uniform as the disc radius in framebuffer pixels.
pub struct SoftwareBackend {
    screen: CpuSurface,
    programs: Vec<Program>,
    buffers: Vec<Buffer>,
    textures: Vec<CpuSurface>,
    framebuffers: Vec<TextureHandle>,
    current_program: Option<ProgramHandle>,
    framebuffer: Option<FramebufferHandle>,
    blend: BlendState,
    texture_units: HashMap<u32, TextureHandle>,
    index_buffer: Option<BufferHandle>,
    draw_calls: usize,
}

impl SoftwareBackend {
    /// Create a backend whose default framebuffer is `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: CpuSurface::new(width, height),
            programs: Vec::new(),
            buffers: Vec::new(),
            textures: Vec::new(),
            framebuffers: Vec::new(),
            current_program: None,
            framebuffer: None,
            blend: BlendState::default(),
            texture_units: HashMap::new(),
            index_buffer: None,
            draw_calls: 0,
        }
    }

    /// The default (visible) framebuffer
    pub fn screen(&self) -> &CpuSurface {
        &self.screen
    }

    /// Direct access to a texture's pixels
    pub fn texture_surface(&self, texture: TextureHandle) -> Option<&CpuSurface> {
        self.textures.get(texture.0 as usize)
    }

    /// Number of draw calls issued so far
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Current contents of a buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&BufferData> {
        self.buffers.get(buffer.0 as usize).map(|b| &b.data)
    }

    fn program(&self, handle: ProgramHandle) -> Result<&Program, BackendError> {
        self.programs
            .get(handle.0 as usize)
            .ok_or(BackendError::InvalidProgram(handle.0))
    }

    fn active_program(&self) -> Result<&Program, BackendError> {
        let handle = self.current_program.ok_or(BackendError::NoProgram)?;
        self.program(handle)
    }

    fn active_program_mut(&mut self) -> Result<&mut Program, BackendError> {
        let handle = self.current_program.ok_or(BackendError::NoProgram)?;
        self.programs
            .get_mut(handle.0 as usize)
            .ok_or(BackendError::InvalidProgram(handle.0))
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&Buffer, BackendError> {
        self.buffers
            .get(handle.0 as usize)
            .ok_or(BackendError::InvalidBuffer(handle.0))
    }

    fn texture(&self, handle: TextureHandle) -> Result<&CpuSurface, BackendError> {
        self.textures
            .get(handle.0 as usize)
            .ok_or(BackendError::InvalidTexture(handle.0))
    }

    fn framebuffer_texture(
        &self,
        handle: FramebufferHandle,
    ) -> Result<TextureHandle, BackendError> {
        self.framebuffers
            .get(handle.0 as usize)
            .copied()
            .ok_or(BackendError::InvalidFramebuffer(handle.0))
    }

    fn target(&self, framebuffer: Option<FramebufferHandle>) -> Result<&CpuSurface, BackendError> {
        match framebuffer {
            None => Ok(&self.screen),
            Some(fb) => self.texture(self.framebuffer_texture(fb)?),
        }
    }

    fn target_mut(&mut self) -> Result<&mut CpuSurface, BackendError> {
        match self.framebuffer {
            None => Ok(&mut self.screen),
            Some(fb) => {
                let texture = self.framebuffer_texture(fb)?;
                self.textures
                    .get_mut(texture.0 as usize)
                    .ok_or(BackendError::InvalidTexture(texture.0))
            }
        }
    }

    fn indices(&self, count: usize) -> Result<&[u16], BackendError> {
        let handle = self.index_buffer.ok_or(BackendError::NoIndexBuffer)?;
        match &self.buffer(handle)?.data {
            BufferData::U16(indices) if count <= indices.len() => Ok(&indices[..count]),
            BufferData::U16(indices) => Err(BackendError::IndexOutOfRange {
                index: count,
                len: indices.len(),
            }),
            BufferData::F32(_) => Err(BackendError::BufferKind {
                buffer: handle.0,
                expected: "u16 index",
            }),
        }
    }

    /// Fetch a two-component attribute for one vertex
    fn vec2_attribute(
        &self,
        program: &Program,
        name: &str,
        vertex: u16,
    ) -> Result<Vec2, BackendError> {
        let binding = program
            .attributes
            .get(name)
            .ok_or_else(|| BackendError::UnboundAttribute(name.to_string()))?;
        let BufferData::F32(data) = &self.buffer(binding.buffer)?.data else {
            return Err(BackendError::BufferKind {
                buffer: binding.buffer.0,
                expected: "f32 vertex",
            });
        };
        let start = vertex as usize * binding.components;
        match data.get(start..start + 2) {
            Some(xy) => Ok(Vec2::new(xy[0], xy[1])),
            None => Err(BackendError::IndexOutOfRange {
                index: start + 1,
                len: data.len(),
            }),
        }
    }

    fn rasterize_points(
        &self,
        program: &Program,
        indices: &[u16],
        size: Vec2,
    ) -> Result<Vec<Fragment>, BackendError> {
        let transform = program.transform()?;
        let radius = program.float("uRadius")?;
        let [r, g, b] = program.vec3("uColor")?;
        let color = [r, g, b, 1.0];

        let mut fragments = Vec::new();
        if !(radius > 0.0) {
            return Ok(fragments);
        }

        for &index in indices {
            let pos = self.vec2_attribute(program, "pos", index)?;
            let center = to_window(transform, pos, size);
            if !center.is_finite() {
                continue;
            }
            let x_min = (center.x - radius).floor().max(0.0) as u32;
            let y_min = (center.y - radius).floor().max(0.0) as u32;
            let x_max = ((center.x + radius).ceil().max(0.0) as u32).min(size.x as u32);
            let y_max = ((center.y + radius).ceil().max(0.0) as u32).min(size.y as u32);

            for py in y_min..y_max {
                for px in x_min..x_max {
                    let offset = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - center;
                    if offset.length_squared() <= radius * radius {
                        fragments.push((px, py, color));
                    }
                }
            }
        }

        Ok(fragments)
    }

    fn rasterize_quad(
        &self,
        program: &Program,
        indices: &[u16],
        size: Vec2,
    ) -> Result<Vec<Fragment>, BackendError> {
        let transform = program.transform()?;
        let unit = program.sampler("uSampler")?;
        let texture = *self
            .texture_units
            .get(&unit)
            .ok_or(BackendError::NoTexture(unit))?;
        let source = self.texture(texture)?;

        let mut corners = Vec::with_capacity(indices.len());
        for &index in indices {
            let pos = to_window(transform, self.vec2_attribute(program, "pos", index)?, size);
            let uv = self.vec2_attribute(program, "uv", index)?;
            corners.push((pos, uv));
        }

        let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |m, (p, _)| m.min(*p));
        let max = corners.iter().fold(Vec2::splat(f32::NEG_INFINITY), |m, (p, _)| m.max(*p));
        let extent = max - min;
        if !(extent.x > 0.0 && extent.y > 0.0) || !extent.is_finite() {
            return Ok(Vec::new());
        }

        // uv at each bounding-box corner, indexed [bottom/top][left/right]
        let mut grid = [[Vec2::ZERO; 2]; 2];
        for (pos, uv) in &corners {
            let right = (pos.x - min.x) > (max.x - pos.x);
            let top = (pos.y - min.y) > (max.y - pos.y);
            grid[top as usize][right as usize] = *uv;
        }

        let x_start = (min.x - 0.5).ceil().max(0.0) as u32;
        let y_start = (min.y - 0.5).ceil().max(0.0) as u32;
        let x_end = ((max.x - 0.5).ceil().max(0.0) as u32).min(size.x as u32);
        let y_end = ((max.y - 0.5).ceil().max(0.0) as u32).min(size.y as u32);

        let columns = x_end.saturating_sub(x_start) as usize;
        let rows = y_end.saturating_sub(y_start) as usize;
        let mut fragments = Vec::with_capacity(columns * rows);
        for py in y_start..y_end {
            let t = (py as f32 + 0.5 - min.y) / extent.y;
            let left = grid[0][0].lerp(grid[1][0], t);
            let right = grid[0][1].lerp(grid[1][1], t);
            for px in x_start..x_end {
                let s = (px as f32 + 0.5 - min.x) / extent.x;
                let uv = left.lerp(right, s);
                fragments.push((px, py, source.sample_nearest(uv.x, uv.y)));
            }
        }

        Ok(fragments)
    }
}

/// Attribute-space position to framebuffer pixel coordinates
fn to_window(transform: Mat4, pos: Vec2, size: Vec2) -> Vec2 {
    let clip = transform * Vec4::new(pos.x, pos.y, 0.0, 1.0);
    let ndc = Vec2::new(clip.x, clip.y) / clip.w;
    (ndc + Vec2::ONE) * 0.5 * size
}

impl RenderBackend for SoftwareBackend {
    fn create_program(&mut self, source: &ShaderSource<'_>) -> Result<ProgramHandle, BackendError> {
        let interface = ShaderInterface::parse(source)?;
        let handle = ProgramHandle(self.programs.len() as u32);
        debug!(
            "SoftwareBackend: program '{}' -> {:?} (uniforms {:?}, attributes {:?})",
            source.label, handle, interface.uniforms, interface.attributes
        );
        self.programs.push(Program {
            label: source.label.to_string(),
            kind: source.kind,
            interface,
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
        });
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: BufferData,
        usage: BufferUsage,
    ) -> Result<BufferHandle, BackendError> {
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(Buffer { target, usage, data });
        Ok(handle)
    }

    fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        data: BufferData,
    ) -> Result<(), BackendError> {
        let entry = self
            .buffers
            .get_mut(buffer.0 as usize)
            .ok_or(BackendError::InvalidBuffer(buffer.0))?;
        trace!(
            "SoftwareBackend: update {:?} buffer {} ({:?}, {} elements)",
            entry.target,
            buffer.0,
            entry.usage,
            data.len()
        );
        entry.data = data;
        Ok(())
    }

    fn create_texture(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: Option<&[[f32; 4]]>,
    ) -> Result<TextureHandle, BackendError> {
        // Storage is always f32 regardless of the requested format
        trace!("SoftwareBackend::create_texture: {width}x{height} {format:?}");
        let mut surface = CpuSurface::new(width, height);
        if let Some(pixels) = pixels {
            if !surface.upload(pixels) {
                return Err(BackendError::DimensionMismatch {
                    expected: surface.pixel_count(),
                    actual: pixels.len(),
                });
            }
        }
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(surface);
        Ok(handle)
    }

    fn create_framebuffer(
        &mut self,
        texture: TextureHandle,
    ) -> Result<FramebufferHandle, BackendError> {
        self.texture(texture)?;
        let handle = FramebufferHandle(self.framebuffers.len() as u32);
        self.framebuffers.push(texture);
        Ok(handle)
    }

    fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), BackendError> {
        if let Some(handle) = program {
            self.program(handle)?;
        }
        self.current_program = program;
        Ok(())
    }

    fn bound_framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    fn bind_framebuffer(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Result<(), BackendError> {
        if let Some(handle) = framebuffer {
            self.framebuffer_texture(handle)?;
        }
        self.framebuffer = framebuffer;
        Ok(())
    }

    fn blend(&self) -> BlendState {
        self.blend
    }

    fn set_blend(&mut self, blend: BlendState) {
        self.blend = blend;
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BackendError> {
        let program = self.active_program_mut()?;
        if !program.interface.has_uniform(name) {
            return Err(BackendError::UnknownUniform {
                program: program.label.clone(),
                name: name.to_string(),
            });
        }
        program.uniforms.insert(name.to_string(), value);
        Ok(())
    }

    fn uniform(
        &self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<Option<UniformValue>, BackendError> {
        let program = self.program(program)?;
        if !program.interface.has_uniform(name) {
            return Err(BackendError::UnknownUniform {
                program: program.label.clone(),
                name: name.to_string(),
            });
        }
        Ok(program.uniforms.get(name).copied())
    }

    fn bind_attribute(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        components: usize,
    ) -> Result<(), BackendError> {
        if !matches!(self.buffer(buffer)?.data, BufferData::F32(_)) {
            return Err(BackendError::BufferKind {
                buffer: buffer.0,
                expected: "f32 vertex",
            });
        }
        let program = self.active_program_mut()?;
        if !program.interface.has_attribute(name) {
            return Err(BackendError::UnknownAttribute {
                program: program.label.clone(),
                name: name.to_string(),
            });
        }
        program
            .attributes
            .insert(name.to_string(), AttributeBinding { buffer, components });
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) -> Result<(), BackendError> {
        if !matches!(self.buffer(buffer)?.data, BufferData::U16(_)) {
            return Err(BackendError::BufferKind {
                buffer: buffer.0,
                expected: "u16 index",
            });
        }
        self.index_buffer = Some(buffer);
        Ok(())
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        texture: Option<TextureHandle>,
    ) -> Result<(), BackendError> {
        match texture {
            Some(handle) => {
                self.texture(handle)?;
                self.texture_units.insert(unit, handle);
            }
            None => {
                self.texture_units.remove(&unit);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), BackendError> {
        self.target_mut()?.clear(color);
        Ok(())
    }

    fn draw_elements(&mut self, primitive: Primitive, count: usize) -> Result<(), BackendError> {
        let program = self.active_program()?;
        let indices = self.indices(count)?;
        let target = self.target(self.framebuffer)?;
        let size = Vec2::new(target.width as f32, target.height as f32);

        let fragments = match (program.kind, primitive) {
            (ShaderKind::Stamp, Primitive::Points) => {
                self.rasterize_points(program, indices, size)?
            }
            (ShaderKind::Blit, Primitive::TriangleFan) if count == 4 => {
                self.rasterize_quad(program, indices, size)?
            }
            _ => return Err(BackendError::UnsupportedDraw { primitive, count }),
        };

        trace!(
            "SoftwareBackend: {:?} x{} with '{}' -> {} fragments",
            primitive,
            count,
            program.label,
            fragments.len()
        );

        let blend = self.blend;
        let target = self.target_mut()?;
        for (x, y, color) in fragments {
            target.blend_pixel(x, y, color, &blend);
        }
        self.draw_calls += 1;
        Ok(())
    }

    fn read_pixels(
        &self,
        framebuffer: Option<FramebufferHandle>,
    ) -> Result<Vec<[f32; 4]>, BackendError> {
        Ok(self.target(framebuffer)?.pixels().to_vec())
    }
}
