//! Layer stack and compositing
//!
//! Each layer is an off-screen float render target holding premultiplied
//! color. Compositing clears the destination and draws every layer as a
//! full-canvas quad, bottom to top, with the premultiplied "over" blend
//! `(ONE, ONE_MINUS_SRC_ALPHA)`. Straight-alpha blending here would darken
//! edges by applying alpha a second time.
//!
//! Panning never touches layer contents; only the model-view matrix used
//! for the composite quad changes.

use glam::Mat4;
use tracing::{debug, info};

use crate::backend::{
    BlendState, BufferData, BufferHandle, BufferTarget, BufferUsage, FramebufferHandle,
    PixelFormat, Primitive, ProgramHandle, RenderBackend, RenderTarget, ShaderSource, StateScope,
    TextureHandle, UniformValue,
};
use crate::constants::{COMPOSITE_CLEAR_COLOR, COMPOSITE_TEXTURE_UNIT};
use crate::error::PaintError;
use crate::raster::ImageData;
use crate::view::ViewTransform;

/// One paintable off-screen image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
    target: RenderTarget,
}

impl Layer {
    /// Blank, fully transparent layer
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<Self, PaintError> {
        let target = backend.create_render_target(PixelFormat::Rgba32Float, width, height)?;
        Ok(Self { target })
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    /// Texture the compositor samples this layer through
    pub fn texture(&self) -> TextureHandle {
        self.target.texture
    }

    pub fn framebuffer(&self) -> FramebufferHandle {
        self.target.framebuffer
    }

    pub fn width(&self) -> u32 {
        self.target.width
    }

    pub fn height(&self) -> u32 {
        self.target.height
    }

    /// Route subsequent draws into this layer
    ///
    /// Changes the backend's framebuffer binding; callers that need the
    /// old binding back should do this inside a [`StateScope`].
    pub fn bind<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<(), PaintError> {
        backend.bind_framebuffer(Some(self.target.framebuffer))?;
        Ok(())
    }
}

/// Blit program and the quad geometry it draws
#[derive(Debug)]
struct QuadPass {
    program: ProgramHandle,
    canvas_positions: BufferHandle,
    image_positions: BufferHandle,
    uv: BufferHandle,
    flipped_uv: BufferHandle,
    indices: BufferHandle,
}

impl QuadPass {
    fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        width: f32,
        height: f32,
    ) -> Result<Self, PaintError> {
        let program = backend.create_program(&ShaderSource::blit())?;

        let mut array = |data: Vec<f32>, usage: BufferUsage| {
            backend.create_buffer(BufferTarget::Array, BufferData::F32(data), usage)
        };
        let canvas_positions = array(quad(0.0, 0.0, width, height), BufferUsage::StaticDraw)?;
        let image_positions = array(quad(0.0, 0.0, width, height), BufferUsage::DynamicDraw)?;
        let uv = array(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], BufferUsage::StaticDraw)?;
        // Decoded images are stored top row first
        let flipped_uv = array(
            vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            BufferUsage::StaticDraw,
        )?;

        let indices = backend.create_buffer(
            BufferTarget::ElementArray,
            BufferData::U16(vec![0, 1, 2, 3]),
            BufferUsage::StaticDraw,
        )?;

        Ok(Self {
            program,
            canvas_positions,
            image_positions,
            uv,
            flipped_uv,
            indices,
        })
    }

    /// Bind the program and set everything but the source texture
    fn prepare<B: RenderBackend + ?Sized>(
        &self,
        gl: &mut B,
        projection: Mat4,
        model_view: Mat4,
        positions: BufferHandle,
        uv: BufferHandle,
        blend: BlendState,
    ) -> Result<(), PaintError> {
        gl.use_program(Some(self.program))?;
        gl.set_uniform("projMatrix", UniformValue::Mat4(projection))?;
        gl.set_uniform("mvMatrix", UniformValue::Mat4(model_view))?;
        gl.set_uniform("uSampler", UniformValue::Sampler(COMPOSITE_TEXTURE_UNIT))?;
        gl.bind_attribute("pos", positions, 2)?;
        gl.bind_attribute("uv", uv, 2)?;
        gl.bind_index_buffer(self.indices)?;
        gl.set_blend(blend);
        Ok(())
    }

    fn draw<B: RenderBackend + ?Sized>(
        &self,
        gl: &mut B,
        texture: TextureHandle,
    ) -> Result<(), PaintError> {
        gl.bind_texture(COMPOSITE_TEXTURE_UNIT, Some(texture))?;
        gl.draw_elements(Primitive::TriangleFan, 4)?;
        Ok(())
    }
}

/// Fan-ordered corners of an axis-aligned rectangle
fn quad(x: f32, y: f32, width: f32, height: f32) -> Vec<f32> {
    vec![x, y, x + width, y, x + width, y + height, x, y + height]
}

/// Ordered layers, back to front, plus at most one active layer
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<usize>,
    width: u32,
    height: u32,
    quad: QuadPass,
}

impl LayerStack {
    /// Empty stack for a `width` x `height` canvas
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<Self, PaintError> {
        let quad = QuadPass::new(backend, width as f32, height as f32)?;
        Ok(Self {
            layers: Vec::new(),
            active: None,
            width,
            height,
            quad,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Append on top. Returns the new layer's index.
    pub fn add_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    /// Append a blank layer
    pub fn new_layer<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<usize, PaintError> {
        let layer = Layer::new(backend, width, height)?;
        let index = self.add_layer(layer);
        info!("LayerStack: new layer {} ({}x{})", index, width, height);
        Ok(index)
    }

    /// Append a layer holding `image`, anchored at the canvas's top-left
    pub fn load_image<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        image: &ImageData,
        view: &ViewTransform,
    ) -> Result<usize, PaintError> {
        let layer = Layer::new(backend, self.width, self.height)?;
        self.blit_image(backend, &layer, image, view)?;

        let index = self.add_layer(layer);
        info!(
            "LayerStack: loaded {}x{} image into layer {}",
            image.width, image.height, index
        );
        Ok(index)
    }

    /// Draw `image` into the existing layer at `index`, anchored top-left
    ///
    /// The covered pixels are replaced outright (`ONE, ZERO`) instead of
    /// blended with what the layer already holds. Pixels outside the image
    /// are left alone.
    pub fn draw_image<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        index: usize,
        image: &ImageData,
        view: &ViewTransform,
    ) -> Result<(), PaintError> {
        let layer = self.layers.get(index).ok_or(PaintError::LayerOutOfRange {
            index,
            len: self.layers.len(),
        })?;
        self.blit_image(backend, layer, image, view)
    }

    fn blit_image<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        layer: &Layer,
        image: &ImageData,
        view: &ViewTransform,
    ) -> Result<(), PaintError> {
        let texture = backend.create_texture(
            PixelFormat::Rgba32Float,
            image.width,
            image.height,
            Some(&image.premultiplied()),
        )?;

        let mut gl = StateScope::enter(backend);
        layer.bind(&mut *gl)?;

        let top = self.height as f32;
        let (w, h) = (image.width as f32, image.height as f32);
        let corners = quad(0.0, top - h, w, h);
        gl.update_buffer(self.quad.image_positions, BufferData::F32(corners))?;

        // Layer space: no pan applies to layer contents
        self.quad.prepare(
            &mut *gl,
            view.projection,
            Mat4::IDENTITY,
            self.quad.image_positions,
            self.quad.flipped_uv,
            BlendState::OVERWRITE,
        )?;
        self.quad.draw(&mut *gl, texture)
    }

    /// Mark the layer at `index` as the one strokes draw into
    pub fn set_active(&mut self, index: usize) -> Result<(), PaintError> {
        if index >= self.layers.len() {
            return Err(PaintError::LayerOutOfRange {
                index,
                len: self.layers.len(),
            });
        }
        self.active = Some(index);
        debug!("LayerStack: active layer {}", index);
        Ok(())
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.layers.get(i))
    }

    /// Bind the active layer's framebuffer
    pub fn activate<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<(), PaintError> {
        self.active_layer()
            .ok_or(PaintError::NoActiveLayer)?
            .bind(backend)
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Clear `destination` (`None` for the screen) and draw every layer
    /// onto it, bottom to top, through the view's pan
    pub fn composite<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        destination: Option<FramebufferHandle>,
        view: &ViewTransform,
    ) -> Result<(), PaintError> {
        if self.layers.is_empty() {
            debug!("LayerStack::composite: no layers, nothing to do");
            return Ok(());
        }

        let mut gl = StateScope::enter(backend);
        gl.bind_framebuffer(destination)?;
        gl.clear(COMPOSITE_CLEAR_COLOR)?;
        self.quad.prepare(
            &mut *gl,
            view.projection,
            view.model_view,
            self.quad.canvas_positions,
            self.quad.uv,
            BlendState::OVER,
        )?;
        for layer in &self.layers {
            self.quad.draw(&mut *gl, layer.texture())?;
        }

        debug!("LayerStack::composite: {} layers", self.layers.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;

    fn setup(size: u32) -> (SoftwareBackend, LayerStack, ViewTransform) {
        let mut gl = SoftwareBackend::new(size, size);
        let stack = LayerStack::new(&mut gl, size, size).unwrap();
        let view = ViewTransform::new(size as f32, size as f32);
        (gl, stack, view)
    }

    /// Clear one layer to a solid premultiplied color
    fn fill(gl: &mut SoftwareBackend, stack: &LayerStack, index: usize, color: [f32; 4]) {
        let mut scope = StateScope::enter(gl);
        stack.get(index).unwrap().bind(&mut *scope).unwrap();
        scope.clear(color).unwrap();
    }

    #[test]
    fn test_composite_empty_stack_is_noop() {
        let (mut gl, stack, view) = setup(4);
        gl.clear([1.0, 0.0, 0.0, 1.0]).unwrap();
        stack.composite(&mut gl, None, &view).unwrap();
        assert_eq!(gl.screen().get_pixel(2, 2), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(gl.draw_calls(), 0);
    }

    #[test]
    fn test_composite_order_and_premultiplied_over() {
        let (mut gl, mut stack, view) = setup(4);
        let bottom = stack.new_layer(&mut gl, 4, 4).unwrap();
        let top = stack.new_layer(&mut gl, 4, 4).unwrap();
        fill(&mut gl, &stack, bottom, [1.0, 0.0, 0.0, 1.0]);
        fill(&mut gl, &stack, top, [0.0, 0.0, 0.5, 0.5]);

        stack.composite(&mut gl, None, &view).unwrap();
        assert_eq!(gl.screen().get_pixel(1, 1), Some([0.5, 0.0, 0.5, 1.0]));
    }

    #[test]
    fn test_composite_twice_is_stable() {
        let (mut gl, mut stack, view) = setup(8);
        let index = stack.new_layer(&mut gl, 8, 8).unwrap();
        fill(&mut gl, &stack, index, [0.2, 0.1, 0.0, 0.4]);

        stack.composite(&mut gl, None, &view).unwrap();
        let first = gl.read_pixels(None).unwrap();
        stack.composite(&mut gl, None, &view).unwrap();
        assert_eq!(gl.read_pixels(None).unwrap(), first);
    }

    #[test]
    fn test_composite_restores_binding() {
        let (mut gl, mut stack, view) = setup(4);
        let index = stack.new_layer(&mut gl, 4, 4).unwrap();
        let fb = stack.get(index).unwrap().framebuffer();
        gl.bind_framebuffer(Some(fb)).unwrap();
        gl.set_blend(BlendState::STAMP);

        stack.composite(&mut gl, None, &view).unwrap();

        assert_eq!(gl.bound_framebuffer(), Some(fb));
        assert_eq!(gl.blend(), BlendState::STAMP);
        assert_eq!(gl.current_program(), None);
    }

    #[test]
    fn test_composite_follows_pan() {
        let (mut gl, mut stack, mut view) = setup(4);
        let image = ImageData::solid(4, 4, [1.0, 0.0, 0.0, 1.0]);
        stack.load_image(&mut gl, &image, &view).unwrap();

        view.pan(glam::Vec2::new(1.0, 0.0));
        stack.composite(&mut gl, None, &view).unwrap();

        assert_eq!(gl.screen().get_pixel(0, 2), Some([0.0; 4]));
        assert_eq!(gl.screen().get_pixel(1, 2), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(gl.screen().get_pixel(3, 2), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_load_image_premultiplies_and_flips() {
        let (mut gl, mut stack, view) = setup(4);
        let red = [1.0, 0.0, 0.0, 1.0];
        let half_green = [0.0, 1.0, 0.0, 0.5];
        // 2x2 image, top row red, bottom row half-transparent green
        let image = ImageData::new(2, 2, vec![red, red, half_green, half_green]).unwrap();

        let index = stack.load_image(&mut gl, &image, &view).unwrap();
        let layer = gl.texture_surface(stack.get(index).unwrap().texture()).unwrap();

        // Anchored top-left: the image covers rows 2 and 3 (row 0 is the bottom)
        assert_eq!(layer.get_pixel(0, 3), Some(red));
        assert_eq!(layer.get_pixel(1, 2), Some([0.0, 0.5, 0.0, 0.5]));
        assert_eq!(layer.get_pixel(0, 1), Some([0.0; 4]));
        assert_eq!(layer.get_pixel(3, 3), Some([0.0; 4]));
        assert_eq!(gl.blend(), BlendState::default());
    }

    #[test]
    fn test_draw_image_replaces_existing_pixels() {
        let (mut gl, mut stack, view) = setup(4);
        let index = stack.new_layer(&mut gl, 4, 4).unwrap();
        let blue = [0.0, 0.0, 1.0, 1.0];
        fill(&mut gl, &stack, index, blue);

        let half_green = [0.0, 1.0, 0.0, 0.5];
        let image = ImageData::solid(2, 2, half_green);
        stack.draw_image(&mut gl, index, &image, &view).unwrap();

        let layer = gl.texture_surface(stack.get(index).unwrap().texture()).unwrap();
        // Blending over blue would leave alpha at 1
        assert_eq!(layer.get_pixel(0, 3), Some([0.0, 0.5, 0.0, 0.5]));
        assert_eq!(layer.get_pixel(1, 2), Some([0.0, 0.5, 0.0, 0.5]));
        assert_eq!(layer.get_pixel(2, 3), Some(blue));
        assert_eq!(layer.get_pixel(0, 1), Some(blue));
        assert_eq!(gl.bound_framebuffer(), None);
    }

    #[test]
    fn test_draw_image_checks_index() {
        let (mut gl, stack, view) = setup(4);
        let image = ImageData::solid(1, 1, [1.0; 4]);
        assert!(matches!(
            stack.draw_image(&mut gl, 0, &image, &view),
            Err(PaintError::LayerOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_set_active_bounds() {
        let (mut gl, mut stack, _) = setup(4);
        assert!(matches!(
            stack.set_active(0),
            Err(PaintError::LayerOutOfRange { index: 0, len: 0 })
        ));
        assert!(matches!(stack.activate(&mut gl), Err(PaintError::NoActiveLayer)));

        let index = stack.new_layer(&mut gl, 4, 4).unwrap();
        stack.set_active(index).unwrap();
        assert_eq!(stack.active(), Some(index));
        stack.activate(&mut gl).unwrap();
        assert_eq!(gl.bound_framebuffer(), Some(stack.get(index).unwrap().framebuffer()));
    }
}
