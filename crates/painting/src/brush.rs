//! Round brush: stroke appearance and stamp drawing
//!
//! The brush owns its stamp program and a pair of dynamic buffers. Stamp
//! positions come from a [`StrokeGenerator`] and are uploaded as one batch
//! of point primitives per straight run.
//!
//! Every method that touches the backend enters a [`StateScope`], so the
//! caller's current program, framebuffer and blend function survive.

use impasto_config::{is_usable_radius, spacing_for_radius, BrushConfig};
use tracing::debug;

use crate::backend::{
    BlendState, BufferData, BufferHandle, BufferTarget, BufferUsage, Primitive, ProgramHandle,
    RenderBackend, ShaderSource, StateScope, UniformValue,
};
use crate::constants::MAX_STAMPS_PER_DRAW;
use crate::error::PaintError;
use crate::geometry::Point;
use crate::stroke::StrokeGenerator;
use crate::view::ViewTransform;

/// Brush state and the GPU resources it draws with
#[derive(Debug)]
pub struct Brush {
    radius: f32,
    color: [f32; 3],
    generator: StrokeGenerator,
    program: ProgramHandle,
    positions: BufferHandle,
    indices: BufferHandle,
}

impl Brush {
    /// Build the stamp program and push the initial uniforms
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        config: &BrushConfig,
        view: &ViewTransform,
    ) -> Result<Self, PaintError> {
        let radius = validate_radius(config.radius)?;
        let color = validate_color(config.color)?;

        let program = backend.create_program(&ShaderSource::stamp())?;
        let positions = backend.create_buffer(
            BufferTarget::Array,
            BufferData::F32(Vec::new()),
            BufferUsage::DynamicDraw,
        )?;
        let indices = backend.create_buffer(
            BufferTarget::ElementArray,
            BufferData::U16(Vec::new()),
            BufferUsage::DynamicDraw,
        )?;

        let brush = Self {
            radius,
            color,
            generator: StrokeGenerator::new(spacing_for_radius(radius)),
            program,
            positions,
            indices,
        };

        {
            let mut gl = StateScope::enter(backend);
            gl.use_program(Some(program))?;
            gl.set_uniform("uRadius", UniformValue::F32(radius))?;
            gl.set_uniform("uColor", UniformValue::Vec3(color))?;
            gl.set_uniform("projMatrix", UniformValue::Mat4(view.projection))?;
            gl.set_uniform("mvMatrix", UniformValue::Mat4(view.inverse_model_view))?;
        }

        debug!(
            "Brush::new: radius={} spacing={} color={:?}",
            radius,
            brush.spacing(),
            color
        );
        Ok(brush)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    /// Distance between consecutive stamps
    pub fn spacing(&self) -> f32 {
        self.generator.spacing()
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// The stamp placement this brush uses
    pub fn generator(&self) -> &StrokeGenerator {
        &self.generator
    }

    /// Replace the color. Channels are clamped to [0, 1].
    pub fn set_color<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        color: [f32; 3],
    ) -> Result<(), PaintError> {
        let color = validate_color(color)?;
        {
            let mut gl = StateScope::enter(backend);
            gl.use_program(Some(self.program))?;
            gl.set_uniform("uColor", UniformValue::Vec3(color))?;
        }
        self.color = color;
        Ok(())
    }

    /// Replace the radius and recompute the spacing from it
    pub fn set_radius<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        radius: f32,
    ) -> Result<(), PaintError> {
        let radius = validate_radius(radius)?;
        {
            let mut gl = StateScope::enter(backend);
            gl.use_program(Some(self.program))?;
            gl.set_uniform("uRadius", UniformValue::F32(radius))?;
        }
        self.radius = radius;
        self.generator = StrokeGenerator::new(spacing_for_radius(radius));
        Ok(())
    }

    /// Push the view's projection and screen-to-layer matrices
    pub fn set_transform<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        view: &ViewTransform,
    ) -> Result<(), PaintError> {
        let mut gl = StateScope::enter(backend);
        gl.use_program(Some(self.program))?;
        gl.set_uniform("projMatrix", UniformValue::Mat4(view.projection))?;
        gl.set_uniform("mvMatrix", UniformValue::Mat4(view.inverse_model_view))?;
        Ok(())
    }

    /// Draw stamps at the flat `[x0, y0, x1, y1, ...]` positions
    ///
    /// Draws into whatever framebuffer the caller has bound. Overwrites the
    /// shared position and index buffers.
    pub fn draw_points<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        points: &[f32],
    ) -> Result<(), PaintError> {
        if points.len() % 2 != 0 {
            return Err(PaintError::OddCoordinateCount(points.len()));
        }
        if points.is_empty() {
            return Ok(());
        }

        let mut gl = StateScope::enter(backend);
        gl.use_program(Some(self.program))?;
        gl.set_blend(BlendState::STAMP);

        for chunk in points.chunks(MAX_STAMPS_PER_DRAW * 2) {
            let count = chunk.len() / 2;
            let indices: Vec<u16> = (0..count as u16).collect();

            gl.update_buffer(self.positions, BufferData::F32(chunk.to_vec()))?;
            gl.bind_attribute("pos", self.positions, 2)?;
            gl.update_buffer(self.indices, BufferData::U16(indices))?;
            gl.bind_index_buffer(self.indices)?;
            gl.draw_elements(Primitive::Points, count)?;
        }

        Ok(())
    }

    /// Stamp a straight segment. Returns the last stamp, or `start` if none fit.
    pub fn line<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        start: Point,
        end: Point,
    ) -> Result<Point, PaintError> {
        let run = self.generator.line(start, end);
        debug!(
            "Brush::line: ({:.1}, {:.1}) -> ({:.1}, {:.1}), {} stamps",
            start.x,
            start.y,
            end.x,
            end.y,
            run.len()
        );
        self.draw_points(backend, &run.flat())?;
        Ok(run.last)
    }

    /// Stamp a quadratic curve, continuing from `last` (defaults to `anchor`)
    ///
    /// Returns the point the next segment should continue from.
    pub fn curve<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        anchor: Point,
        control: Point,
        end: Point,
        last: Option<Point>,
    ) -> Result<Point, PaintError> {
        let stamps = self
            .generator
            .curve(anchor, control, end, last.unwrap_or(anchor));
        debug!(
            "Brush::curve: ({:.1}, {:.1}) -> ({:.1}, {:.1}), {} stamps in {} runs",
            anchor.x,
            anchor.y,
            end.x,
            end.y,
            stamps.stamp_count(),
            stamps.runs.len()
        );
        for run in &stamps.runs {
            self.draw_points(backend, &run.flat())?;
        }
        Ok(stamps.last)
    }
}

fn validate_radius(radius: f32) -> Result<f32, PaintError> {
    if is_usable_radius(radius) {
        Ok(radius)
    } else {
        Err(PaintError::InvalidRadius(radius))
    }
}

fn validate_color(color: [f32; 3]) -> Result<[f32; 3], PaintError> {
    if color.iter().all(|c| c.is_finite()) {
        Ok(color.map(|c| c.clamp(0.0, 1.0)))
    } else {
        Err(PaintError::InvalidColor(color))
    }
}
