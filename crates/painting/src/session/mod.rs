//! Paint session: routes pointer and key input to the brush and layers
//!
//! A session owns everything a drag gesture needs between events: the
//! brush, the layer stack, the view transform, the selected tool and the
//! gesture state machine. Input arrives one event at a time:
//! - [`PaintSession::handle_pointer`] for down/move/up
//! - [`PaintSession::handle_key`] for tool selection
//!
//! Every drawing event recomposites the stack to the screen.

mod events;
mod gesture;

use std::collections::HashSet;

use impasto_config::ImpastoConfig;
use tracing::{debug, info};

use crate::backend::{RenderBackend, StateScope};
use crate::brush::Brush;
use crate::error::PaintError;
use crate::geometry::Point;
use crate::layers::LayerStack;
use crate::view::ViewTransform;

pub use events::{Key, KeyEvent, PointerEvent, PointerPhase, Tool};

/// Gesture state carried between pointer events
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing {
        /// Pointer position of the previous event
        last_mouse: Point,
        /// Midpoint reached by the previous segment; `None` before the first move
        last_midpoint: Option<Point>,
        /// Last stamp drawn, where the next segment continues from
        last_brush: Point,
    },
    Panning {
        last_mouse: Point,
    },
}

/// Interactive painting state for one canvas
#[derive(Debug)]
pub struct PaintSession {
    brush: Brush,
    layers: LayerStack,
    view: ViewTransform,
    tool: Tool,
    gesture: Gesture,
    held_keys: HashSet<Key>,
}

impl PaintSession {
    /// Session with an empty layer stack sized to the configured canvas
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        config: &ImpastoConfig,
    ) -> Result<Self, PaintError> {
        let canvas = &config.canvas;
        let view = ViewTransform::new(canvas.width_f32(), canvas.height_f32());
        let layers = LayerStack::new(backend, canvas.width, canvas.height)?;
        let brush = Brush::new(backend, &config.brush, &view)?;

        info!(
            "PaintSession: {}x{} canvas, brush radius {}",
            canvas.width, canvas.height, config.brush.radius
        );

        Ok(Self {
            brush,
            layers,
            view,
            tool: Tool::default(),
            gesture: Gesture::Idle,
            held_keys: HashSet::new(),
        })
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn set_color<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        color: [f32; 3],
    ) -> Result<(), PaintError> {
        self.brush.set_color(backend, color)
    }

    pub fn set_radius<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        radius: f32,
    ) -> Result<(), PaintError> {
        self.brush.set_radius(backend, radius)
    }

    /// Update the tool from a key event. Returns the tool now selected.
    ///
    /// Holding space selects panning; releasing any key goes back to the
    /// brush. Key-downs for a key that is already held are auto-repeats and
    /// are ignored. The new tool applies from the next pointer-down.
    pub fn handle_key(&mut self, event: KeyEvent) -> Tool {
        let previous = self.tool;
        if event.pressed {
            if !self.held_keys.insert(event.key) {
                return self.tool;
            }
            if event.key == Key::Space {
                self.tool = Tool::Pan;
            }
        } else {
            self.held_keys.remove(&event.key);
            self.tool = Tool::Brush;
        }

        if self.tool != previous {
            info!("PaintSession: tool {:?} -> {:?}", previous, self.tool);
        }
        self.tool
    }

    /// Advance the gesture state machine by one pointer event
    pub fn handle_pointer<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        event: PointerEvent,
    ) -> Result<(), PaintError> {
        match event.phase {
            PointerPhase::Down => self.pointer_down(backend, event.position),
            PointerPhase::Move => self.pointer_move(backend, event.position),
            PointerPhase::Up => self.pointer_up(backend, event.position),
        }
    }

    /// Stamp a curve into the active layer outside of any gesture
    ///
    /// Returns the last stamp drawn.
    pub fn draw_curve<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        anchor: Point,
        control: Point,
        end: Point,
    ) -> Result<Point, PaintError> {
        self.brush.set_transform(backend, &self.view)?;
        let last = self.paint(backend, |brush, gl| brush.curve(gl, anchor, control, end, None))?;
        self.composite(backend)?;
        Ok(last)
    }

    /// Composite every layer onto the screen through the current view
    pub fn composite<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<(), PaintError> {
        self.layers.composite(backend, None, &self.view)
    }

    /// Run a brush operation with the active layer bound
    fn paint<B, T, F>(&self, backend: &mut B, draw: F) -> Result<T, PaintError>
    where
        B: RenderBackend + ?Sized,
        F: FnOnce(&Brush, &mut B) -> Result<T, PaintError>,
    {
        let mut gl = StateScope::enter(backend);
        self.layers.activate(&mut *gl)?;
        debug!("PaintSession: drawing into layer {:?}", self.layers.active());
        draw(&self.brush, &mut *gl)
    }
}
