//! Pointer gesture handling for the paint session

use tracing::{debug, info};

use crate::backend::RenderBackend;
use crate::error::PaintError;
use crate::geometry::{midpoint, Point};

use super::{Gesture, PaintSession, Tool};

impl PaintSession {
    pub(super) fn pointer_down<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Point,
    ) -> Result<(), PaintError> {
        if self.gesture != Gesture::Idle {
            debug!("pointer_down: previous gesture never ended, starting over");
            self.gesture = Gesture::Idle;
        }

        match self.tool {
            Tool::Brush => {
                if self.layers.active_layer().is_none() {
                    return Err(PaintError::NoActiveLayer);
                }
                self.brush.set_transform(backend, &self.view)?;
                self.paint(backend, |brush, gl| {
                    brush.draw_points(gl, &[position.x, position.y])
                })?;
                self.composite(backend)?;

                info!("Stroke begin at ({:.1}, {:.1})", position.x, position.y);
                self.gesture = Gesture::Drawing {
                    last_mouse: position,
                    last_midpoint: None,
                    last_brush: position,
                };
            }
            Tool::Pan => {
                debug!("Pan begin at ({:.1}, {:.1})", position.x, position.y);
                self.gesture = Gesture::Panning {
                    last_mouse: position,
                };
            }
        }
        Ok(())
    }

    pub(super) fn pointer_move<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Point,
    ) -> Result<(), PaintError> {
        match self.gesture {
            Gesture::Idle => Ok(()),
            Gesture::Drawing {
                last_mouse,
                last_midpoint,
                last_brush,
            } => {
                let mid = midpoint(last_mouse, position);
                let brush_point = match last_midpoint {
                    // The first segment has no previous midpoint to curve from
                    None => self.paint(backend, |brush, gl| brush.line(gl, last_mouse, mid))?,
                    Some(last_mid) => self.paint(backend, |brush, gl| {
                        brush.curve(gl, last_mid, last_mouse, mid, Some(last_brush))
                    })?,
                };
                self.composite(backend)?;

                self.gesture = Gesture::Drawing {
                    last_mouse: position,
                    last_midpoint: Some(mid),
                    last_brush: brush_point,
                };
                Ok(())
            }
            Gesture::Panning { last_mouse } => {
                self.view.pan(position - last_mouse);
                self.composite(backend)?;
                self.gesture = Gesture::Panning {
                    last_mouse: position,
                };
                Ok(())
            }
        }
    }

    pub(super) fn pointer_up<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Point,
    ) -> Result<(), PaintError> {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            Gesture::Idle => {}
            Gesture::Drawing { last_brush, .. } => {
                let last = self.paint(backend, |brush, gl| brush.line(gl, last_brush, position))?;
                self.composite(backend)?;
                info!("Stroke end at ({:.1}, {:.1})", last.x, last.y);
            }
            Gesture::Panning { .. } => {
                debug!("Pan end, offset {:?}", self.view.offset());
            }
        }
        Ok(())
    }
}
