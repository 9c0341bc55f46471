//! Scoped save/restore of the backend's global binding state.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::{BackendState, RenderBackend};

/// Restores the backend's program, framebuffer and blend state on drop
///
/// Entering a scope snapshots the caller's state. Whatever the scope does
/// to the current program or binding is undone when it ends, including
/// early returns through `?`.
///
/// ```ignore
/// let mut gl = StateScope::enter(backend);
/// gl.use_program(Some(brush_program))?;
/// gl.set_uniform("uColor", UniformValue::Vec3(color))?;
/// // previous program is current again here
/// ```
pub struct StateScope<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    saved: BackendState,
}

impl<'a, B: RenderBackend + ?Sized> StateScope<'a, B> {
    pub fn enter(backend: &'a mut B) -> Self {
        let saved = backend.state();
        Self { backend, saved }
    }

    /// State that will be restored when the scope ends
    pub fn saved(&self) -> BackendState {
        self.saved
    }
}

impl<B: RenderBackend + ?Sized> Deref for StateScope<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> DerefMut for StateScope<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> Drop for StateScope<'_, B> {
    fn drop(&mut self) {
        if let Err(err) = self.backend.restore(self.saved) {
            warn!("StateScope: failed to restore backend state: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BlendState, PixelFormat, ShaderSource, SoftwareBackend};

    fn failing_draw(backend: &mut SoftwareBackend) -> Result<(), BackendError> {
        let mut gl = StateScope::enter(backend);
        let program = gl.create_program(&ShaderSource::stamp())?;
        gl.use_program(Some(program))?;
        gl.set_blend(BlendState::STAMP);
        // No index buffer bound: fails after the state was changed
        gl.draw_elements(crate::backend::Primitive::Points, 1)
    }

    #[test]
    fn test_restores_on_drop() {
        let mut gl = SoftwareBackend::new(8, 8);
        let target = gl.create_render_target(PixelFormat::Rgba32Float, 8, 8).unwrap();
        {
            let mut scope = StateScope::enter(&mut gl);
            assert_eq!(scope.saved().framebuffer, None);
            scope.bind_framebuffer(Some(target.framebuffer)).unwrap();
            scope.set_blend(BlendState::OVER);
        }
        assert_eq!(gl.bound_framebuffer(), None);
        assert_eq!(gl.blend(), BlendState::OVERWRITE);
    }

    #[test]
    fn test_restores_on_error_path() {
        let mut gl = SoftwareBackend::new(8, 8);
        let before = gl.state();
        assert!(failing_draw(&mut gl).is_err());
        assert_eq!(gl.state(), before);
    }
}
