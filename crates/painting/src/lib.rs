//! Impasto painting core - stroke generation, brush stamping and layer compositing
//!
//! This crate turns pointer drags into brush strokes on a stack of layers:
//! - [`geometry`] - Distance, midpoint and quadratic Bezier arc length
//! - [`stroke`] - Evenly spaced stamp placement along lines and curves
//! - [`brush`] - Brush state and stamp draw calls
//! - [`layers`] - Off-screen layers and premultiplied compositing
//! - [`view`] - Projection and pan matrices
//! - [`session`] - Pointer/key event router and gesture state machine
//! - [`backend`] - Rendering backend trait, scoped state guard and a CPU implementation
//! - [`surface`] - Float RGBA CPU surface backing the software backend

pub mod backend;
pub mod brush;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod layers;
pub mod raster;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod view;

pub use backend::{BackendError, RenderBackend, SoftwareBackend, StateScope};
pub use brush::Brush;
pub use constants::*;
pub use error::PaintError;
pub use geometry::{distance, midpoint, quadratic_bezier_length, Point, QuadraticBezier};
pub use layers::{Layer, LayerStack};
pub use raster::ImageData;
pub use session::{Gesture, Key, KeyEvent, PaintSession, PointerEvent, PointerPhase, Tool};
pub use stroke::{CurveStamps, StampRun, StrokeGenerator, StrokeSegment};
pub use surface::CpuSurface;
pub use view::ViewTransform;
