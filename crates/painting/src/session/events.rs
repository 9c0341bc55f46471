//! Input events consumed by the paint session

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Where a pointer event falls within a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Pointer position in canvas pixels, y pointing up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub position: Point,
    pub phase: PointerPhase,
}

impl PointerEvent {
    pub fn new(position: Point, phase: PointerPhase) -> Self {
        Self { position, phase }
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(Point::new(x, y), PointerPhase::Down)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(Point::new(x, y), PointerPhase::Move)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(Point::new(x, y), PointerPhase::Up)
    }

    /// From page coordinates, where y grows downward from the canvas top
    pub fn from_page(x: f32, y: f32, canvas_height: f32, phase: PointerPhase) -> Self {
        Self::new(Point::new(x, canvas_height - y), phase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Space,
    /// Any other key, by platform key code
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self { key, pressed: false }
    }
}

/// What a pointer-down starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Brush,
    Pan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_page_flips_y() {
        let event = PointerEvent::from_page(10.0, 1.0, 801.0, PointerPhase::Down);
        assert_eq!(event.position, Point::new(10.0, 800.0));
        assert_eq!(event.phase, PointerPhase::Down);
    }

    #[test]
    fn test_phase_serde() {
        let json = serde_json::to_string(&PointerPhase::Move).unwrap();
        assert_eq!(json, "\"Move\"");
        let tool: Tool = serde_json::from_str("\"Pan\"").unwrap();
        assert_eq!(tool, Tool::Pan);
    }
}
