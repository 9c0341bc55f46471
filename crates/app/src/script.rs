//! Scripted pointer input replayed by the demo

use painting::{PointerEvent, PointerPhase};

/// A wavy left-to-right drag across the middle of the canvas, in page
/// coordinates (y down) like a browser would deliver them
pub fn wave_stroke(width: f32, height: f32, samples: usize) -> Vec<PointerEvent> {
    let samples = samples.max(2);
    let (left, right) = (width * 0.15, width * 0.85);
    let (middle, amplitude) = (height * 0.6, height * 0.1);

    (0..samples)
        .map(|i| {
            let s = i as f32 / (samples - 1) as f32;
            let x = left + (right - left) * s;
            let y = middle + amplitude * (s * std::f32::consts::TAU * 1.5).sin();
            PointerEvent::from_page(x, y, height, phase_at(i, samples))
        })
        .collect()
}

/// A straight drag by `(dx, dy)` canvas pixels, split into `steps` moves
pub fn pan_drag(from: (f32, f32), delta: (f32, f32), steps: usize) -> Vec<PointerEvent> {
    let steps = steps.max(1);
    let mut events = Vec::with_capacity(steps + 2);
    events.push(PointerEvent::down(from.0, from.1));
    for i in 1..=steps {
        let s = i as f32 / steps as f32;
        events.push(PointerEvent::moved(from.0 + delta.0 * s, from.1 + delta.1 * s));
    }
    let end = (from.0 + delta.0, from.1 + delta.1);
    events.push(PointerEvent::up(end.0, end.1));
    events
}

fn phase_at(index: usize, count: usize) -> PointerPhase {
    match index {
        0 => PointerPhase::Down,
        i if i + 1 == count => PointerPhase::Up,
        _ => PointerPhase::Move,
    }
}
