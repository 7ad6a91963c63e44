//! Geometry of the progress indicator drawn along a wire.
//!
//! Two renderings of the same `(from, to, progress)` input are supported: a
//! liquid stream whose head sits at `progress` with a fading tail behind it,
//! and a single marker travelling along the wire.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Alpha ramp along the stream, as `(position from tail, alpha)` stops.
pub const GRADIENT_STOPS: [(f32, f32); 3] = [(0.0, 0.0), (0.3, 0.5), (1.0, 0.9)];

/// Alpha of the ripple dots riding on a stream.
pub const RIPPLE_ALPHA: f32 = 0.6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStyle {
    /// Continuous stroke with a gradient tail and ripple dots.
    #[default]
    Stream,
    /// A single dot at the head position.
    Marker,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowOptions {
    pub style: FlowStyle,
    /// Length of the visible tail as a fraction of the wire.
    pub trail_window: f32,
    pub stroke_width: f32,
    pub ripple_count: usize,
    pub ripple_radius: f32,
    /// Perpendicular ripple displacement, in pixels.
    pub wobble_amplitude: f32,
    pub wobble_frequency: f32,
    pub marker_radius: f32,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            style: FlowStyle::Stream,
            trail_window: 0.4,
            stroke_width: 3.0,
            ripple_count: 4,
            ripple_radius: 1.5,
            wobble_amplitude: 2.0,
            wobble_frequency: 10.0,
            marker_radius: 4.0,
        }
    }
}

/// A stream segment ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowStroke {
    pub tail: Vec2,
    pub head: Vec2,
    pub ripples: Vec<Vec2>,
}

fn point_at(from: Vec2, to: Vec2, t: f32) -> Vec2 {
    from + (to - from) * t
}

/// Build the stream for a wire at `progress`. Nothing is drawn at `progress <= 0`.
pub fn stream_stroke(from: Vec2, to: Vec2, progress: f32, options: &FlowOptions) -> Option<FlowStroke> {
    if progress.is_nan() || progress <= 0.0 {
        return None;
    }
    let head_t = progress.min(1.0);
    let tail_t = (progress - options.trail_window).max(0.0);

    let dir = to - from;
    let normal = if dir.length() > 0.0 {
        Vec2::new(-dir.y, dir.x) / dir.length()
    } else {
        Vec2::ZERO
    };

    let count = options.ripple_count;
    let ripples = (0..count)
        .map(|i| {
            let t = tail_t + (head_t - tail_t) * (i as f32 / count as f32);
            let wobble = (progress * options.wobble_frequency + i as f32 * 2.0).sin() * options.wobble_amplitude;
            point_at(from, to, t) + normal * wobble
        })
        .collect();

    Some(FlowStroke {
        tail: point_at(from, to, tail_t),
        head: point_at(from, to, head_t),
        ripples,
    })
}

/// Position of the travelling marker, if it has left the start of the wire.
pub fn marker_position(from: Vec2, to: Vec2, progress: f32) -> Option<Vec2> {
    if progress.is_nan() || progress <= 0.0 {
        return None;
    }
    Some(point_at(from, to, progress.min(1.0)))
}

/// Alpha at position `t` (0 = tail, 1 = head) along a stream.
pub fn gradient_alpha(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    for pair in GRADIENT_STOPS.windows(2) {
        let (t0, a0) = pair[0];
        let (t1, a1) = pair[1];
        if t <= t1 {
            return a0 + (a1 - a0) * (t - t0) / (t1 - t0);
        }
    }
    GRADIENT_STOPS[GRADIENT_STOPS.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: Vec2 = Vec2::new(0.0, 0.0);
    const TO: Vec2 = Vec2::new(0.0, 100.0);

    #[test]
    fn test_nothing_at_zero_progress() {
        let options = FlowOptions::default();
        assert!(stream_stroke(FROM, TO, 0.0, &options).is_none());
        assert!(marker_position(FROM, TO, 0.0).is_none());
        assert!(stream_stroke(FROM, TO, f32::NAN, &options).is_none());
    }

    #[test]
    fn test_tail_trails_head() {
        let options = FlowOptions::default();
        let stroke = stream_stroke(FROM, TO, 0.25, &options).unwrap();
        assert_eq!(stroke.tail, FROM);
        assert_eq!(stroke.head, Vec2::new(0.0, 25.0));

        let stroke = stream_stroke(FROM, TO, 1.0, &options).unwrap();
        assert!((stroke.tail.y - 60.0).abs() < 1e-4);
        assert_eq!(stroke.head, TO);
        assert_eq!(stroke.ripples.len(), 4);
    }

    #[test]
    fn test_ripples_stay_near_wire() {
        let options = FlowOptions::default();
        let stroke = stream_stroke(FROM, TO, 0.7, &options).unwrap();
        for ripple in &stroke.ripples {
            assert!(ripple.x.abs() <= options.wobble_amplitude + 1e-4);
            assert!(ripple.y >= stroke.tail.y - 1e-4 && ripple.y <= stroke.head.y + 1e-4);
        }
    }

    #[test]
    fn test_zero_length_wire() {
        let options = FlowOptions::default();
        let stroke = stream_stroke(TO, TO, 0.5, &options).unwrap();
        assert!(stroke.ripples.iter().all(|p| *p == TO));
    }

    #[test]
    fn test_marker_clamps_to_end() {
        assert_eq!(marker_position(FROM, TO, 2.0), Some(TO));
        assert_eq!(marker_position(FROM, TO, 0.5), Some(Vec2::new(0.0, 50.0)));
    }

    #[test]
    fn test_gradient_stops() {
        assert_eq!(gradient_alpha(0.0), 0.0);
        assert!((gradient_alpha(0.3) - 0.5).abs() < 1e-6);
        assert!((gradient_alpha(1.0) - 0.9).abs() < 1e-6);
        assert!((gradient_alpha(0.15) - 0.25).abs() < 1e-6);
    }
}
