//! Display collaborator used by the simulator.
//!
//! The simulator never knows whether it is drawing into a wgpu surface or
//! nothing at all; it only issues the calls below once per frame.

use glam::Vec2;
use serde::Serialize;

use crate::arithmetic::Calculation;
use crate::layout::{CircuitLayout, ElementId};
use crate::scheduler::SignalLevel;

pub trait DisplaySurface {
    /// Draw a directed progress indicator from `from` towards `to`.
    /// `progress` 0 draws nothing, 1 means the indicator has reached `to`.
    fn draw_progress_segment(&mut self, from: Vec2, to: Vec2, progress: f32, level: SignalLevel);

    fn set_element_highlight(&mut self, element: ElementId, on: bool);

    /// Start a new frame.
    fn clear(&mut self);

    /// Logical size of the surface changed.
    fn resize(&mut self, width: f32, height: f32);

    /// Draw the static circuit for `calculation`. Surfaces that draw the
    /// circuit some other way can ignore this.
    fn draw_circuit(&mut self, _layout: &CircuitLayout, _calculation: &Calculation) {}
}

/// One recorded call on a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum DrawCommand {
    Clear,
    Resize { width: f32, height: f32 },
    Circuit { result: u8 },
    Segment { from: Vec2, to: Vec2, progress: f32, level: SignalLevel },
    Highlight { element: ElementId, on: bool },
}

/// Headless surface that records every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands issued since the most recent `clear`, including it.
    pub fn last_frame(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear))
            .unwrap_or(0);
        &self.commands[start..]
    }

    pub fn segments(&self) -> impl Iterator<Item = &DrawCommand> {
        self.last_frame()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Segment { .. }))
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl DisplaySurface for RecordingSurface {
    fn draw_progress_segment(&mut self, from: Vec2, to: Vec2, progress: f32, level: SignalLevel) {
        self.commands.push(DrawCommand::Segment { from, to, progress, level });
    }

    fn set_element_highlight(&mut self, element: ElementId, on: bool) {
        self.commands.push(DrawCommand::Highlight { element, on });
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn draw_circuit(&mut self, _layout: &CircuitLayout, calculation: &Calculation) {
        self.commands.push(DrawCommand::Circuit { result: calculation.result });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_frame_starts_at_clear() {
        let mut surface = RecordingSurface::new();
        surface.clear();
        surface.draw_progress_segment(Vec2::ZERO, Vec2::ONE, 0.5, SignalLevel::High);
        surface.clear();
        surface.draw_progress_segment(Vec2::ZERO, Vec2::ONE, 0.7, SignalLevel::Low);

        assert_eq!(surface.last_frame().len(), 2);
        assert_eq!(surface.segments().count(), 1);
        assert_eq!(surface.take().len(), 4);
        assert!(surface.commands.is_empty());
    }
}
