use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::arithmetic::Calculation;
use crate::flow::FlowOptions;
use crate::input::{InputEvent, InputSurface, StaticInputs};
use crate::layout::{CircuitLayout, ElementId, GateKind};
use crate::palette::Palette;
use crate::scheduler::{AnimationScheduler, FrameSnapshot, RunState, SliceFrame, Speed, TimingConfig, WireKind};
use crate::surface::DisplaySurface;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    pub timing: TimingConfig,
    pub flow: FlowOptions,
    pub palette: Palette,
    /// Values the input controls start with.
    pub defaults: StaticInputs,
}

impl SimulatorConfig {
    /// Parse a (possibly partial) JSON config; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulatorConfig = serde_json::from_str(json).context("Failed to parse simulator config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        if !(self.flow.trail_window > 0.0 && self.flow.trail_window <= 1.0) {
            bail!("flow.trailWindow must be in (0, 1], got {}", self.flow.trail_window);
        }
        if !(self.flow.stroke_width > 0.0) {
            bail!("flow.strokeWidth must be positive, got {}", self.flow.stroke_width);
        }
        Ok(())
    }
}

/// Everything the frame loop mutates.
pub struct SimulatorState {
    /// Calculation currently shown on the circuit.
    pub calculation: Calculation,
    pub scheduler: AnimationScheduler,
    pub layout: CircuitLayout,
    /// Elements the display surface currently has lit.
    pub highlights: HashSet<ElementId>,
    /// Last speed reported by the controls. Runs capture it when triggered.
    pub selected_speed: Speed,
}

impl SimulatorState {
    pub fn new(config: &SimulatorConfig, width: f32, height: f32) -> Self {
        Self {
            calculation: config.defaults.calculation(),
            scheduler: AnimationScheduler::new(config.timing.clone()),
            layout: CircuitLayout::new(width, height),
            highlights: HashSet::new(),
            selected_speed: config.defaults.speed,
        }
    }
}

/// Elements that should be lit for one slice.
pub fn slice_highlights(frame: &SliceFrame, carry: bool, out: &mut HashSet<ElementId>) {
    let slice = frame.slice;
    let in_transit = |p: f32| p > 0.0 && p < 1.0;
    let [p1, p2, p3] = frame.progress;

    if in_transit(p1) {
        out.insert(ElementId::Wire { slice, wire: WireKind::InputA });
        out.insert(ElementId::Wire { slice, wire: WireKind::InputB });
    }
    if p1 >= 1.0 {
        out.insert(ElementId::Gate { slice, gate: GateKind::SumXor });
    }
    if in_transit(p2) {
        out.insert(ElementId::Wire { slice, wire: WireKind::GateToGate });
    }
    if p2 >= 1.0 {
        out.insert(ElementId::Gate { slice, gate: GateKind::CarryXor });
        if carry {
            out.insert(ElementId::Gate { slice, gate: GateKind::CarryAnd });
            out.insert(ElementId::Gate { slice, gate: GateKind::CarryOr });
            out.insert(ElementId::Wire { slice, wire: WireKind::CarryChain });
        }
    }
    if in_transit(p3) {
        out.insert(ElementId::Wire { slice, wire: WireKind::GateToOutput });
    }
    if p3 >= 1.0 {
        out.insert(ElementId::Output { slice });
    }
}

pub fn frame_highlights(snapshot: Option<&FrameSnapshot>, carry: bool) -> HashSet<ElementId> {
    let mut lit = HashSet::new();
    if let Some(snapshot) = snapshot {
        for frame in &snapshot.slices {
            slice_highlights(frame, carry, &mut lit);
        }
    }
    lit
}

/// Advance the animation clock.
pub fn update(state: &mut SimulatorState, dt: f32) -> RunState {
    state.scheduler.tick(dt)
}

/// Issue one frame of draw calls.
pub fn render(state: &mut SimulatorState, surface: &mut dyn DisplaySurface) {
    surface.clear();

    let snapshot = state.scheduler.snapshot();
    let carry = state.calculation.uses_carry();
    let wanted = frame_highlights(snapshot.as_ref(), carry);

    // Only report changes, in layout order so the call sequence is stable.
    for element in state.layout.elements() {
        let on = wanted.contains(&element);
        if on != state.highlights.contains(&element) {
            surface.set_element_highlight(element, on);
        }
    }
    state.highlights = wanted;

    surface.draw_circuit(&state.layout, &state.calculation);

    let Some(snapshot) = snapshot else { return };
    for frame in &snapshot.slices {
        let Some(slice) = state.layout.slice(frame.slice) else { continue };
        for sample in frame.samples() {
            if sample.progress <= 0.0 {
                continue;
            }
            if let Some(wire) = slice.wire(sample.wire) {
                surface.draw_progress_segment(wire.from, wire.to, sample.progress, sample.level);
            }
        }
    }
}

/// One frame of a headless trace.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFrame {
    pub frame: usize,
    pub time: f32,
    pub state: RunState,
    pub slices: Vec<SliceFrame>,
}

/// The arithmetic visualisation engine.
pub struct Simulator {
    config: SimulatorConfig,
    state: SimulatorState,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, width: f32, height: f32) -> Self {
        let state = SimulatorState::new(&config, width, height);
        Self { config, state }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    /// Swap in a new config. Timing changes apply from the next run.
    pub fn set_config(&mut self, config: SimulatorConfig) {
        self.state.scheduler.set_timing(config.timing.clone());
        self.config = config;
    }

    pub fn handle_event(&mut self, event: InputEvent, inputs: &dyn InputSurface) {
        match event {
            InputEvent::CalculationRequested => {
                self.request_calculation(inputs);
            }
            InputEvent::SpeedChanged(speed) => {
                log::debug!("Speed changed to {}", speed.get());
                self.state.selected_speed = speed;
            }
        }
    }

    /// Evaluate the current inputs and start a fresh run, preempting any live one.
    pub fn request_calculation(&mut self, inputs: &dyn InputSurface) -> Calculation {
        let calculation = inputs.calculation();
        let speed = inputs.speed();
        self.state.selected_speed = speed;
        self.state.calculation = calculation;
        self.state.scheduler.trigger(calculation, speed);
        calculation
    }

    pub fn tick(&mut self, dt: f32) -> RunState {
        update(&mut self.state, dt)
    }

    pub fn render(&mut self, surface: &mut dyn DisplaySurface) {
        render(&mut self.state, surface);
    }

    /// Recompute the layout for a new surface size. Animation state is untouched.
    pub fn resize(&mut self, width: f32, height: f32, surface: &mut dyn DisplaySurface) {
        self.state.layout = CircuitLayout::new(width, height);
        surface.resize(width, height);
    }

    pub fn is_animating(&self) -> bool {
        self.state.scheduler.is_running()
    }

    pub fn calculation(&self) -> &Calculation {
        &self.state.calculation
    }

    /// Run a calculation headlessly at a fixed frame step, recording every frame.
    ///
    /// Recording stops at the first frame after completion or after `max_frames`.
    /// [`TimingConfig::frames_to_complete`] gives a cap that always reaches completion.
    pub fn trace(&mut self, inputs: &dyn InputSurface, fps: f32, max_frames: usize) -> Vec<TraceFrame> {
        let dt = if fps > 0.0 { 1.0 / fps } else { 1.0 / 60.0 };
        self.request_calculation(inputs);

        let mut frames = Vec::new();
        for frame in 0..max_frames {
            let state = self.state.scheduler.state();
            let snapshot = self.state.scheduler.snapshot();
            frames.push(TraceFrame {
                frame,
                time: self.state.scheduler.elapsed().unwrap_or(0.0),
                state,
                slices: snapshot.map(|s| s.slices.to_vec()).unwrap_or_default(),
            });
            if state != RunState::Running {
                break;
            }
            self.tick(dt);
        }
        if frames.last().is_some_and(|f| f.state == RunState::Running) {
            log::warn!("Trace stopped after {} frames before the run completed", frames.len());
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, RecordingSurface};

    fn simulator() -> Simulator {
        Simulator::new(SimulatorConfig::default(), 720.0, 400.0)
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = SimulatorConfig::from_json(r#"{ "timing": { "nominalDuration": 6.0 } }"#).unwrap();
        assert_eq!(config.timing.nominal_duration, 6.0);
        assert_eq!(config.timing.base_stagger, 0.15);
        assert_eq!(config.defaults.operand_a, "5");
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(SimulatorConfig::from_json(r#"{ "timing": { "nominalDuration": 0.5 } }"#).is_err());
        assert!(SimulatorConfig::from_json(r#"{ "flow": { "trailWindow": 0.0 } }"#).is_err());
        assert!(SimulatorConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_idle_render_draws_static_circuit_only() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.render(&mut surface);
        assert_eq!(surface.commands, vec![DrawCommand::Clear, DrawCommand::Circuit { result: 8 }]);
    }

    #[test]
    fn test_calculation_event_starts_run() {
        let mut sim = simulator();
        let inputs = StaticInputs::new("12", "10", "and", Speed::default());
        sim.handle_event(InputEvent::CalculationRequested, &inputs);
        assert!(sim.is_animating());
        assert_eq!(sim.calculation().result, 8);
    }

    #[test]
    fn test_speed_event_does_not_touch_live_run() {
        let mut sim = simulator();
        let inputs = StaticInputs::default();
        sim.request_calculation(&inputs);
        sim.handle_event(InputEvent::SpeedChanged(Speed::new(10)), &inputs);
        assert_eq!(sim.state().selected_speed.get(), 10);
        assert_eq!(sim.state().scheduler.run().unwrap().speed.get(), 5);
    }

    #[test]
    fn test_segments_follow_phases() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.request_calculation(&StaticInputs::default());
        sim.tick(0.5);
        sim.render(&mut surface);

        // At 0.5s slices 0..=3 are in phase 1: two operand wires each.
        assert_eq!(surface.segments().count(), 8);

        sim.tick(1.0);
        sim.render(&mut surface);
        let transit = surface
            .segments()
            .filter(|c| matches!(c, DrawCommand::Segment { level: crate::scheduler::SignalLevel::Transit, .. }))
            .count();
        assert!(transit > 0);
    }

    #[test]
    fn test_highlights_follow_progress() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.request_calculation(&StaticInputs::default());
        sim.tick(1.5);
        sim.render(&mut surface);

        let lit = &sim.state().highlights;
        assert!(lit.contains(&ElementId::Gate { slice: 0, gate: GateKind::SumXor }));
        assert!(lit.contains(&ElementId::Wire { slice: 0, wire: WireKind::GateToGate }));
        assert!(!lit.contains(&ElementId::Output { slice: 0 }));
    }

    #[test]
    fn test_highlights_cleared_on_completion() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.request_calculation(&StaticInputs::default());
        sim.tick(2.5);
        sim.render(&mut surface);
        assert!(!sim.state().highlights.is_empty());

        sim.tick(1.0);
        sim.render(&mut surface);
        assert!(sim.state().highlights.is_empty());
        assert!(surface
            .last_frame()
            .iter()
            .all(|c| !matches!(c, DrawCommand::Highlight { on: true, .. })));
        assert_eq!(surface.segments().count(), 0);
    }

    #[test]
    fn test_carry_gates_only_for_additive_ops() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.request_calculation(&StaticInputs::new("12", "10", "xor", Speed::default()));
        sim.tick(2.5);
        sim.render(&mut surface);
        assert!(!sim
            .state()
            .highlights
            .contains(&ElementId::Gate { slice: 0, gate: GateKind::CarryAnd }));

        sim.request_calculation(&StaticInputs::new("12", "10", "add", Speed::default()));
        sim.tick(2.5);
        sim.render(&mut surface);
        assert!(sim
            .state()
            .highlights
            .contains(&ElementId::Gate { slice: 0, gate: GateKind::CarryAnd }));
    }

    #[test]
    fn test_resize_keeps_animation_state() {
        let mut sim = simulator();
        let mut surface = RecordingSurface::new();
        sim.request_calculation(&StaticInputs::default());
        sim.tick(1.0);
        let before = sim.state().scheduler.snapshot().unwrap();

        sim.resize(1440.0, 800.0, &mut surface);
        let after = sim.state().scheduler.snapshot().unwrap();
        assert_eq!(before.elapsed, after.elapsed);
        assert_eq!(before.slices, after.slices);
        assert_eq!(sim.state().layout.scale_y, 2.0);
        assert_eq!(surface.commands, vec![DrawCommand::Resize { width: 1440.0, height: 800.0 }]);
    }

    #[test]
    fn test_trace_at_slow_speed_reaches_completion() {
        let mut sim = simulator();
        let inputs = StaticInputs::new("5", "3", "add", Speed::new(1));
        let max_frames = sim.config().timing.frames_to_complete(inputs.speed, 240.0);
        let frames = sim.trace(&inputs, 240.0, max_frames);
        assert!(frames.len() > 3600);
        assert_eq!(frames.last().unwrap().state, RunState::Completed);
    }

    #[test]
    fn test_trace_ends_with_completed_frame() {
        let mut sim = simulator();
        let frames = sim.trace(&StaticInputs::new("5", "3", "add", Speed::new(10)), 4.0, 1000);
        let last = frames.last().unwrap();
        assert_eq!(last.state, RunState::Completed);
        assert!(last.slices.is_empty());
        // 1.5s at 4 fps: frames at 0.0..=1.5 running, then one completed frame.
        assert_eq!(frames.len(), 8);
    }
}
