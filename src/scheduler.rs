//! Animation scheduler for a calculation run.
//!
//! A run walks every bit slice through three equal phases
//! (inputs -> first gate, first gate -> second gate, second gate -> output).
//! Slices start staggered by `base_stagger` seconds each and all of them
//! finish together at `total_duration`. Both the stagger and the duration are
//! divided by the speed factor, so speed 10 plays twice as fast as speed 5.
//!
//! The scheduler has no timers of its own: an external driver calls
//! [`AnimationScheduler::tick`] once per frame.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::arithmetic::{Calculation, BIT_WIDTH};

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 10;
pub const DEFAULT_SPEED: u8 = 5;

/// Speed at which the factor is exactly 1.0.
const BASELINE_SPEED: f32 = 5.0;

/// User-selected playback speed, always within `MIN_SPEED..=MAX_SPEED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Speed(u8);

impl Speed {
    pub fn new(value: i64) -> Self {
        Self(value.clamp(MIN_SPEED as i64, MAX_SPEED as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Multiplier applied to all timing constants (1 -> 0.2x, 5 -> 1x, 10 -> 2x).
    pub fn factor(&self) -> f32 {
        self.0 as f32 / BASELINE_SPEED
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(DEFAULT_SPEED)
    }
}

impl From<i64> for Speed {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Speed> for u8 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

/// Timing constants at speed factor 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimingConfig {
    /// Delay between consecutive bit slices, in seconds.
    pub base_stagger: f32,
    /// Duration of a whole run, in seconds.
    pub nominal_duration: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_stagger: 0.15,
            nominal_duration: 3.0,
        }
    }
}

impl TimingConfig {
    /// Length of a run played at `speed`.
    pub fn run_duration(&self, speed: Speed) -> f32 {
        self.nominal_duration / speed.factor()
    }

    /// Frames a fixed-step playback at `fps` needs to reach the completed state,
    /// counting the first frame at t=0 and the completed frame.
    pub fn frames_to_complete(&self, speed: Speed, fps: f32) -> usize {
        (self.run_duration(speed) * fps).ceil() as usize + 2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_stagger.is_finite() || self.base_stagger < 0.0 {
            bail!("baseStagger must be a non-negative number, got {}", self.base_stagger);
        }
        if !self.nominal_duration.is_finite() || self.nominal_duration <= 0.0 {
            bail!("nominalDuration must be positive, got {}", self.nominal_duration);
        }
        let last_delay = self.base_stagger * (BIT_WIDTH - 1) as f32;
        if self.nominal_duration <= last_delay {
            bail!(
                "nominalDuration ({}) must exceed the last slice delay ({})",
                self.nominal_duration,
                last_delay
            );
        }
        Ok(())
    }
}

/// One of the three sequential stages of a slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Operand bits flow into the first gate.
    InputToFirstGate,
    /// Signal in transit between the two gate stages.
    FirstToSecondGate,
    /// Result bit flows into the output node.
    SecondGateToOutput,
}

impl Phase {
    pub const ALL: [Phase; 3] = [
        Phase::InputToFirstGate,
        Phase::FirstToSecondGate,
        Phase::SecondGateToOutput,
    ];

    pub fn index(&self) -> usize {
        match self {
            Phase::InputToFirstGate => 0,
            Phase::FirstToSecondGate => 1,
            Phase::SecondGateToOutput => 2,
        }
    }
}

/// Value carried by a flow indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalLevel {
    High,
    Low,
    /// Between gate stages; not yet a final value.
    Transit,
}

impl SignalLevel {
    pub fn from_bit(bit: u8) -> Self {
        if bit != 0 {
            SignalLevel::High
        } else {
            SignalLevel::Low
        }
    }
}

/// Which wire of a slice a sample is drawn on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WireKind {
    InputA,
    InputB,
    GateToGate,
    GateToOutput,
    CarryChain,
}

/// A single `(phase, progress, value)` triple for one wire of a slice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhaseSample {
    pub phase: Phase,
    pub wire: WireKind,
    pub progress: f32,
    pub level: SignalLevel,
}

/// State of one bit slice at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceFrame {
    pub slice: usize,
    /// Progress of each phase in `[0, 1]`, indexed by [`Phase::index`].
    pub progress: [f32; 3],
    pub operand_a: SignalLevel,
    pub operand_b: SignalLevel,
    pub result: SignalLevel,
}

impl SliceFrame {
    pub fn phase_progress(&self, phase: Phase) -> f32 {
        self.progress[phase.index()]
    }

    /// Flow samples in drawing order. Both operand wires share phase 1.
    pub fn samples(&self) -> [PhaseSample; 4] {
        [
            PhaseSample {
                phase: Phase::InputToFirstGate,
                wire: WireKind::InputA,
                progress: self.progress[0],
                level: self.operand_a,
            },
            PhaseSample {
                phase: Phase::InputToFirstGate,
                wire: WireKind::InputB,
                progress: self.progress[0],
                level: self.operand_b,
            },
            PhaseSample {
                phase: Phase::FirstToSecondGate,
                wire: WireKind::GateToGate,
                progress: self.progress[1],
                level: SignalLevel::Transit,
            },
            PhaseSample {
                phase: Phase::SecondGateToOutput,
                wire: WireKind::GateToOutput,
                progress: self.progress[2],
                level: self.result,
            },
        ]
    }
}

/// Lifecycle of the scheduler's current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// One animated playback of a calculation.
#[derive(Clone, Debug)]
pub struct AnimationRun {
    pub calculation: Calculation,
    pub speed: Speed,
    pub generation: u64,
    /// Seconds of animation time since the trigger.
    elapsed: f32,
    total_duration: f32,
    stagger: f32,
}

impl AnimationRun {
    fn new(calculation: Calculation, speed: Speed, generation: u64, timing: &TimingConfig) -> Self {
        Self {
            calculation,
            speed,
            generation,
            elapsed: 0.0,
            total_duration: timing.run_duration(speed),
            stagger: timing.base_stagger / speed.factor(),
        }
    }

    pub fn total_duration(&self) -> f32 {
        self.total_duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn slice_delay(&self, slice: usize) -> f32 {
        slice as f32 * self.stagger
    }

    pub fn phase_duration(&self, slice: usize) -> f32 {
        (self.total_duration - self.slice_delay(slice)) / 3.0
    }

    /// Progress of `phase` within `slice`, `elapsed` seconds into the run.
    pub fn phase_progress(&self, slice: usize, phase: Phase, elapsed: f32) -> f32 {
        let local = (elapsed - self.slice_delay(slice)).max(0.0);
        let duration = self.phase_duration(slice);
        if duration <= 0.0 {
            return if local > 0.0 { 1.0 } else { 0.0 };
        }
        let start = phase.index() as f32 * duration;
        ((local - start) / duration).clamp(0.0, 1.0)
    }

    pub fn slice_frame(&self, slice: usize, elapsed: f32) -> SliceFrame {
        let bits_a = self.calculation.bits_a();
        let bits_b = self.calculation.bits_b();
        let bits_r = self.calculation.bits_result();
        SliceFrame {
            slice,
            progress: Phase::ALL.map(|phase| self.phase_progress(slice, phase, elapsed)),
            operand_a: SignalLevel::from_bit(bits_a[slice]),
            operand_b: SignalLevel::from_bit(bits_b[slice]),
            result: SignalLevel::from_bit(bits_r[slice]),
        }
    }

    pub fn is_finished(&self, elapsed: f32) -> bool {
        elapsed > self.total_duration
    }
}

/// Per-frame view of a running animation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub generation: u64,
    pub elapsed: f32,
    pub slices: [SliceFrame; BIT_WIDTH],
}

/// Owns at most one live [`AnimationRun`].
#[derive(Clone, Debug)]
pub struct AnimationScheduler {
    timing: TimingConfig,
    state: RunState,
    run: Option<AnimationRun>,
    generation: u64,
}

impl AnimationScheduler {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            state: RunState::Idle,
            run: None,
            generation: 0,
        }
    }

    /// Replace the timing constants. Takes effect from the next trigger.
    pub fn set_timing(&mut self, timing: TimingConfig) {
        self.timing = timing;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn run(&self) -> Option<&AnimationRun> {
        self.run.as_ref()
    }

    /// Start a new run, discarding whatever was in flight.
    pub fn trigger(&mut self, calculation: Calculation, speed: Speed) -> u64 {
        if self.state == RunState::Running {
            log::debug!("Run {} preempted", self.generation);
        }
        self.generation += 1;
        let run = AnimationRun::new(calculation, speed, self.generation, &self.timing);
        log::debug!(
            "Run {} started: speed {}, duration {:.3}s",
            self.generation,
            speed.get(),
            run.total_duration()
        );
        self.run = Some(run);
        self.state = RunState::Running;
        self.generation
    }

    /// Advance the live run by `dt` seconds.
    ///
    /// Time is accumulated per run, so playback does not depend on how long
    /// the scheduler has been alive.
    pub fn tick(&mut self, dt: f32) -> RunState {
        if self.state != RunState::Running || !(dt.is_finite() && dt > 0.0) {
            return self.state;
        }
        if let Some(run) = &mut self.run {
            run.elapsed += dt;
            if run.is_finished(run.elapsed) {
                log::debug!("Run {} completed after {:.3}s", run.generation, run.elapsed);
                self.state = RunState::Completed;
            }
        }
        self.state
    }

    /// Seconds since the current run started.
    pub fn elapsed(&self) -> Option<f32> {
        self.run.as_ref().map(AnimationRun::elapsed)
    }

    /// Slice frames for the current instant, only while a run is live.
    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        if self.state != RunState::Running {
            return None;
        }
        let run = self.run.as_ref()?;
        let elapsed = run.elapsed;
        Some(FrameSnapshot {
            generation: run.generation,
            elapsed,
            slices: std::array::from_fn(|slice| run.slice_frame(slice, elapsed)),
        })
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}
