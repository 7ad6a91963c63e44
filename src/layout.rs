//! Placement of the ripple-carry circuit on a 2D surface.
//!
//! Each bit slice is a column holding two input dots, a pair of sum XOR gates,
//! a carry AND/OR pair and an output dot. Coordinates are logical pixels with
//! the origin in the top-left corner. Slice 0 is the leftmost column (the most
//! significant bit).

use glam::Vec2;
use serde::Serialize;

use crate::arithmetic::BIT_WIDTH;
use crate::scheduler::WireKind;

const MARGIN: f32 = 40.0;
const TOP_Y: f32 = 50.0;
const GATE1_Y: f32 = TOP_Y + 80.0;
const GATE2_Y: f32 = GATE1_Y + 70.0;
const GATE3_Y: f32 = GATE2_Y + 70.0;
const OUTPUT_Y: f32 = GATE3_Y + 60.0;

/// Height the vertical constants above were designed for.
pub const NOMINAL_HEIGHT: f32 = 400.0;

pub const GATE_SIZE: Vec2 = Vec2::new(28.0, 22.0);
pub const INPUT_RADIUS: f32 = 5.0;
pub const OUTPUT_RADIUS: f32 = 6.0;

/// Horizontal offset of the input dots from the slice centre.
const INPUT_SPREAD: f32 = 10.0;
/// Carry gates sit this fraction of a slice width right of the centre.
const CARRY_OFFSET: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GateKind {
    /// First XOR: A xor B.
    SumXor,
    /// Second XOR: partial sum xor carry-in.
    CarryXor,
    CarryAnd,
    CarryOr,
}

/// Anything on the circuit that can be highlighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ElementId {
    InputA { slice: usize },
    InputB { slice: usize },
    Gate { slice: usize, gate: GateKind },
    Wire { slice: usize, wire: WireKind },
    Output { slice: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WirePath {
    pub id: ElementId,
    pub from: Vec2,
    pub to: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GatePlacement {
    pub id: ElementId,
    pub kind: GateKind,
    pub center: Vec2,
    pub size: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliceLayout {
    pub slice: usize,
    pub center_x: f32,
    pub input_a: Vec2,
    pub input_b: Vec2,
    pub output: Vec2,
    pub gates: [GatePlacement; 4],
    /// Four signal wires, plus the carry-chain wire for every slice but the last.
    pub wires: Vec<WirePath>,
}

impl SliceLayout {
    pub fn wire(&self, kind: WireKind) -> Option<&WirePath> {
        self.wires
            .iter()
            .find(|w| matches!(w.id, ElementId::Wire { wire, .. } if wire == kind))
    }

    /// Every element of this slice, in drawing order.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        let slice = self.slice;
        self.wires
            .iter()
            .map(|w| w.id)
            .chain(self.gates.iter().map(|g| g.id))
            .chain([
                ElementId::InputA { slice },
                ElementId::InputB { slice },
                ElementId::Output { slice },
            ])
    }
}

/// First candidate size with both sides positive.
///
/// Candidates are ordered by preference, e.g. the container's laid-out size,
/// then the element's own, then its backing-store attributes.
pub fn laid_out_size(candidates: impl IntoIterator<Item = (f32, f32)>) -> Option<(f32, f32)> {
    candidates
        .into_iter()
        .find(|&(w, h)| w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct CircuitLayout {
    pub width: f32,
    pub height: f32,
    /// Vertical scale relative to [`NOMINAL_HEIGHT`].
    pub scale_y: f32,
    pub slice_width: f32,
    pub slices: Vec<SliceLayout>,
}

impl CircuitLayout {
    pub fn new(width: f32, height: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let scale_y = (height / NOMINAL_HEIGHT).clamp(0.5, 2.0);
        let slice_width = ((width - MARGIN * 2.0) / BIT_WIDTH as f32).max(0.0);
        let y = |v: f32| v * scale_y;

        let slices = (0..BIT_WIDTH)
            .map(|slice| {
                let cx = MARGIN + slice_width * slice as f32 + slice_width / 2.0;
                let carry_x = cx + slice_width * CARRY_OFFSET;
                let gate = |kind: GateKind, center: Vec2| GatePlacement {
                    id: ElementId::Gate { slice, gate: kind },
                    kind,
                    center,
                    size: GATE_SIZE,
                };
                let wire = |kind: WireKind, from: Vec2, to: Vec2| WirePath {
                    id: ElementId::Wire { slice, wire: kind },
                    from,
                    to,
                };

                let mut wires = vec![
                    wire(
                        WireKind::InputA,
                        Vec2::new(cx - INPUT_SPREAD, y(TOP_Y + 22.0)),
                        Vec2::new(cx - 6.0, y(GATE1_Y - 12.0)),
                    ),
                    wire(
                        WireKind::InputB,
                        Vec2::new(cx + INPUT_SPREAD, y(TOP_Y + 22.0)),
                        Vec2::new(cx + 6.0, y(GATE1_Y - 12.0)),
                    ),
                    wire(
                        WireKind::GateToGate,
                        Vec2::new(cx, y(GATE1_Y + 14.0)),
                        Vec2::new(cx, y(GATE2_Y - 12.0)),
                    ),
                    wire(
                        WireKind::GateToOutput,
                        Vec2::new(cx, y(GATE2_Y + 14.0)),
                        Vec2::new(cx, y(OUTPUT_Y - 6.0)),
                    ),
                ];
                if slice + 1 < BIT_WIDTH {
                    wires.push(wire(
                        WireKind::CarryChain,
                        Vec2::new(carry_x, y(GATE3_Y + 14.0)),
                        Vec2::new(carry_x + slice_width, y(GATE2_Y - 12.0)),
                    ));
                }

                SliceLayout {
                    slice,
                    center_x: cx,
                    input_a: Vec2::new(cx - INPUT_SPREAD, y(TOP_Y + 16.0)),
                    input_b: Vec2::new(cx + INPUT_SPREAD, y(TOP_Y + 16.0)),
                    output: Vec2::new(cx, y(OUTPUT_Y)),
                    gates: [
                        gate(GateKind::SumXor, Vec2::new(cx, y(GATE1_Y))),
                        gate(GateKind::CarryXor, Vec2::new(cx, y(GATE2_Y))),
                        gate(GateKind::CarryAnd, Vec2::new(carry_x, y(GATE2_Y))),
                        gate(GateKind::CarryOr, Vec2::new(carry_x, y(GATE3_Y))),
                    ],
                    wires,
                }
            })
            .collect();

        Self {
            width,
            height,
            scale_y,
            slice_width,
            slices,
        }
    }

    pub fn slice(&self, slice: usize) -> Option<&SliceLayout> {
        self.slices.get(slice)
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slices.iter().flat_map(|s| s.elements())
    }
}
