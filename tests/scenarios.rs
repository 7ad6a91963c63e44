//! End-to-end checks of the evaluator and the animation engine, driven
//! headlessly through a recording surface.
//!
//! Run with: cargo test --test scenarios

use logic_visualiser::arithmetic::{evaluate, from_bits, format_bits, to_bits, Calculation, Operation};
use logic_visualiser::input::StaticInputs;
use logic_visualiser::layout::ElementId;
use logic_visualiser::scheduler::{RunState, Speed};
use logic_visualiser::simulator::{Simulator, SimulatorConfig};
use logic_visualiser::surface::{DrawCommand, RecordingSurface};

fn simulator() -> Simulator {
    Simulator::new(SimulatorConfig::default(), 720.0, 400.0)
}

#[test]
fn test_add_matches_modular_sum() {
    for a in 0..=255u16 {
        for b in 0..=255u16 {
            let got = evaluate(a as u8, b as u8, Operation::Add);
            assert_eq!(got as u16, (a + b) % 256, "{} + {}", a, b);
        }
    }
}

#[test]
fn test_subtract_matches_modular_difference() {
    for a in 0..=255i32 {
        for b in 0..=255i32 {
            let got = evaluate(a as u8, b as u8, Operation::Subtract);
            assert_eq!(got as i32, (a - b + 256) % 256, "{} - {}", a, b);
        }
    }
}

#[test]
fn test_bitwise_ops_agree_bit_for_bit() {
    for a in 0..=255u8 {
        for b in 0..=255u8 {
            let (ba, bb) = (to_bits(a), to_bits(b));
            let and = to_bits(evaluate(a, b, Operation::And));
            let or = to_bits(evaluate(a, b, Operation::Or));
            let xor = to_bits(evaluate(a, b, Operation::Xor));
            for i in 0..8 {
                assert_eq!(and[i], ba[i] & bb[i]);
                assert_eq!(or[i], ba[i] | bb[i]);
                assert_eq!(xor[i], ba[i] ^ bb[i]);
            }
        }
    }
}

#[test]
fn test_result_bits_reconstitute_result() {
    for op in Operation::ALL {
        for a in (0..=255u8).step_by(7) {
            for b in (0..=255u8).step_by(5) {
                let result = evaluate(a, b, op);
                let bits = to_bits(result);
                assert_eq!(bits.len(), 8);
                assert!(bits.iter().all(|&bit| bit <= 1));
                let weighted: u32 = bits
                    .iter()
                    .enumerate()
                    .map(|(i, &bit)| (bit as u32) << (7 - i))
                    .sum();
                assert_eq!(weighted, result as u32);
                assert_eq!(from_bits(&bits), result);
                // Pure: same inputs, same output.
                assert_eq!(evaluate(a, b, op), result);
            }
        }
    }
}

#[test]
fn test_scenario_add_five_three() {
    let calc = Calculation::from_text("5", "3", "add");
    assert_eq!(calc.result, 8);
    assert_eq!(format_bits(calc.a), "00000101");
    assert_eq!(format_bits(calc.b), "00000011");
    assert_eq!(format_bits(calc.result), "00001000");
}

#[test]
fn test_scenario_subtract_wraps_below_zero() {
    let calc = Calculation::from_text("3", "5", "sub");
    assert_eq!(calc.result, 254);
    assert_eq!(format_bits(calc.result), "11111110");
}

#[test]
fn test_scenario_add_wraps_past_255() {
    let calc = Calculation::from_text("255", "255", "add");
    assert_eq!(calc.result, 254);
    assert_eq!(format_bits(calc.result), "11111110");
}

#[test]
fn test_scenario_and() {
    assert_eq!(Calculation::from_text("12", "10", "and").result, 8);
}

#[test]
fn test_out_of_range_inputs_are_clamped() {
    let calc = Calculation::from_text("300", "-4", "add");
    assert_eq!((calc.a, calc.b, calc.result), (255, 0, 255));
}

#[test]
fn test_retrigger_mid_run_resets_every_slice() {
    let mut sim = simulator();
    let mut surface = RecordingSurface::new();

    sim.request_calculation(&StaticInputs::new("5", "3", "add", Speed::default()));
    // Halfway through a 3s run.
    sim.tick(1.5);
    sim.render(&mut surface);
    assert!(!sim.state().highlights.is_empty());
    let lit_before: Vec<ElementId> = sim.state().highlights.iter().copied().collect();

    sim.request_calculation(&StaticInputs::new("255", "255", "add", Speed::default()));
    surface.take();
    sim.render(&mut surface);

    let snapshot = sim.state().scheduler.snapshot().unwrap();
    for slice in snapshot.slices {
        assert_eq!(slice.progress, [0.0, 0.0, 0.0]);
    }
    assert_eq!(sim.calculation().result, 254);

    // One frame later nothing from the old run is lit or drawn.
    assert!(sim.state().highlights.is_empty());
    for element in lit_before {
        assert!(surface
            .last_frame()
            .contains(&DrawCommand::Highlight { element, on: false }));
    }
    assert_eq!(surface.segments().count(), 0);
    assert!(surface.last_frame().contains(&DrawCommand::Circuit { result: 254 }));
}

fn run_until_complete(speed: i64, dt: f32) -> f32 {
    let mut sim = simulator();
    sim.request_calculation(&StaticInputs::new("5", "3", "add", Speed::new(speed)));
    let mut elapsed = 0.0;
    while sim.tick(dt) == RunState::Running {
        elapsed += dt;
        assert!(elapsed < 100.0, "run never completed");
    }
    elapsed
}

#[test]
fn test_double_speed_halves_duration() {
    let dt = 1.0 / 64.0;
    let normal = run_until_complete(5, dt);
    let fast = run_until_complete(10, dt);
    // Last running instant lands exactly on the total duration.
    assert_eq!(normal, 3.0);
    assert_eq!(fast, 1.5);
    assert_eq!(fast * 2.0, normal);
}

#[test]
fn test_slowest_speed_is_five_times_slower() {
    let slow = run_until_complete(1, 0.25);
    assert!((slow - 15.0).abs() < 0.25);
}

#[test]
fn test_trace_reports_monotonic_progress() {
    let mut sim = simulator();
    let frames = sim.trace(&StaticInputs::default(), 30.0, 10_000);
    assert_eq!(frames.first().unwrap().state, RunState::Running);
    assert_eq!(frames.last().unwrap().state, RunState::Completed);

    let running: Vec<_> = frames.iter().filter(|f| f.state == RunState::Running).collect();
    for pair in running.windows(2) {
        for (prev, next) in pair[0].slices.iter().zip(&pair[1].slices) {
            for phase in 0..3 {
                assert!(next.progress[phase] >= prev.progress[phase]);
            }
        }
    }

    let json = serde_json::to_string(&frames).unwrap();
    assert!(json.contains("\"state\":\"running\""));
    assert!(json.contains("\"operandA\""));
}
