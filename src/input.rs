use crate::arithmetic::Calculation;
use crate::scheduler::Speed;
use serde::{Deserialize, Serialize};

/// Events raised by the input controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    CalculationRequested,
    SpeedChanged(Speed),
}

/// Read-on-demand view of the input controls.
///
/// Operand and operation values are the raw field text; parsing and clamping
/// happen when a calculation is requested.
pub trait InputSurface {
    fn operand_a(&self) -> &str;
    fn operand_b(&self) -> &str;
    fn operation(&self) -> &str;
    fn speed(&self) -> Speed;

    /// Evaluate whatever the controls currently hold.
    fn calculation(&self) -> Calculation {
        Calculation::from_text(self.operand_a(), self.operand_b(), self.operation())
    }
}

/// Plain stored input values, used by the CLI, the browser binding and tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticInputs {
    pub operand_a: String,
    pub operand_b: String,
    pub operation: String,
    pub speed: Speed,
}

impl StaticInputs {
    pub fn new(a: impl Into<String>, b: impl Into<String>, operation: impl Into<String>, speed: Speed) -> Self {
        Self {
            operand_a: a.into(),
            operand_b: b.into(),
            operation: operation.into(),
            speed,
        }
    }
}

impl Default for StaticInputs {
    fn default() -> Self {
        Self::new("5", "3", "add", Speed::default())
    }
}

impl InputSurface for StaticInputs {
    fn operand_a(&self) -> &str {
        &self.operand_a
    }

    fn operand_b(&self) -> &str {
        &self.operand_b
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    fn speed(&self) -> Speed {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let inputs = StaticInputs::default();
        let calc = inputs.calculation();
        assert_eq!((calc.a, calc.b, calc.result), (5, 3, 8));
        assert_eq!(inputs.speed().get(), 5);
    }

    #[test]
    fn test_garbage_inputs_read_as_zero() {
        let inputs = StaticInputs::new("", "abc", "add", Speed::new(3));
        let calc = inputs.calculation();
        assert_eq!((calc.a, calc.b, calc.result), (0, 0, 0));
    }

    #[test]
    fn test_deserialize_partial() {
        let inputs: StaticInputs = serde_json::from_str(r#"{ "operandA": "200", "speed": 99 }"#).unwrap();
        assert_eq!(inputs.operand_a, "200");
        assert_eq!(inputs.operand_b, "3");
        assert_eq!(inputs.speed.get(), 10);
    }
}
