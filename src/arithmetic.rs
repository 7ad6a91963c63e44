//! 8-bit arithmetic evaluated by the simulator.
//!
//! Operands are always clamped into `0..=255`; results of add/subtract wrap
//! modulo 256. Nothing in here can fail: malformed text becomes 0 and an
//! unknown operation selector yields a result of 0.

use serde::Serialize;

/// Number of bits in an operand, and therefore the number of bit slices.
pub const BIT_WIDTH: usize = 8;

/// Operation selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    And,
    Or,
    Xor,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Add,
        Operation::Subtract,
        Operation::And,
        Operation::Or,
        Operation::Xor,
    ];

    /// Parse a selector as it comes from the operation dropdown.
    ///
    /// Returns `None` for anything unrecognised; callers treat that as the
    /// degenerate "result is 0" case rather than an error.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "add" | "+" => Some(Operation::Add),
            "sub" | "subtract" | "-" => Some(Operation::Subtract),
            "and" | "&" => Some(Operation::And),
            "or" | "|" => Some(Operation::Or),
            "xor" | "^" => Some(Operation::Xor),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "sub",
            Operation::And => "and",
            Operation::Or => "or",
            Operation::Xor => "xor",
        }
    }

    /// Whether the carry chain takes part in this operation.
    pub fn uses_carry(&self) -> bool {
        matches!(self, Operation::Add | Operation::Subtract)
    }
}

/// Evaluate `op` over two 8-bit operands.
pub fn evaluate(a: u8, b: u8, op: Operation) -> u8 {
    match op {
        Operation::Add => a.wrapping_add(b),
        Operation::Subtract => a.wrapping_sub(b),
        Operation::And => a & b,
        Operation::Or => a | b,
        Operation::Xor => a ^ b,
    }
}

/// Clamp an arbitrary integer into the operand range.
pub fn clamp_operand(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

/// Parse operand text the way a number input field is read.
///
/// An optional sign followed by leading decimal digits is used; anything after
/// the digits is ignored. Text without leading digits reads as 0.
pub fn parse_operand(text: &str) -> u8 {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else { break };
        seen_digit = true;
        // Saturate: anything past the operand range clamps to 255 anyway.
        value = value.saturating_mul(10).saturating_add(d as i64);
    }

    if !seen_digit {
        return 0;
    }
    clamp_operand(if negative { -value } else { value })
}

/// Decompose `n` into 8 bits, most significant first.
///
/// Index 0 is the leftmost bit on the bus labels, and is also bit slice 0 in
/// the animation.
pub fn to_bits(n: u8) -> [u8; BIT_WIDTH] {
    std::array::from_fn(|i| (n >> (BIT_WIDTH - 1 - i)) & 1)
}

/// Reassemble an integer from most-significant-first bits.
pub fn from_bits(bits: &[u8; BIT_WIDTH]) -> u8 {
    bits.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1))
}

/// Render `n` as an 8 character binary string.
pub fn format_bits(n: u8) -> String {
    format!("{:08b}", n)
}

/// One evaluated calculation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Calculation {
    pub a: u8,
    pub b: u8,
    /// `None` when the selector was not recognised.
    pub operation: Option<Operation>,
    pub result: u8,
}

impl Calculation {
    pub fn new(a: u8, b: u8, operation: Option<Operation>) -> Self {
        let result = match operation {
            Some(op) => evaluate(a, b, op),
            None => 0,
        };
        Self { a, b, operation, result }
    }

    /// Build a calculation from raw input text.
    pub fn from_text(a: &str, b: &str, operation: &str) -> Self {
        let op = Operation::parse(operation);
        if op.is_none() {
            log::warn!("Unknown operation '{}', result forced to 0", operation);
        }
        Self::new(parse_operand(a), parse_operand(b), op)
    }

    pub fn bits_a(&self) -> [u8; BIT_WIDTH] {
        to_bits(self.a)
    }

    pub fn bits_b(&self) -> [u8; BIT_WIDTH] {
        to_bits(self.b)
    }

    pub fn bits_result(&self) -> [u8; BIT_WIDTH] {
        to_bits(self.result)
    }

    pub fn uses_carry(&self) -> bool {
        self.operation.map(|op| op.uses_carry()).unwrap_or(false)
    }

    pub fn summary(&self) -> CalculationSummary {
        CalculationSummary {
            result: self.result,
            bin_a: format_bits(self.a),
            bin_b: format_bits(self.b),
            bin_out: format_bits(self.result),
        }
    }
}

/// Text shown in the result panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSummary {
    pub result: u8,
    pub bin_a: String,
    pub bin_b: String,
    pub bin_out: String,
}

impl std::fmt::Display for CalculationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result: {}", self.result)?;
        writeln!(f, "A:   {}", self.bin_a)?;
        writeln!(f, "B:   {}", self.bin_b)?;
        write!(f, "Out: {}", self.bin_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_wraps() {
        assert_eq!(evaluate(5, 3, Operation::Add), 8);
        assert_eq!(evaluate(255, 255, Operation::Add), 254);
        assert_eq!(evaluate(200, 56, Operation::Add), 0);
    }

    #[test]
    fn test_subtract_wraps() {
        assert_eq!(evaluate(3, 5, Operation::Subtract), 254);
        assert_eq!(evaluate(0, 1, Operation::Subtract), 255);
        assert_eq!(evaluate(10, 10, Operation::Subtract), 0);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(evaluate(12, 10, Operation::And), 8);
        assert_eq!(evaluate(12, 10, Operation::Or), 14);
        assert_eq!(evaluate(12, 10, Operation::Xor), 6);
    }

    #[test]
    fn test_parse_operand_leading_integer() {
        assert_eq!(parse_operand("42"), 42);
        assert_eq!(parse_operand("  7 "), 7);
        assert_eq!(parse_operand("12px"), 12);
        assert_eq!(parse_operand("3.9"), 3);
        assert_eq!(parse_operand("+9"), 9);
    }

    #[test]
    fn test_parse_operand_invalid_is_zero() {
        assert_eq!(parse_operand(""), 0);
        assert_eq!(parse_operand("abc"), 0);
        assert_eq!(parse_operand("-"), 0);
    }

    #[test]
    fn test_parse_operand_clamps() {
        assert_eq!(parse_operand("-5"), 0);
        assert_eq!(parse_operand("256"), 255);
        assert_eq!(parse_operand("99999999999999999999999"), 255);
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!(Operation::parse("add"), Some(Operation::Add));
        assert_eq!(Operation::parse("SUB"), Some(Operation::Subtract));
        assert_eq!(Operation::parse("subtract"), Some(Operation::Subtract));
        assert_eq!(Operation::parse(" xor "), Some(Operation::Xor));
        assert_eq!(Operation::parse("mul"), None);
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.name()), Some(op));
        }
    }

    #[test]
    fn test_unknown_operation_yields_zero() {
        let calc = Calculation::from_text("5", "3", "nand");
        assert_eq!(calc.operation, None);
        assert_eq!(calc.result, 0);
        assert!(!calc.uses_carry());
    }

    #[test]
    fn test_to_bits_msb_first() {
        assert_eq!(to_bits(5), [0, 0, 0, 0, 0, 1, 0, 1]);
        assert_eq!(to_bits(128), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(from_bits(&to_bits(173)), 173);
        assert_eq!(format_bits(8), "00001000");
    }

    #[test]
    fn test_summary_text() {
        let summary = Calculation::from_text("5", "3", "add").summary();
        assert_eq!(summary.result, 8);
        assert_eq!(summary.bin_a, "00000101");
        assert_eq!(summary.bin_b, "00000011");
        assert_eq!(summary.bin_out, "00001000");
        assert!(summary.to_string().starts_with("Result: 8"));
    }
}
