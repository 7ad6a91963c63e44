//! Colours used by the circuit and the flow indicators.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::scheduler::{SignalLevel, WireKind};

/// Straight-alpha sRGB colour with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return Err(anyhow!("Invalid colour '{}', expected #RRGGBB or #RRGGBBAA", hex));
        }
        let channel = |i: usize| -> Result<f32> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|e| anyhow!("Invalid colour '{}': {}", hex, e))
        };
        let a = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
        } else {
            format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                byte(self.r),
                byte(self.g),
                byte(self.b),
                byte(self.a)
            )
        }
    }

    pub fn with_alpha(&self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..*self }
    }

    /// Lighten (positive) or darken (negative) by `amount` out of 255 per channel.
    pub fn shade(&self, amount: i32) -> Self {
        let shift = |v: f32| ((v * 255.0).round() as i32 + amount).clamp(0, 255) as f32 / 255.0;
        Self::rgba(shift(self.r), shift(self.g), shift(self.b), self.a)
    }

    /// Components for a linear-space render target.
    pub fn to_linear(&self) -> [f32; 4] {
        let convert = |c: f32| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [convert(self.r), convert(self.g), convert(self.b), self.a]
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

fn hex(s: &str) -> Color {
    // Only used for the built-in constants below.
    Color::from_hex(s).unwrap_or(Color::rgba(1.0, 0.0, 1.0, 1.0))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Palette {
    pub background: Color,
    pub wire: Color,
    pub wire_active: Color,
    pub flow_high: Color,
    pub flow_low: Color,
    pub flow_transit: Color,
    pub gate_and: Color,
    pub gate_or: Color,
    pub gate_xor: Color,
    pub input_a: Color,
    pub input_b: Color,
    pub output: Color,
    /// Idle colour of the carry-chain wires.
    pub carry: Color,
    /// Fill of a dot whose bit is 0.
    pub bit_off: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: hex("#F5F7FA"),
            wire: hex("#B0BEC5"),
            wire_active: hex("#0288D1"),
            flow_high: hex("#00E676"),
            flow_low: hex("#90A4AE"),
            flow_transit: hex("#448AFF"),
            gate_and: hex("#1E88E5"),
            gate_or: hex("#7B1FA2"),
            gate_xor: hex("#F57C00"),
            input_a: hex("#0288D1"),
            input_b: hex("#7B1FA2"),
            output: hex("#00C853"),
            carry: hex("#F57C00"),
            bit_off: hex("#CFD8DC"),
        }
    }
}

impl Palette {
    pub fn level_color(&self, level: SignalLevel) -> Color {
        match level {
            SignalLevel::High => self.flow_high,
            SignalLevel::Low => self.flow_low,
            SignalLevel::Transit => self.flow_transit,
        }
    }

    /// Colour of an unlit wire.
    pub fn wire_color(&self, kind: WireKind) -> Color {
        match kind {
            WireKind::CarryChain => self.carry,
            _ => self.wire,
        }
    }
}
