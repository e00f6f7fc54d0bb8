//! Number rendering for test result messages.
//!
//! Observed values always come out of the profiler as floats and render with
//! a fractional part (`100.0`). Expected values keep the numeric type the
//! parameter was given in, so an integer bound renders bare (`100`).

use serde_json::Value;
use std::fmt;

/// A numeric test parameter, remembering whether it was given as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamNumber {
    Int(i64),
    Float(f64),
}

impl ParamNumber {
    /// Reads a JSON number or a numeric string.
    pub fn from_json(value: &Value) -> Option<ParamNumber> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(ParamNumber::Int)
                .or_else(|| n.as_f64().map(ParamNumber::Float)),
            Value::String(s) => ParamNumber::parse(s),
            _ => None,
        }
    }

    /// Parses a numeric string, preferring the integer reading.
    pub fn parse(raw: &str) -> Option<ParamNumber> {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return Some(ParamNumber::Int(i));
        }
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(ParamNumber::Float)
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ParamNumber::Int(i) => *i as f64,
            ParamNumber::Float(f) => *f,
        }
    }
}

impl From<i64> for ParamNumber {
    fn from(value: i64) -> Self {
        ParamNumber::Int(value)
    }
}

impl From<f64> for ParamNumber {
    fn from(value: f64) -> Self {
        ParamNumber::Float(value)
    }
}

impl fmt::Display for ParamNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamNumber::Int(i) => write!(f, "{i}"),
            ParamNumber::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

/// Renders an observed value.
pub fn format_observed(value: f64) -> String {
    format_float(value)
}

/// Renders an optional observed value, `None` when absent.
pub fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format_float(v),
        None => "None".to_string(),
    }
}

/// Float rendering with a mandatory fractional part.
///
/// Very large and very small magnitudes switch to exponent notation with a
/// signed, two digit exponent (`1e+16`, `1e-05`).
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let rendered = format!("{value:e}");
        return match rendered.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => rendered,
        };
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
