//! Predicates applied to observed profile values.

use serde::{Deserialize, Serialize};

use super::format::ParamNumber;

const EPSILON: f64 = 1e-10;

/// A predicate over one observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Assertion {
    /// Value must equal the expected value (with epsilon tolerance)
    Equals(f64),
    /// Value must be within the inclusive range
    Between(f64, f64),
}

impl Assertion {
    /// Inclusive range between two parameters.
    pub fn between(min: ParamNumber, max: ParamNumber) -> Self {
        Assertion::Between(min.as_f64(), max.as_f64())
    }

    /// Evaluates the assertion against a value.
    pub fn evaluate(&self, value: f64) -> bool {
        match self {
            Assertion::Equals(expected) => (value - expected).abs() < EPSILON,
            Assertion::Between(min, max) => value >= *min && value <= *max,
        }
    }
}

/// Returns true if two observed values are equal.
pub fn counts_equal(left: f64, right: f64) -> bool {
    Assertion::Equals(right).evaluate(left)
}
