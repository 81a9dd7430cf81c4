use serde::{Deserialize, Serialize};
use std::fmt;

/// Trust in a computed score, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Confidence(f64);

impl Confidence {
    pub const FULL: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {value}"
            ));
        }
        Ok(Confidence(value))
    }

    /// Clamp any input into range. NaN collapses to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Confidence(0.0);
        }
        Confidence(value.clamp(0.0, 1.0))
    }

    /// Subtract a penalty, staying in range.
    pub fn penalize(self, penalty: f64) -> Self {
        Confidence::clamped(self.0 - penalty)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Confidence::new(1.2).is_err());
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(0.4).is_ok());
    }

    #[test]
    fn test_penalties_never_go_negative() {
        let c = Confidence::FULL.penalize(0.7).penalize(0.7);
        assert_eq!(c.value(), 0.0);
    }

    #[test]
    fn test_nan_clamps_to_zero() {
        assert_eq!(Confidence::clamped(f64::NAN).value(), 0.0);
        assert_eq!(Confidence::clamped(f64::INFINITY).value(), 1.0);
    }
}
