//! Slew rate limiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits the rate of change of a scalar signal.
///
/// The limiter never reads a clock, the elapsed time since the previous call
/// is always provided by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlewLimiter {
    /// Maximum rate of change.
    ///
    /// Units: signal units/second
    rate: f64,

    /// Current (limited) value of the signal.
    value: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum SlewLimiterError {
    #[error("Slew rate must be finite and greater than zero, found {0}")]
    InvalidRate(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SlewLimiter {
    /// Create a new limiter starting at zero.
    pub fn new(rate: f64) -> Result<Self, SlewLimiterError> {
        Self::with_initial(rate, 0.0)
    }

    /// Create a new limiter starting at the given value.
    pub fn with_initial(rate: f64, value: f64) -> Result<Self, SlewLimiterError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SlewLimiterError::InvalidRate(rate));
        }

        Ok(Self { rate, value })
    }

    /// Step the current value towards `target` by at most `rate * elapsed_s`.
    ///
    /// A zero, negative or non-finite elapsed time leaves the value unchanged,
    /// as does a non-finite target.
    pub fn calculate(&mut self, target: f64, elapsed_s: f64) -> f64 {
        if !elapsed_s.is_finite() || elapsed_s <= 0.0 || !target.is_finite() {
            return self.value;
        }

        let max_step = self.rate * elapsed_s;
        let delta = target - self.value;

        if delta.abs() <= max_step {
            self.value = target;
        }
        else {
            self.value += max_step.copysign(delta);
        }

        self.value
    }

    /// Force the current value, bypassing the rate limit.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}
