//! # PID controller module
//!
//! Discrete PID controller driven by the cross track error. The controller works per sample rather
//! than per unit time: the integral is the plain sum of all errors since the last reset and the
//! derivative is the difference between the two most recent errors.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of gains in the controller, in the order Kp, Ki, Kd.
pub const NUM_GAINS: usize = 3;

/// Display names of the gains.
pub const GAIN_NAMES: [&str; NUM_GAINS] = ["k_p", "k_i", "k_d"];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: f64,

    /// The integral accumulation
    integral: f64,

    /// Difference between the latest error and the one before it
    deriv: f64
}

/// Initial gains of the controller.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains and no error history.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            prev_error: 0f64,
            integral: 0f64,
            deriv: 0f64
        }
    }

    /// Create a new controller from the parameters.
    pub fn from_params(params: &PidParams) -> Self {
        Self::new(params.k_p, params.k_i, params.k_d)
    }

    /// Set new gains, discarding the error history.
    ///
    /// The integral and derivative terms were built up under the old gains,
    /// so they are zeroed together with the previous error. Gains are taken
    /// as given, callers must clamp them if needed.
    pub fn set_gains_and_reset(&mut self, k_p: f64, k_i: f64, k_d: f64) {
        *self = Self::new(k_p, k_i, k_d);
    }

    /// Pass in the newest error sample.
    ///
    /// Must be called exactly once per sample, in the order the samples
    /// arrive.
    pub fn update_error(&mut self, error: f64) {
        self.deriv = error - self.prev_error;
        self.prev_error = error;
        self.integral += error;
    }

    /// Get the controller output for the current error state.
    pub fn total_error(&self) -> f64 {
        -(self.k_p * self.prev_error
            + self.k_d * self.deriv
            + self.k_i * self.integral)
    }

    /// The gains as `[k_p, k_i, k_d]`.
    pub fn gains(&self) -> [f64; NUM_GAINS] {
        [self.k_p, self.k_i, self.k_d]
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn deriv(&self) -> f64 {
        self.deriv
    }
}

impl Default for PidParams {
    fn default() -> Self {
        Self {
            k_p: 0.41,
            k_i: 0.000011,
            k_d: 3.89
        }
    }
}
