//! Twiddle tuning parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::pid_ctrl::NUM_GAINS;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for twiddle tuning
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TwiddleParams {

    /// Enables online tuning of the gains.
    pub enabled: bool,

    /// Number of samples from process start before tuning begins.
    pub warm_up_samples: u64,

    /// Number of samples per evaluation window.
    pub window: u64,

    /// Initial perturbation size of each gain, in the order k_p, k_i, k_d.
    pub dp: [f64; NUM_GAINS]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TwiddleParams {
    fn default() -> Self {
        Self {
            enabled: false,
            warm_up_samples: 1000,
            window: 500,
            dp: [0.1, 0.0001, 1.0]
        }
    }
}
