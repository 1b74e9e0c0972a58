//! Twiddle gain tuning module
//!
//! Coordinate ascent over the PID gains. Each gain in turn is nudged up by
//! its perturbation size, and if the summed error over the next window does
//! not improve it is tried the same distance below its starting value. A
//! direction that helps grows the perturbation, failing both ways shrinks it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Best error the tuner starts from, larger than any realistic window error.
pub const INITIAL_BEST_ERR: f64 = 100_000.0;

/// Factor applied to a perturbation after it improved the error.
pub const DP_GROW_FACTOR: f64 = 1.1;

/// Factor applied to a perturbation after both directions failed.
pub const DP_SHRINK_FACTOR: f64 = 0.9;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of the tuning cycle for the active gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TwiddlePhase {
    /// About to try the active gain increased by its perturbation.
    Start,

    /// The increased gain is being evaluated.
    Higher,

    /// The decreased gain is being evaluated.
    Lower
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Record of one completed tuning window.
///
/// Kept flat so it can be written as a CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowReport {
    /// Number of windows completed so far, starting at 1.
    pub window_num: u64,

    /// Index of the gain the transition acted on.
    pub gain_index: usize,

    pub phase_before: TwiddlePhase,
    pub phase_after: TwiddlePhase,

    /// Summed absolute error over the window.
    pub total_err: f64,

    /// Best window error after the transition.
    pub best_err: f64,

    /// Whether the window beat the previous best error.
    pub improved: bool,

    /// Gains committed to the controller.
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    /// Perturbation sizes after the transition.
    pub dp_p: f64,
    pub dp_i: f64,
    pub dp_d: f64
}
