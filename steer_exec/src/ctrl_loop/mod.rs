//! Control loop module
//!
//! Runs each cross track error sample through the PID controller and, when
//! tuning is enabled and the warm-up has elapsed, through the twiddle tuner.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use state::*;

use crate::params::ParamsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during CtrlLoop processing.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CtrlLoopError {
    #[error("Rejected non-finite error sample ({0})")]
    NonFiniteSample(f64),
}

/// Possible errors that can occur while initialising the CtrlLoop.
#[derive(Debug, thiserror::Error)]
pub enum CtrlLoopInitError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Could not create the {0} archive: {1}")]
    ArchiveError(&'static str, String),
}
