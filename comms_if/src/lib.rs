//! # Communications interface crate.
//!
//! Provides the communications interfaces between the steering executable and the simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Simulator event frames (telemetry in, steering demands out)
pub mod sim;
