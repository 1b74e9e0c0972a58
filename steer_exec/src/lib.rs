//! # Steering library.
//!
//! This library allows the executable, benchmarks and other crates in the workspace to access the
//! steering control modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control loop - runs each error sample through the controller and the tuner
pub mod ctrl_loop;

/// Executable parameters
pub mod params;

/// PID controller - turns the cross track error into a steering demand
pub mod pid_ctrl;

/// Simulator server - receives telemetry from and sends demands to the simulator
pub mod sim_server;

/// Twiddle tuner - tunes the controller gains online
pub mod twiddle;
