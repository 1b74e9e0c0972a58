//! Cyclic module interface
//!
//! A module is set up once from the executable's parameters and then driven one input at a time
//! by the main loop. The control loop in `steer_exec` is driven with one cross track error sample
//! per simulator frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// State of a module which is processed once per main loop cycle.
pub trait State {
    /// Parameters the module is built from
    type InitData;
    type InitError;

    /// One cycle's worth of input
    type InputData;
    /// Demands produced for the cycle
    type OutputData;
    /// Snapshot of the module after the cycle, for logging and tests
    type StatusReport;
    type ProcError;

    /// Replace the module's state with a fresh one built from `init_data`.
    ///
    /// Any archives the module keeps are created inside the `session` archive directory. A module
    /// which fails to initialise must not be processed.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle.
    ///
    /// An input which is rejected leaves the module's state as it was before the call.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
