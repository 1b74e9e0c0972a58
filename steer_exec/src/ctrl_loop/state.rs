//! Implementations for the CtrlLoop state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{CtrlLoopError, CtrlLoopInitError};
use crate::{
    params::SteerExecParams,
    pid_ctrl::PidController,
    twiddle::{TwiddleTuner, WindowReport}
};
use comms_if::sim::SteerDems;
use util::{
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control loop module state
pub struct CtrlLoop {

    pid: PidController,

    /// The tuner, only present if tuning is enabled
    tuner: Option<TwiddleTuner>,

    /// Samples since process start before the tuner sees any error
    warm_up_samples: u64,

    throttle: f64,

    /// Samples processed since process start
    total_steps: u64,

    pub(crate) report: StatusReport,
    arch_windows: Option<Archiver>
}

/// Status report for CtrlLoop processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Samples processed since process start
    pub total_steps: u64,

    /// True if the sample was passed on to the tuner
    pub tuning_active: bool,

    /// Set if this sample completed a tuning window
    pub window: Option<WindowReport>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CtrlLoop {

    /// Create a new control loop from the parameters.
    ///
    /// The parameters are expected to have been validated. No archives are
    /// written by a loop created this way, use `State::init` for that.
    pub fn new(params: &SteerExecParams) -> Self {
        Self {
            pid: PidController::from_params(&params.pid),
            tuner: match params.twiddle.enabled {
                true => Some(TwiddleTuner::new(&params.twiddle)),
                false => None
            },
            warm_up_samples: params.twiddle.warm_up_samples,
            throttle: params.throttle,
            total_steps: 0,
            report: StatusReport::default(),
            arch_windows: None
        }
    }

    /// Process one cross track error sample, returning the steering output.
    ///
    /// Non-finite samples are rejected before they reach the controller, so
    /// they never enter its error history or the tuner's window.
    pub fn submit_sample(&mut self, cte: f64) -> Result<f64, CtrlLoopError> {
        if !cte.is_finite() {
            return Err(CtrlLoopError::NonFiniteSample(cte))
        }

        self.report = StatusReport::default();
        self.total_steps += 1;

        self.pid.update_error(cte);
        let output = self.pid.total_error();

        // Warm-up counts from process start
        if let Some(tuner) = self.tuner.as_mut() {
            if self.total_steps > self.warm_up_samples {
                self.report.tuning_active = true;

                if tuner.window_complete() {
                    self.report.window = Some(tuner.advance(&mut self.pid));
                }
                else {
                    tuner.accumulate(cte);
                }
            }
        }

        self.report.total_steps = self.total_steps;

        trace!("CtrlLoop: cte {} -> output {}", cte, output);

        Ok(output)
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// The tuner, or `None` if tuning is disabled.
    pub fn tuner(&self) -> Option<&TwiddleTuner> {
        self.tuner.as_ref()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

impl Default for CtrlLoop {
    fn default() -> Self {
        Self::new(&SteerExecParams::default())
    }
}

impl State for CtrlLoop {
    type InitData = SteerExecParams;
    type InitError = CtrlLoopInitError;

    type InputData = f64;
    type OutputData = SteerDems;
    type StatusReport = StatusReport;
    type ProcError = CtrlLoopError;

    /// Initialise the CtrlLoop module.
    ///
    /// Expected init data is the executable's parameters.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        init_data.validate()?;

        *self = Self::new(&init_data);

        if init_data.twiddle.enabled {
            self.arch_windows = Some(
                Archiver::from_path(session, "twiddle/windows.csv")
                    .map_err(|e| CtrlLoopInitError::ArchiveError("twiddle", e.to_string()))?
            );
        }

        Ok(())
    }

    /// Process one sample, producing the demands to send to the simulator.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let steering_angle = self.submit_sample(*input_data)?;

        Ok((
            SteerDems {
                steering_angle,
                throttle: self.throttle
            },
            self.report
        ))
    }
}

impl Archived for CtrlLoop {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut arch) = self.arch_windows {
            if let Some(window) = self.report.window.take() {
                arch.serialise(window)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::twiddle::{TwiddleParams, TwiddlePhase};

    fn tuning_params(warm_up_samples: u64, window: u64) -> SteerExecParams {
        SteerExecParams {
            twiddle: TwiddleParams {
                enabled: true,
                warm_up_samples,
                window,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_tuning_keeps_gains() {
        let mut ctrl = CtrlLoop::default();
        assert!(ctrl.tuner().is_none());

        for i in 0..5000 {
            ctrl.submit_sample((i as f64 * 0.01).sin()).unwrap();
            assert!(!ctrl.report.tuning_active);
        }

        assert_eq!(ctrl.pid().gains(), [0.41, 0.000011, 3.89]);
        assert_eq!(ctrl.total_steps(), 5000);
    }

    #[test]
    fn test_output_matches_controller() {
        let mut ctrl = CtrlLoop::default();

        let mut pid = PidController::new(0.41, 0.000011, 3.89);
        for cte in [0.7598, 0.7012, -0.25, 1.5].iter() {
            pid.update_error(*cte);
            assert_eq!(ctrl.submit_sample(*cte).unwrap(), pid.total_error());
        }
    }

    #[test]
    fn test_warm_up_and_windows() {
        let mut ctrl = CtrlLoop::new(&tuning_params(10, 5));

        // Warm-up samples are never seen by the tuner
        for _ in 0..10 {
            ctrl.submit_sample(100.0).unwrap();
            assert!(!ctrl.report.tuning_active);
        }
        assert_eq!(ctrl.tuner().unwrap().step(), 0);

        // First window
        for cte in [1.0, -2.0, 3.0, -4.0, 5.0].iter() {
            ctrl.submit_sample(*cte).unwrap();
            assert!(ctrl.report.tuning_active);
            assert!(ctrl.report.window.is_none());
        }
        assert_eq!(ctrl.tuner().unwrap().step(), 5);
        assert_eq!(ctrl.tuner().unwrap().total_err(), 15.0);

        // The next sample closes the window and is not counted in either
        // window
        let gains_before = ctrl.pid().gains();
        ctrl.submit_sample(7.0).unwrap();
        let window = ctrl.report.window.unwrap();
        assert_eq!(window.total_err, 15.0);
        assert_eq!(window.phase_before, TwiddlePhase::Start);
        assert_eq!(window.k_p, gains_before[0] + 0.1);
        assert_eq!(ctrl.pid().gains()[0], gains_before[0] + 0.1);
        assert_eq!(ctrl.tuner().unwrap().step(), 0);
        assert_eq!(ctrl.tuner().unwrap().total_err(), 0.0);

        // Controller history was reset by the gain commit
        assert_eq!(ctrl.pid().integral(), 0.0);

        ctrl.submit_sample(-0.5).unwrap();
        assert_eq!(ctrl.tuner().unwrap().step(), 1);
        assert_eq!(ctrl.tuner().unwrap().total_err(), 0.5);
    }

    #[test]
    fn test_output_uses_gains_before_window_advance() {
        let mut ctrl = CtrlLoop::new(&tuning_params(0, 1));

        ctrl.submit_sample(1.0).unwrap();

        let mut pid = *ctrl.pid();
        pid.update_error(2.0);
        let expected = pid.total_error();

        assert_eq!(ctrl.submit_sample(2.0).unwrap(), expected);
        assert!(ctrl.report.window.is_some());
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let mut ctrl = CtrlLoop::new(&tuning_params(0, 5));
        ctrl.submit_sample(0.5).unwrap();
        let pid_before = *ctrl.pid();

        for bad in [std::f64::NAN, std::f64::INFINITY, std::f64::NEG_INFINITY].iter() {
            match ctrl.submit_sample(*bad) {
                Err(CtrlLoopError::NonFiniteSample(_)) => (),
                other => panic!("Expected rejection, got {:?}", other)
            }
        }

        assert_eq!(*ctrl.pid(), pid_before);
        assert_eq!(ctrl.total_steps(), 1);
        assert_eq!(ctrl.tuner().unwrap().step(), 1);
    }

    #[test]
    fn test_proc_and_archive() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session {
            session_root: dir.path().to_path_buf(),
            arch_root: dir.path().join("arch"),
            log_file_path: dir.path().join("steer_exec.log"),
        };

        let mut ctrl = CtrlLoop::default();
        ctrl.init(tuning_params(0, 2), &session).unwrap();

        for cte in [0.5, -0.5, 0.25].iter() {
            let (dems, report) = ctrl.proc(cte).unwrap();
            assert_eq!(dems.throttle, 0.3);
            assert!(report.tuning_active);
            ctrl.write().unwrap();
        }

        let csv = std::fs::read_to_string(dir.path().join("arch/twiddle/windows.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("window_num,gain_index,phase_before,phase_after"));
        assert!(lines[1].starts_with("1,0,Start,Higher,1.0,"));
    }

    #[test]
    fn test_init_rejects_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session {
            session_root: dir.path().to_path_buf(),
            arch_root: dir.path().join("arch"),
            log_file_path: dir.path().join("steer_exec.log"),
        };

        let mut params = tuning_params(0, 2);
        params.twiddle.window = 0;

        let mut ctrl = CtrlLoop::default();
        assert!(matches!(
            ctrl.init(params, &session),
            Err(CtrlLoopInitError::InvalidParams(_))
        ));
    }
}
