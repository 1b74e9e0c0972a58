//! Implementations for the twiddle tuner state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;

// Internal
use super::{
    TwiddleParams, TwiddlePhase, WindowReport,
    INITIAL_BEST_ERR, DP_GROW_FACTOR, DP_SHRINK_FACTOR};
use crate::pid_ctrl::{PidController, NUM_GAINS, GAIN_NAMES};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Twiddle tuner state.
///
/// The tuner collects the absolute error of each sample in the current
/// window. Once the window is complete `advance` moves the search one step
/// and commits new gains to the controller.
#[derive(Debug, Clone)]
pub struct TwiddleTuner {
    /// Samples accumulated in the current window
    step: u64,

    /// Samples per window
    window: u64,

    /// Best window error seen so far, never increases
    best_err: f64,

    /// Summed absolute error of the current window
    total_err: f64,

    /// Perturbation size for each gain
    dp: [f64; NUM_GAINS],

    /// Gain currently being tuned
    index: usize,

    phase: TwiddlePhase,

    /// Number of completed windows
    num_windows: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TwiddleTuner {

    /// Create a new tuner starting on the first gain.
    pub fn new(params: &TwiddleParams) -> Self {
        Self {
            step: 0,
            window: params.window,
            best_err: INITIAL_BEST_ERR,
            total_err: 0f64,
            dp: params.dp,
            index: 0,
            phase: TwiddlePhase::Start,
            num_windows: 0
        }
    }

    /// True once the current window holds `window` samples.
    pub fn window_complete(&self) -> bool {
        self.step >= self.window
    }

    /// Add a sample's error to the current window.
    pub fn accumulate(&mut self, error: f64) {
        self.total_err += error.abs();
        self.step += 1;
    }

    /// Finish the current window: run one search step on its accumulated
    /// error and start a new, empty window.
    pub fn advance(&mut self, pid: &mut PidController) -> WindowReport {
        let total_err = self.total_err;
        let report = self.advance_with_error(total_err, pid);

        self.step = 0;
        self.total_err = 0f64;

        report
    }

    /// Run one search step for a window with the given summed error.
    ///
    /// The new gains are clamped to be non-negative and committed to the
    /// controller, which also clears its error history. The window
    /// accumulator is left untouched.
    pub fn advance_with_error(
        &mut self,
        total_err: f64,
        pid: &mut PidController
    ) -> WindowReport {
        let mut p = pid.gains();
        let i = self.index;
        let phase_before = self.phase;
        let improved = total_err < self.best_err;

        match self.phase {
            TwiddlePhase::Start => {
                p[i] += self.dp[i];
                self.phase = TwiddlePhase::Higher;
            },
            TwiddlePhase::Higher => {
                if improved {
                    self.best_err = total_err;
                    self.dp[i] *= DP_GROW_FACTOR;
                    self.phase = TwiddlePhase::Start;
                    self.next_gain();
                }
                else {
                    // Undo the increase and try the other side
                    p[i] -= 2.0 * self.dp[i];
                    self.phase = TwiddlePhase::Lower;
                }
            },
            TwiddlePhase::Lower => {
                if improved {
                    self.best_err = total_err;
                    self.dp[i] *= DP_GROW_FACTOR;
                }
                else {
                    // Back to where this gain started
                    p[i] += self.dp[i];
                    self.dp[i] *= DP_SHRINK_FACTOR;
                }
                self.phase = TwiddlePhase::Start;
                self.next_gain();
            }
        }

        for g in p.iter_mut() {
            *g = g.max(0.0);
        }
        pid.set_gains_and_reset(p[0], p[1], p[2]);

        self.num_windows += 1;

        let report = WindowReport {
            window_num: self.num_windows,
            gain_index: i,
            phase_before,
            phase_after: self.phase,
            total_err,
            best_err: self.best_err,
            improved: improved && phase_before != TwiddlePhase::Start,
            k_p: p[0],
            k_i: p[1],
            k_d: p[2],
            dp_p: self.dp[0],
            dp_i: self.dp[1],
            dp_d: self.dp[2]
        };

        info!(
            "Twiddle window {}: {} {:?} -> {:?}, error {:.4} (best {:.4}), gains [{:.6}, {:.6}, {:.6}]",
            report.window_num,
            GAIN_NAMES[i],
            phase_before,
            self.phase,
            total_err,
            self.best_err,
            p[0], p[1], p[2]
        );

        report
    }

    pub fn best_err(&self) -> f64 {
        self.best_err
    }

    pub fn total_err(&self) -> f64 {
        self.total_err
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn dp(&self) -> [f64; NUM_GAINS] {
        self.dp
    }

    /// Index of the gain under test, 0 for k_p, 1 for k_i, 2 for k_d.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> TwiddlePhase {
        self.phase
    }

    pub fn num_windows(&self) -> u64 {
        self.num_windows
    }

    fn next_gain(&mut self) {
        self.index = (self.index + 1) % NUM_GAINS;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_tuner() -> TwiddleTuner {
        TwiddleTuner::new(&TwiddleParams {
            enabled: true,
            warm_up_samples: 0,
            window: 4,
            dp: [1.0, 1.0, 1.0]
        })
    }

    #[test]
    fn test_scenario() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);
        let mut tuner = unit_tuner();
        assert_eq!(tuner.best_err(), 100_000.0);

        // Window 1: first step raises k_p
        let report = tuner.advance_with_error(5.0, &mut pid);
        assert_eq!(pid.gains(), [2.0, 1.0, 1.0]);
        assert_eq!(tuner.phase(), TwiddlePhase::Higher);
        assert_eq!(tuner.best_err(), 100_000.0);
        assert!(!report.improved);

        // Window 2: raising k_p helped
        let report = tuner.advance_with_error(3.0, &mut pid);
        assert_eq!(tuner.best_err(), 3.0);
        assert!((tuner.dp()[0] - 1.1).abs() < 1e-12);
        assert_eq!(tuner.phase(), TwiddlePhase::Start);
        assert_eq!(tuner.index(), 1);
        assert_eq!(pid.gains(), [2.0, 1.0, 1.0]);
        assert!(report.improved);
        assert_eq!(report.gain_index, 0);

        // Window 3: start probing k_i
        tuner.advance_with_error(10.0, &mut pid);
        assert_eq!(pid.gains(), [2.0, 2.0, 1.0]);
        assert_eq!(tuner.phase(), TwiddlePhase::Higher);
        assert_eq!(tuner.best_err(), 3.0);
    }

    #[test]
    fn test_lower_step_restores_gain_and_shrinks_dp() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);
        let mut tuner = unit_tuner();

        tuner.advance_with_error(5.0, &mut pid);
        tuner.advance_with_error(3.0, &mut pid);
        assert_eq!(tuner.index(), 1);

        // k_i: up, no better, down, no better
        tuner.advance_with_error(10.0, &mut pid);
        tuner.advance_with_error(10.0, &mut pid);
        assert_eq!(pid.gains(), [2.0, 0.0, 1.0]);
        assert_eq!(tuner.phase(), TwiddlePhase::Lower);

        tuner.advance_with_error(10.0, &mut pid);
        assert_eq!(pid.gains(), [2.0, 1.0, 1.0]);
        assert!((tuner.dp()[1] - 0.9).abs() < 1e-12);
        assert_eq!(tuner.phase(), TwiddlePhase::Start);
        assert_eq!(tuner.index(), 2);
        assert_eq!(tuner.best_err(), 3.0);
    }

    #[test]
    fn test_lower_step_improvement_keeps_gain() {
        let mut pid = PidController::new(3.0, 0.0, 0.0);
        let mut tuner = unit_tuner();

        tuner.advance_with_error(5.0, &mut pid);
        tuner.advance_with_error(200_000.0, &mut pid);
        assert_eq!(pid.gains()[0], 2.0);

        let report = tuner.advance_with_error(7.0, &mut pid);
        assert_eq!(pid.gains()[0], 2.0);
        assert_eq!(tuner.best_err(), 7.0);
        assert!((tuner.dp()[0] - 1.1).abs() < 1e-12);
        assert_eq!(tuner.index(), 1);
        assert!(report.improved);
    }

    #[test]
    fn test_equal_error_is_not_an_improvement() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);
        let mut tuner = unit_tuner();

        tuner.advance_with_error(5.0, &mut pid);
        assert_eq!(pid.gains(), [2.0, 1.0, 1.0]);

        // Matching the best error in HIGHER still tries the other side
        let report = tuner.advance_with_error(100_000.0, &mut pid);
        assert!(!report.improved);
        assert_eq!(tuner.phase(), TwiddlePhase::Lower);
        assert_eq!(tuner.best_err(), 100_000.0);
        assert_eq!(tuner.dp(), [1.0, 1.0, 1.0]);
        assert_eq!(pid.gains(), [0.0, 1.0, 1.0]);

        // And in LOWER the gain is restored with a smaller step
        let report = tuner.advance_with_error(100_000.0, &mut pid);
        assert!(!report.improved);
        assert_eq!(tuner.best_err(), 100_000.0);
        assert_eq!(pid.gains(), [1.0, 1.0, 1.0]);
        assert!((tuner.dp()[0] - 0.9).abs() < 1e-12);
        assert_eq!(tuner.phase(), TwiddlePhase::Start);
        assert_eq!(tuner.index(), 1);
    }

    #[test]
    fn test_index_cycles_through_all_gains() {
        let mut pid = PidController::new(5.0, 5.0, 5.0);
        let mut tuner = unit_tuner();

        // Never improve, so every gain goes Start -> Higher -> Lower -> Start
        let mut indices = vec![tuner.index()];
        for _ in 0..3 {
            for _ in 0..3 {
                tuner.advance_with_error(200_000.0, &mut pid);
            }
            indices.push(tuner.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(tuner.phase(), TwiddlePhase::Start);

        // Always improve, so every gain goes Start -> Higher -> Start
        let mut best = 1000.0;
        for expected in [1, 2, 0, 1, 2, 0].iter() {
            tuner.advance_with_error(best, &mut pid);
            best -= 1.0;
            tuner.advance_with_error(best, &mut pid);
            best -= 1.0;
            assert_eq!(tuner.index(), *expected);
        }
    }

    #[test]
    fn test_gains_non_negative_and_best_err_monotonic() {
        let mut pid = PidController::new(0.05, 0.0, 0.5);
        let mut tuner = TwiddleTuner::new(&TwiddleParams::default());

        let mut prev_best = tuner.best_err();
        let mut seed: u64 = 12345;

        for _ in 0..300 {
            // Simple LCG for a repeatable error sequence
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let err = (seed >> 33) as f64 / (1u64 << 31) as f64 * 50.0;

            let report = tuner.advance_with_error(err, &mut pid);

            assert!(pid.gains().iter().all(|g| *g >= 0.0));
            assert!(tuner.dp().iter().all(|d| *d > 0.0));
            assert!(tuner.best_err() <= prev_best);
            assert!(tuner.index() < NUM_GAINS);
            assert_eq!(report.best_err, tuner.best_err());
            prev_best = tuner.best_err();
        }
    }

    #[test]
    fn test_window_accumulation() {
        let mut pid = PidController::new(1.0, 0.0, 0.0);
        let mut tuner = unit_tuner();

        for e in [1.0, -2.0, 0.5].iter() {
            tuner.accumulate(*e);
            assert!(!tuner.window_complete());
        }
        tuner.accumulate(-0.5);
        assert!(tuner.window_complete());
        assert_eq!(tuner.total_err(), 4.0);

        pid.update_error(3.0);
        let report = tuner.advance(&mut pid);
        assert_eq!(report.total_err, 4.0);
        assert_eq!(report.window_num, 1);
        assert_eq!(tuner.step(), 0);
        assert_eq!(tuner.total_err(), 0.0);
        assert_eq!(tuner.num_windows(), 1);

        // Committing gains cleared the controller's history
        assert_eq!(pid.prev_error(), 0.0);
        assert_eq!(pid.gains(), [2.0, 0.0, 0.0]);
    }
}
