//! # Steering executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    pid_ctrl::{PidParams, GAIN_NAMES},
    twiddle::TwiddleParams
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the steering executable, loaded once at startup.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SteerExecParams {

    /// Endpoint the simulator server binds to
    pub sim_endpoint: String,

    /// Throttle sent alongside every steering demand
    pub throttle: f64,

    /// Initial controller gains
    pub pid: PidParams,

    /// Online gain tuning
    pub twiddle: TwiddleParams
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a parameter set is rejected.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("Gain {0} must be finite and non-negative, found {1}")]
    InvalidGain(&'static str, f64),

    #[error("Perturbation of {0} must be finite and strictly positive, found {1}")]
    InvalidPerturbation(&'static str, f64),

    #[error("The tuning window must contain at least one sample")]
    ZeroWindow,

    #[error("Throttle must be finite, found {0}")]
    InvalidThrottle(f64)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteerExecParams {
    /// Check the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let gains = [self.pid.k_p, self.pid.k_i, self.pid.k_d];

        for (name, g) in GAIN_NAMES.iter().zip(gains.iter()) {
            if !g.is_finite() || *g < 0.0 {
                return Err(ParamsError::InvalidGain(*name, *g))
            }
        }

        for (name, d) in GAIN_NAMES.iter().zip(self.twiddle.dp.iter()) {
            if !d.is_finite() || *d <= 0.0 {
                return Err(ParamsError::InvalidPerturbation(*name, *d))
            }
        }

        if self.twiddle.window == 0 {
            return Err(ParamsError::ZeroWindow)
        }

        if !self.throttle.is_finite() {
            return Err(ParamsError::InvalidThrottle(self.throttle))
        }

        Ok(())
    }
}

impl Default for SteerExecParams {
    fn default() -> Self {
        Self {
            sim_endpoint: String::from("tcp://*:4567"),
            throttle: 0.3,
            pid: PidParams::default(),
            twiddle: TwiddleParams::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SteerExecParams::default();

        assert_eq!(params.pid.k_p, 0.41);
        assert_eq!(params.pid.k_i, 0.000011);
        assert_eq!(params.pid.k_d, 3.89);
        assert!(!params.twiddle.enabled);
        assert_eq!(params.twiddle.warm_up_samples, 1000);
        assert_eq!(params.twiddle.window, 500);
        assert_eq!(params.twiddle.dp, [0.1, 0.0001, 1.0]);
        assert_eq!(params.throttle, 0.3);
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn test_shipped_params_file() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../params/steer_exec.toml");

        let params: SteerExecParams = util::params::load_from_path(path).unwrap();
        assert_eq!(params, SteerExecParams::default());
    }

    #[test]
    fn test_partial_params_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[twiddle]\nenabled = true\nwindow = 100").unwrap();

        let params: SteerExecParams = util::params::load_from_path(file.path()).unwrap();
        assert!(params.twiddle.enabled);
        assert_eq!(params.twiddle.window, 100);
        assert_eq!(params.twiddle.warm_up_samples, 1000);
        assert_eq!(params.pid, PidParams::default());
    }

    #[test]
    fn test_validate() {
        let mut params = SteerExecParams::default();
        params.pid.k_i = -0.1;
        assert_eq!(params.validate(), Err(ParamsError::InvalidGain("k_i", -0.1)));

        let mut params = SteerExecParams::default();
        params.twiddle.dp[2] = 0.0;
        assert_eq!(params.validate(), Err(ParamsError::InvalidPerturbation("k_d", 0.0)));

        let mut params = SteerExecParams::default();
        params.twiddle.window = 0;
        assert_eq!(params.validate(), Err(ParamsError::ZeroWindow));

        let mut params = SteerExecParams::default();
        params.pid.k_p = std::f64::NAN;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidGain("k_p", _))));
    }
}
