//! Steering executable entry point.
//!
//! # Architecture
//!
//! The executable serves a single simulator connection:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the control loop
//!     - Bind the simulator server
//!     - Main loop, one iteration per frame from the simulator:
//!         - Parse the frame
//!         - Run any telemetry through the control loop (PID and twiddle)
//!         - Archive completed tuning windows
//!         - Reply to the simulator
//!
//! The loop runs until the process is terminated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{debug, info, warn};
use std::path::Path;
use structopt::StructOpt;

// Internal
use steer_lib::{
    ctrl_loop::CtrlLoop,
    params::SteerExecParams,
    sim_server::{self, SimServer}
};
use util::{
    archive::Archived,
    host,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// PID steering controller for the driving simulator.
#[derive(Debug, StructOpt)]
#[structopt(name = "steer_exec")]
struct Opts {
    /// Parameter file, relative to `$STEER_SW_ROOT/params` unless absolute
    #[structopt(long, default_value = "steer_exec.toml")]
    params: String,

    /// Enable online twiddle tuning of the gains, overriding the parameter file
    #[structopt(long)]
    twiddle: bool,

    /// Minimum log level (info, debug or trace)
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "steer_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("PID Steering Executable\n");
    info!("Running on: {}", host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let mut params: SteerExecParams = match Path::new(&opts.params).is_absolute() {
        true => util::params::load_from_path(&opts.params),
        false => util::params::load(&opts.params)
    }.wrap_err("Could not load exec params")?;

    if opts.twiddle {
        params.twiddle.enabled = true;
    }

    info!("Exec parameters loaded");
    info!(
        "    Gains: k_p = {}, k_i = {}, k_d = {}",
        params.pid.k_p, params.pid.k_i, params.pid.k_d
    );
    if params.twiddle.enabled {
        info!(
            "    Twiddle enabled: warm-up {} samples, window {} samples, dp {:?}",
            params.twiddle.warm_up_samples, params.twiddle.window, params.twiddle.dp
        );
    }
    else {
        info!("    Twiddle disabled");
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ctrl_loop = CtrlLoop::default();
    ctrl_loop.init(params.clone(), &session)
        .wrap_err("Failed to initialise CtrlLoop")?;
    info!("CtrlLoop init complete");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut sim_server = SimServer::new(&zmq_ctx, &params)
        .wrap_err("Failed to initialise SimServer")?;
    info!("SimServer listening on {}", params.sim_endpoint);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        sim_server.check_connection();

        let frame = match sim_server.recv_frame() {
            Ok(Some(f)) => f,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue
            }
        };

        let reply = sim_server::handle_frame(&mut ctrl_loop, &frame);

        if let Err(e) = ctrl_loop.write() {
            warn!("Could not archive CtrlLoop data: {}", e);
        }

        // An undelivered reply is retried by the next recv_frame
        if let Err(e) = sim_server.send_reply(&reply) {
            warn!("{}", e);
        }
    }
}
