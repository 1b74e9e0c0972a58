//! # Simulator Server
//!
//! Abstracts over the networking side of the steering executable. The simulator bridge connects a
//! REQ socket to this server and forwards each frame it gets from the simulator. Every frame must
//! be answered with exactly one reply, even if the reply is empty.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    sim::{self, SimEvent, SimReply}
};
use log::{debug, info, trace, warn};
use util::module::State;

use crate::{ctrl_loop::CtrlLoop, params::SteerExecParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the steering executable.
pub struct SimServer {

    /// REP socket which accepts frames from the simulator bridge
    socket: MonitoredSocket,

    /// Connection state at the last check
    was_connected: bool,

    /// Reply which has not been delivered yet. The REP socket cannot receive again until it is.
    pending_reply: Option<String>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SimServer`]
#[derive(thiserror::Error, Debug)]
pub enum SimServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not recieve a frame from the simulator: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send a reply to the simulator: {0}")]
    SendError(zmq::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServer {

    /// Create a new instance of the simulator server bound to the endpoint in the parameters.
    ///
    /// This function will not wait for a connection from the simulator before returning.
    pub fn new(ctx: &zmq::Context, params: &SteerExecParams) -> Result<Self, SimServerError> {
        // Heartbeats let a bridge which vanished without closing its connection be seen as
        // disconnected
        let socket_options = SocketOptions {
            linger: 0,
            recv_timeout: 200,
            send_timeout: 10,
            heartbeat_ivl: 1000,
            heartbeat_timeout: 3000,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            socket_options,
            &params.sim_endpoint
        )?;

        Ok(Self {
            socket,
            was_connected: false,
            pending_reply: None
        })
    }

    /// Log when the simulator connects or disconnects.
    ///
    /// Returns the current connection state.
    pub fn check_connection(&mut self) -> bool {
        let connected = self.socket.connected();

        match (self.was_connected, connected) {
            (false, true) => info!("Simulator connected"),
            (true, false) => info!("Simulator disconnected"),
            _ => ()
        }
        self.was_connected = connected;

        connected
    }

    /// Receive the next frame from the simulator.
    ///
    /// Returns `Ok(None)` if nothing arrived before the receive timeout. If a frame is returned the
    /// caller MUST answer it with [`SimServer::send_reply`].
    ///
    /// If the last reply could not be sent it is retried first, and the error is returned if it
    /// still cannot be delivered.
    pub fn recv_frame(&mut self) -> Result<Option<String>, SimServerError> {
        self.flush_reply()?;

        match self.socket.recv_bytes(0) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(SimServerError::RecvError(e))
        }
    }

    /// Send the reply to the last received frame.
    ///
    /// A reply which fails to send is kept and retried by the next [`SimServer::recv_frame`].
    pub fn send_reply(&mut self, reply: &SimReply) -> Result<(), SimServerError> {
        let frame = reply.to_frame();

        trace!("Reply: {}", frame);

        self.pending_reply = Some(frame);
        self.flush_reply()
    }

    fn flush_reply(&mut self) -> Result<(), SimServerError> {
        if let Some(ref frame) = self.pending_reply {
            self.socket.send(frame.as_str(), 0)
                .map_err(SimServerError::SendError)?;
        }
        self.pending_reply = None;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Work out the reply to a frame from the simulator, running any telemetry through the control
/// loop.
///
/// Telemetry which cannot be read is not given to the control loop, the simulator is told to
/// drive manually instead.
pub fn handle_frame(ctrl_loop: &mut CtrlLoop, frame: &str) -> SimReply {
    let event = match sim::parse_frame(frame) {
        Ok(Some(e)) => e,
        Ok(None) => return SimReply::Empty,
        Err(e) => {
            warn!("Rejected frame from simulator: {}", e);
            return SimReply::Manual
        }
    };

    match event {
        SimEvent::Telemetry(telem) => match ctrl_loop.proc(&telem.cte) {
            Ok((dems, _)) => {
                debug!("CTE: {} Steering Value: {}", telem.cte, dems.steering_angle);
                SimReply::Steer(dems)
            },
            Err(e) => {
                warn!("Rejected telemetry sample: {}", e);
                SimReply::Manual
            }
        },
        SimEvent::Manual => SimReply::Manual,
        SimEvent::Other(name) => {
            debug!("Ignoring \"{}\" event", name);
            SimReply::Empty
        }
    }
}
