//! Receive-side dispatch and send-side command surface.
//!
//! [`SimClient`] sits between the transport and the event sink: inbound
//! telegrams come in through [`SimClient::on_receive`] (or the blocking
//! [`SimClient::pump`] loop) and fan out to [`EventHandler`] callbacks;
//! outbound commands go out through the `send_*` family.

use std::io::BufRead;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::handler::EventHandler;
use crate::protocol::{CamConfig, Command, ProtocolError, SimEvent, decode_event};
use crate::transport::{Transport, TransportError, read_telegrams};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the send path: command encode or transport delivery.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from the receive pump: stream IO or telegram decode.
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("telegram stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ---------------------------------------------------------------------------
// SimClient
// ---------------------------------------------------------------------------

/// Client half of the simulator protocol.
///
/// Decodes inbound telegrams into sink callbacks and builds outbound
/// command telegrams. The client holds no protocol state of its own; the
/// shared [`ReadinessState`](gymkhana_core::readiness::ReadinessState)
/// lives behind the sink.
pub struct SimClient {
    transport: Arc<dyn Transport>,
    handler: Arc<dyn EventHandler>,
}

impl SimClient {
    /// Wire a transport to an event sink.
    pub fn new(transport: Arc<dyn Transport>, handler: Arc<dyn EventHandler>) -> Self {
        Self { transport, handler }
    }

    /// The sink this client dispatches into.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }

    // ---- receive path ----

    /// Decode one raw telegram and dispatch it to the sink.
    ///
    /// Unrecognized kinds are logged at info level and dropped; they are
    /// not errors. Decode and shape failures propagate to the caller.
    pub fn on_receive(&self, raw: &str) -> Result<(), ProtocolError> {
        match decode_event(raw)? {
            SimEvent::SceneSelectionReady => {
                debug!("scene selection ready");
                self.handler.on_scene_selection_ready();
            }
            SimEvent::SceneLoaded => {
                debug!("scene loaded");
                self.handler.on_scene_loaded();
            }
            SimEvent::CarLoaded => {
                // Flag first: a gate armed inside the callback must already
                // observe the car ready.
                self.handler.readiness().set_car_ready();
                debug!("car loaded");
                self.handler.on_car_loaded();
            }
            SimEvent::Telemetry(frame) => {
                self.handler.on_telemetry(&frame);
                debug!(
                    active_node = frame.active_node,
                    cte = frame.cte,
                    "telemetry frame"
                );
            }
            SimEvent::Unrecognized { msg_type } => {
                info!(%msg_type, raw, "unrecognized telegram kind");
            }
        }
        Ok(())
    }

    /// Read telegrams from `reader` until EOF, dispatching each.
    ///
    /// Stops at the first decode or shape failure and returns it; a hard
    /// protocol error means the stream can no longer be trusted. Returns
    /// Ok on a clean EOF.
    pub fn pump<R: BufRead>(&self, reader: R) -> Result<(), ReceiveError> {
        let mut failure: Option<ProtocolError> = None;
        read_telegrams(reader, |raw| match self.on_receive(raw) {
            Ok(()) => true,
            Err(err) => {
                failure = Some(err);
                false
            }
        })?;
        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    // ---- send path ----

    /// Encode one command and hand it to the transport.
    pub fn send(&self, command: &Command) -> Result<(), SendError> {
        let text = command.encode()?;
        debug!(
            command = command.name(),
            transport = self.transport.name(),
            "sending telegram"
        );
        self.transport.send(&text)?;
        Ok(())
    }

    /// Ask which protocol version the simulator speaks.
    pub fn send_get_protocol_version(&self) -> Result<(), SendError> {
        self.send(&Command::GetProtocolVersion)
    }

    /// Ask for the list of loadable scene names.
    pub fn send_get_scene_names(&self) -> Result<(), SendError> {
        self.send(&Command::GetSceneNames)
    }

    /// Load the named scene.
    pub fn send_load_scene(&self, scene_name: &str) -> Result<(), SendError> {
        self.send(&Command::load_scene(scene_name))
    }

    /// Pick the car body, livery color, and name plate.
    pub fn send_car_config(
        &self,
        body_style: &str,
        body_r: u8,
        body_g: u8,
        body_b: u8,
        car_name: &str,
        font_size: u32,
    ) -> Result<(), SendError> {
        self.send(&Command::car_config(
            body_style, body_r, body_g, body_b, car_name, font_size,
        ))
    }

    /// Configure the camera stream.
    pub fn send_cam_config(&self, config: CamConfig) -> Result<(), SendError> {
        self.send(&Command::cam_config(config))
    }

    /// Steer, accelerate, or brake.
    pub fn send_control(&self, angle: f64, throttle: f64, brake: f64) -> Result<(), SendError> {
        self.send(&Command::control(angle, throttle, brake))
    }

    /// Put the car back at the start line.
    pub fn send_reset_car(&self) -> Result<(), SendError> {
        self.send(&Command::ResetCar)
    }

    /// Teleport the car to the track node at `index`.
    pub fn send_set_position(&self, index: u32) -> Result<(), SendError> {
        self.send(&Command::set_position(index))
    }

    /// Leave the current scene.
    pub fn send_exit_scene(&self) -> Result<(), SendError> {
        self.send(&Command::ExitScene)
    }

    /// Shut the simulator down.
    pub fn send_quit_app(&self) -> Result<(), SendError> {
        self.send(&Command::QuitApp)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
