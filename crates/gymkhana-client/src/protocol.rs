//! Simulator telegram protocol.
//!
//! Inbound telegrams decode into [`SimEvent`] values; outbound commands are
//! built with [`Command`] and serialize with every field value stringified,
//! which is what the simulator expects on its side of the wire.
//!
//! All telegrams are newline-delimited JSON objects discriminated by a
//! `msg_type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::notation::normalize_float_notation;

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// Errors raised on the telegram decode and command encode paths.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Telegram still is not valid JSON after numeral repair.
    #[error("telegram is not valid JSON after normalization: {0}")]
    Decode(#[source] serde_json::Error),

    /// Valid JSON, but no string `msg_type` discriminator.
    #[error("telegram has no msg_type discriminator")]
    MissingMsgType,

    /// Recognized kind whose payload does not match its shape.
    #[error("malformed {msg_type} payload: {source}")]
    Payload {
        msg_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A command failed to serialize.
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// One telemetry frame from the simulator.
///
/// `active_node` is the index of the track node nearest the car and `cte`
/// the signed cross-track error (lateral offset from the track center
/// line). Whatever else the simulator attaches to the frame (speed,
/// imagery, hit markers) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Telemetry {
    #[serde(rename = "activeNode")]
    pub active_node: i64,
    pub cte: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Telemetry {
    /// Build a frame carrying only the routing fields.
    #[must_use]
    pub fn new(active_node: i64, cte: f64) -> Self {
        Self {
            active_node,
            cte,
            extra: serde_json::Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimEvent
// ---------------------------------------------------------------------------

/// A decoded inbound telegram.
///
/// # Example
///
/// ```
/// use gymkhana_client::protocol::{decode_event, SimEvent};
///
/// let event = decode_event(r#"{"msg_type":"telemetry","activeNode":2,"cte":1,2}"#).unwrap();
/// let SimEvent::Telemetry(frame) = event else { panic!("expected telemetry") };
/// assert_eq!(frame.active_node, 2);
/// assert!((frame.cte - 1.2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// The simulator menu is up; scenes can be listed and loaded.
    SceneSelectionReady,
    /// The requested scene finished loading.
    SceneLoaded,
    /// The car spawned in the scene.
    CarLoaded,
    /// A telemetry frame.
    Telemetry(Telemetry),
    /// Any other kind; logged by the client, never dispatched.
    Unrecognized { msg_type: String },
}

/// Decode one raw telegram into a [`SimEvent`].
///
/// The telegram is numeral-repaired first (see [`normalize_float_notation`])
/// and then parsed. Text that still is not JSON afterwards is a
/// [`ProtocolError::Decode`]; valid JSON without a string `msg_type` is a
/// [`ProtocolError::MissingMsgType`]. Unknown kinds are not errors; they
/// decode into [`SimEvent::Unrecognized`] so the caller can log them.
pub fn decode_event(raw: &str) -> Result<SimEvent, ProtocolError> {
    let normalized = normalize_float_notation(raw);
    let mut value: Value = serde_json::from_str(&normalized).map_err(ProtocolError::Decode)?;
    let Some(msg_type) = value
        .get("msg_type")
        .and_then(Value::as_str)
        .map(str::to_owned)
    else {
        return Err(ProtocolError::MissingMsgType);
    };

    match msg_type.as_str() {
        "scene_selection_ready" => Ok(SimEvent::SceneSelectionReady),
        "scene_loaded" => Ok(SimEvent::SceneLoaded),
        "car_loaded" => Ok(SimEvent::CarLoaded),
        "telemetry" => {
            // The discriminator is routing metadata, not frame payload.
            if let Some(object) = value.as_object_mut() {
                object.remove("msg_type");
            }
            let frame = serde_json::from_value(value).map_err(|source| ProtocolError::Payload {
                msg_type: "telemetry",
                source,
            })?;
            Ok(SimEvent::Telemetry(frame))
        }
        _ => Ok(SimEvent::Unrecognized { msg_type }),
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// An outbound command telegram.
///
/// Every field value crosses the wire as a string regardless of semantic
/// type; the builders stringify so call sites keep native types.
///
/// # Example
///
/// ```
/// use gymkhana_client::protocol::Command;
///
/// let json = Command::control(0.5, 1.0, 0.0).encode().unwrap();
/// assert_eq!(json, r#"{"msg_type":"control","steering":"0.5","throttle":"1","brake":"0"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum Command {
    GetProtocolVersion,
    GetSceneNames,
    LoadScene {
        scene_name: String,
    },
    CarConfig {
        body_style: String,
        body_r: String,
        body_g: String,
        body_b: String,
        car_name: String,
        font_size: String,
    },
    CamConfig {
        fov: String,
        fish_eye_x: String,
        fish_eye_y: String,
        img_w: String,
        img_h: String,
        img_d: String,
        img_enc: String,
        offset_x: String,
        offset_y: String,
        offset_z: String,
        rot_x: String,
    },
    Control {
        steering: String,
        throttle: String,
        brake: String,
    },
    ResetCar,
    SetPosition {
        index: String,
    },
    ExitScene,
    QuitApp,
}

impl Command {
    /// Ask the simulator to load the named scene.
    #[must_use]
    pub fn load_scene(scene_name: impl Into<String>) -> Self {
        Self::LoadScene {
            scene_name: scene_name.into(),
        }
    }

    /// Pick the car body style, livery color, and name plate.
    #[must_use]
    pub fn car_config(
        body_style: impl Into<String>,
        body_r: u8,
        body_g: u8,
        body_b: u8,
        car_name: impl Into<String>,
        font_size: u32,
    ) -> Self {
        Self::CarConfig {
            body_style: body_style.into(),
            body_r: body_r.to_string(),
            body_g: body_g.to_string(),
            body_b: body_b.to_string(),
            car_name: car_name.into(),
            font_size: font_size.to_string(),
        }
    }

    /// Configure the camera stream.
    #[must_use]
    pub fn cam_config(config: CamConfig) -> Self {
        config.into()
    }

    /// Steer, accelerate, or brake.
    ///
    /// The first parameter is a steering angle but crosses the wire under
    /// the `steering` key; the simulator never sees the name `angle`.
    #[must_use]
    pub fn control(angle: f64, throttle: f64, brake: f64) -> Self {
        Self::Control {
            steering: angle.to_string(),
            throttle: throttle.to_string(),
            brake: brake.to_string(),
        }
    }

    /// Teleport the car to the track node at `index`.
    #[must_use]
    pub fn set_position(index: u32) -> Self {
        Self::SetPosition {
            index: index.to_string(),
        }
    }

    /// Wire name of this command (its `msg_type` value).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetProtocolVersion => "get_protocol_version",
            Self::GetSceneNames => "get_scene_names",
            Self::LoadScene { .. } => "load_scene",
            Self::CarConfig { .. } => "car_config",
            Self::CamConfig { .. } => "cam_config",
            Self::Control { .. } => "control",
            Self::ResetCar => "reset_car",
            Self::SetPosition { .. } => "set_position",
            Self::ExitScene => "exit_scene",
            Self::QuitApp => "quit_app",
        }
    }

    /// Serialize to one telegram's JSON text, without the trailing newline.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

// ---------------------------------------------------------------------------
// CamConfig
// ---------------------------------------------------------------------------

/// Camera configuration builder.
///
/// Defaults are held as the exact wire strings the simulator documents, so
/// an untouched config serializes verbatim. The setters take native values
/// and stringify them.
#[derive(Debug, Clone, PartialEq)]
pub struct CamConfig {
    fov: String,
    fish_eye_x: String,
    fish_eye_y: String,
    img_w: String,
    img_h: String,
    img_d: String,
    img_enc: String,
    offset_x: String,
    offset_y: String,
    offset_z: String,
    rot_x: String,
}

impl Default for CamConfig {
    fn default() -> Self {
        Self {
            fov: "100".into(),
            fish_eye_x: "0".into(),
            fish_eye_y: "0".into(),
            img_w: "160".into(),
            img_h: "120".into(),
            img_d: "3".into(),
            img_enc: "PNG".into(),
            offset_x: "0.0".into(),
            offset_y: "3.5".into(),
            offset_z: "0.0".into(),
            rot_x: "90.0".into(),
        }
    }
}

impl CamConfig {
    /// Camera config with the simulator's documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Field of view in degrees.
    #[must_use]
    pub fn with_fov(mut self, fov: u32) -> Self {
        self.fov = fov.to_string();
        self
    }

    /// Fish-eye distortion factors.
    #[must_use]
    pub fn with_fish_eye(mut self, x: f64, y: f64) -> Self {
        self.fish_eye_x = format_float(x);
        self.fish_eye_y = format_float(y);
        self
    }

    /// Image width, height, and channel depth.
    #[must_use]
    pub fn with_image(mut self, width: u32, height: u32, depth: u32) -> Self {
        self.img_w = width.to_string();
        self.img_h = height.to_string();
        self.img_d = depth.to_string();
        self
    }

    /// Image encoding tag, e.g. `PNG` or `JPG`.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.img_enc = encoding.into();
        self
    }

    /// Camera offset from the car body, in scene units.
    #[must_use]
    pub fn with_offset(mut self, x: f64, y: f64, z: f64) -> Self {
        self.offset_x = format_float(x);
        self.offset_y = format_float(y);
        self.offset_z = format_float(z);
        self
    }

    /// Camera pitch in degrees.
    #[must_use]
    pub fn with_rotation(mut self, rot_x: f64) -> Self {
        self.rot_x = format_float(rot_x);
        self
    }
}

impl From<CamConfig> for Command {
    fn from(config: CamConfig) -> Self {
        Self::CamConfig {
            fov: config.fov,
            fish_eye_x: config.fish_eye_x,
            fish_eye_y: config.fish_eye_y,
            img_w: config.img_w,
            img_h: config.img_h,
            img_d: config.img_d,
            img_enc: config.img_enc,
            offset_x: config.offset_x,
            offset_y: config.offset_y,
            offset_z: config.offset_z,
            rot_x: config.rot_x,
        }
    }
}

/// Stringify a float the way the simulator's own tooling prints one:
/// shortest decimal form, but with a fractional digit kept when the value
/// is integral (`90.0` stays `"90.0"`, not `"90"`).
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- decode ----

    #[test]
    fn decode_scene_selection_ready() {
        let event = decode_event(r#"{"msg_type":"scene_selection_ready"}"#).unwrap();
        assert_eq!(event, SimEvent::SceneSelectionReady);
    }

    #[test]
    fn decode_scene_loaded() {
        let event = decode_event(r#"{"msg_type":"scene_loaded"}"#).unwrap();
        assert_eq!(event, SimEvent::SceneLoaded);
    }

    #[test]
    fn decode_car_loaded() {
        let event = decode_event(r#"{"msg_type":"car_loaded"}"#).unwrap();
        assert_eq!(event, SimEvent::CarLoaded);
    }

    #[test]
    fn decode_telemetry_with_comma_decimal() {
        let event =
            decode_event(r#"{"msg_type":"telemetry","activeNode":14,"cte":3,05}"#).unwrap();
        let SimEvent::Telemetry(frame) = event else {
            panic!("expected telemetry");
        };
        assert_eq!(frame.active_node, 14);
        assert!((frame.cte - 3.05).abs() < 1e-12);
    }

    #[test]
    fn decode_telemetry_keeps_extra_fields() {
        let event = decode_event(
            r#"{"msg_type":"telemetry","activeNode":1,"cte":0.5,"speed":12.3,"hit":"none"}"#,
        )
        .unwrap();
        let SimEvent::Telemetry(frame) = event else {
            panic!("expected telemetry");
        };
        assert!((frame.extra["speed"].as_f64().unwrap() - 12.3).abs() < 1e-12);
        assert_eq!(frame.extra["hit"], "none");
        // The discriminator is stripped, not smuggled into the extras.
        assert!(!frame.extra.contains_key("msg_type"));
    }

    #[test]
    fn decode_unrecognized_kind() {
        let event = decode_event(r#"{"msg_type":"cross_start","timeSent":"0"}"#).unwrap();
        assert_eq!(
            event,
            SimEvent::Unrecognized {
                msg_type: "cross_start".into()
            }
        );
    }

    #[test]
    fn decode_missing_msg_type_is_shape_error() {
        let err = decode_event(r#"{"activeNode":1,"cte":0.5}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingMsgType));
    }

    #[test]
    fn decode_non_string_msg_type_is_shape_error() {
        let err = decode_event(r#"{"msg_type":12}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingMsgType));
    }

    #[test]
    fn decode_invalid_json_is_decode_error() {
        let err = decode_event(r#"{"msg_type":"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn decode_telemetry_without_cte_is_payload_error() {
        let err = decode_event(r#"{"msg_type":"telemetry","activeNode":1}"#).unwrap_err();
        let ProtocolError::Payload { msg_type, .. } = err else {
            panic!("expected payload error");
        };
        assert_eq!(msg_type, "telemetry");
    }

    // ---- error display ----

    #[test]
    fn protocol_error_display_messages() {
        assert_eq!(
            ProtocolError::MissingMsgType.to_string(),
            "telegram has no msg_type discriminator"
        );
        let err = decode_event("not json").unwrap_err();
        assert!(
            err.to_string()
                .starts_with("telegram is not valid JSON after normalization:")
        );
        let err = decode_event(r#"{"msg_type":"telemetry"}"#).unwrap_err();
        assert!(err.to_string().starts_with("malformed telemetry payload:"));
    }

    // ---- encode: unit commands ----

    #[test]
    fn unit_commands_encode_to_bare_discriminator() {
        assert_eq!(
            Command::GetProtocolVersion.encode().unwrap(),
            r#"{"msg_type":"get_protocol_version"}"#
        );
        assert_eq!(
            Command::GetSceneNames.encode().unwrap(),
            r#"{"msg_type":"get_scene_names"}"#
        );
        assert_eq!(
            Command::ResetCar.encode().unwrap(),
            r#"{"msg_type":"reset_car"}"#
        );
        assert_eq!(
            Command::ExitScene.encode().unwrap(),
            r#"{"msg_type":"exit_scene"}"#
        );
        assert_eq!(
            Command::QuitApp.encode().unwrap(),
            r#"{"msg_type":"quit_app"}"#
        );
    }

    // ---- encode: parameterized commands ----

    #[test]
    fn load_scene_encodes_scene_name() {
        assert_eq!(
            Command::load_scene("generated_road").encode().unwrap(),
            r#"{"msg_type":"load_scene","scene_name":"generated_road"}"#
        );
    }

    #[test]
    fn control_stringifies_every_value() {
        assert_eq!(
            Command::control(0.5, 1.0, 0.0).encode().unwrap(),
            r#"{"msg_type":"control","steering":"0.5","throttle":"1","brake":"0"}"#
        );
    }

    #[test]
    fn control_uses_steering_wire_key() {
        let json = Command::control(-0.25, 0.3, 0.0).encode().unwrap();
        assert!(json.contains(r#""steering":"-0.25""#));
        assert!(!json.contains("angle"));
    }

    #[test]
    fn set_position_stringifies_index() {
        assert_eq!(
            Command::set_position(12).encode().unwrap(),
            r#"{"msg_type":"set_position","index":"12"}"#
        );
    }

    #[test]
    fn car_config_stringifies_every_value() {
        let json = Command::car_config("donkey", 255, 16, 0, "gymkhana", 24)
            .encode()
            .unwrap();
        assert_eq!(
            json,
            r#"{"msg_type":"car_config","body_style":"donkey","body_r":"255","body_g":"16","body_b":"0","car_name":"gymkhana","font_size":"24"}"#
        );
    }

    #[test]
    fn all_command_values_are_strings() {
        let commands = [
            Command::load_scene("warehouse"),
            Command::car_config("car01", 1, 2, 3, "name", 10),
            Command::cam_config(CamConfig::new()),
            Command::control(0.1, 0.9, 0.05),
            Command::set_position(3),
        ];
        for command in &commands {
            let value: Value = serde_json::from_str(&command.encode().unwrap()).unwrap();
            for (key, field) in value.as_object().unwrap() {
                assert!(field.is_string(), "{key} of {} is not a string", command.name());
            }
        }
    }

    // ---- cam_config ----

    #[test]
    fn cam_config_defaults_verbatim() {
        assert_eq!(
            Command::cam_config(CamConfig::new()).encode().unwrap(),
            r#"{"msg_type":"cam_config","fov":"100","fish_eye_x":"0","fish_eye_y":"0","img_w":"160","img_h":"120","img_d":"3","img_enc":"PNG","offset_x":"0.0","offset_y":"3.5","offset_z":"0.0","rot_x":"90.0"}"#
        );
    }

    #[test]
    fn cam_config_setters_stringify() {
        let config = CamConfig::new()
            .with_fov(120)
            .with_image(320, 240, 1)
            .with_encoding("JPG")
            .with_offset(0.0, 1.5, -2.0)
            .with_rotation(45.0)
            .with_fish_eye(0.25, 0.0);
        let json = Command::cam_config(config).encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["fov"], "120");
        assert_eq!(value["img_w"], "320");
        assert_eq!(value["img_h"], "240");
        assert_eq!(value["img_d"], "1");
        assert_eq!(value["img_enc"], "JPG");
        assert_eq!(value["offset_x"], "0.0");
        assert_eq!(value["offset_y"], "1.5");
        assert_eq!(value["offset_z"], "-2.0");
        assert_eq!(value["rot_x"], "45.0");
        assert_eq!(value["fish_eye_x"], "0.25");
        assert_eq!(value["fish_eye_y"], "0.0");
    }

    // ---- command names ----

    #[test]
    fn command_names_match_wire_discriminators() {
        let commands = [
            Command::GetProtocolVersion,
            Command::GetSceneNames,
            Command::load_scene("x"),
            Command::car_config("s", 0, 0, 0, "n", 1),
            Command::cam_config(CamConfig::new()),
            Command::control(0.0, 0.0, 0.0),
            Command::ResetCar,
            Command::set_position(0),
            Command::ExitScene,
            Command::QuitApp,
        ];
        for command in &commands {
            let value: Value = serde_json::from_str(&command.encode().unwrap()).unwrap();
            assert_eq!(value["msg_type"], command.name());
        }
    }

    // ---- serde round-trip ----

    #[test]
    fn command_roundtrip() {
        let command = Command::control(0.7, 0.2, 0.0);
        let json = command.encode().unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, command);
    }

    #[test]
    fn telemetry_new_has_no_extras() {
        let frame = Telemetry::new(5, -0.25);
        assert_eq!(frame.active_node, 5);
        assert!((frame.cte + 0.25).abs() < 1e-12);
        assert!(frame.extra.is_empty());
    }
}
