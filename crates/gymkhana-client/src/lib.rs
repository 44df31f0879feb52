//! Client side of the simulator's JSON telegram protocol.
//!
//! This crate provides everything between a raw telegram stream and the
//! evaluation logic on top of it:
//!
//! - [`notation`] — repair of decimal-comma numerals in inbound telegrams
//! - [`protocol`] — inbound [`SimEvent`] decoding and outbound [`Command`]
//!   builders with all-string field values
//! - [`handler`] — the [`EventHandler`] sink trait the driving logic
//!   implements
//! - [`transport`] — the [`Transport`] send seam, a newline-framed TCP
//!   implementation, and an in-memory capture for tests
//! - [`client`] — [`SimClient`], which decodes telegrams into sink
//!   callbacks and exposes the full send surface
//!
//! Telegrams are single-line JSON objects discriminated by a `msg_type`
//! field. Inbound text is normalized before parsing because the simulator
//! emits decimal commas under some host locales.

pub mod client;
pub mod handler;
pub mod notation;
pub mod protocol;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use client::{ReceiveError, SendError, SimClient};
pub use handler::{EventHandler, NoopHandler};
pub use notation::normalize_float_notation;
pub use protocol::{CamConfig, Command, ProtocolError, SimEvent, Telemetry, decode_event};
pub use transport::{InMemoryTransport, TcpTransport, Transport, TransportError, read_telegrams};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CamConfig, Command, EventHandler, NoopHandler, ProtocolError, ReceiveError, SendError,
        SimClient, SimEvent, TcpTransport, Telemetry, Transport, TransportError,
    };
}
