//! rtcm-server: fan-out of encoded RTCM messages over TCP.
//!
//! Producers hand hex-encoded messages to [`RtcmServer::send_message`]; a
//! bridge thread wraps them in the "GS" envelope and feeds them through an
//! internal client into a broadcast room that relays the raw frames to every
//! connected client.

pub mod bridge;
pub mod envelope;
pub mod error;
pub mod room;
pub mod server;
pub mod session;

pub use envelope::{decode_header, encode_header, EnvelopeCodec, Inbound};
pub use error::{Result, ServerError};
pub use room::{Room, RoomHandle};
pub use server::RtcmServer;
