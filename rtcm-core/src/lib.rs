//! rtcm-core: Pure RTCM 3.x codec library.
//!
//! No async, no sockets. Just bit fields, framing and message layouts. This
//! crate is the shared core used by both `rtcm-server` (fan-out server + CLI)
//! and `rtcm-feeder` (stream reader).

pub mod bits;
pub mod codec;
pub mod config;
pub mod crc;
pub mod ephemeris;
pub mod fields;
pub mod frame;
pub mod lock_time;
pub mod msm;
pub mod navigation;
pub mod observation;
pub mod reader;
pub mod ssr;
pub mod station;
pub mod stream;
pub mod types;

// Re-export commonly used types at crate root
pub use bits::{
    bin_to_binary_data, bin_to_hex, binary_data_to_bin, bits_to_double, bits_to_int, bits_to_sint,
    bits_to_uint, hex_to_bin, hex_to_int, hex_to_uint, to_bits, to_bits_scaled, to_bits_sign_magnitude,
    to_bits_signed, BitReader, BitWriter, Encoding, Field,
};
pub use codec::Rtcm;
pub use crc::{check_crc, crc24q};
pub use ephemeris::{GalileoEphemeris, GlonassEphemeris, GlonassUtcModel, GpsEphemeris, TimeReference};
pub use frame::{build_message, describe, parse_hex, parse_message, RtcmMessage};
pub use reader::{decode, Decoded};
pub use station::StationPosition;
pub use stream::FrameScanner;
pub use types::*;
