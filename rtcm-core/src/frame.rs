//! RTCM 3 transport frame: preamble, length, body, CRC-24Q.
//!
//! ```text
//! +--------+----------+-----------+------------------+---------+
//! | 0xD3   | 000000   | length:10 | body (length B)  | CRC24Q  |
//! +--------+----------+-----------+------------------+---------+
//! ```

use serde::Serialize;

use crate::bits::{binary_data_to_bin, reserved, to_bits, BitWriter};
use crate::crc::{crc_bytes, verify};
use crate::types::{hex_decode, hex_encode, Result, RtcmError};

pub const PREAMBLE: u8 = 0xD3;
pub const MAX_BODY_LEN: usize = 1023;
pub const HEADER_LEN: usize = 3;
pub const CRC_LEN: usize = 3;

/// A complete frame. Constructed by [`build_message`] or validated by
/// [`parse_message`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RtcmMessage {
    bytes: Vec<u8>,
}

impl RtcmMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..self.bytes.len() - CRC_LEN]
    }

    /// Message number from the first 12 bits of the body.
    pub fn message_type(&self) -> Option<u16> {
        message_type(&self.bytes)
    }

    pub fn crc(&self) -> u32 {
        let n = self.bytes.len();
        (self.bytes[n - 3] as u32) << 16 | (self.bytes[n - 2] as u32) << 8 | self.bytes[n - 1] as u32
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.bytes)
    }

    pub fn to_bin_string(&self) -> String {
        binary_data_to_bin(&self.bytes)
    }
}

/// Frame an assembled body (zero padded to a byte boundary).
///
/// # Panics
/// If the body exceeds [`MAX_BODY_LEN`] bytes. Assemblers bound their
/// content so this cannot happen for well-formed input.
pub fn build_message(body: &BitWriter) -> RtcmMessage {
    let body_len = body.byte_len();
    assert!(
        body_len <= MAX_BODY_LEN,
        "RTCM body of {body_len} bytes does not fit the 10-bit length field"
    );
    let mut header = BitWriter::new();
    header
        .push(to_bits(PREAMBLE as u64, 8))
        .push(reserved(6))
        .push(to_bits(body_len as u64, 10));

    let mut bytes = header.into_bytes();
    bytes.reserve(body_len + CRC_LEN);
    bytes.extend_from_slice(body.as_bytes());
    let crc = crc_bytes(&bytes);
    bytes.extend_from_slice(&crc);
    RtcmMessage { bytes }
}

/// Declared body length from the first 3 frame bytes.
pub fn body_length(data: &[u8]) -> Option<usize> {
    if data.len() < HEADER_LEN {
        return None;
    }
    Some(((data[1] as usize & 0x03) << 8) | data[2] as usize)
}

/// Message number of a frame, without CRC validation.
pub fn message_type(data: &[u8]) -> Option<u16> {
    if data.len() < HEADER_LEN + 2 {
        return None;
    }
    Some(((data[3] as u16) << 4) | (data[4] as u16 >> 4))
}

/// Validate preamble, length and CRC of exactly one frame.
pub fn parse_message(data: &[u8]) -> Result<RtcmMessage> {
    if data.len() < HEADER_LEN + CRC_LEN {
        return Err(RtcmError::Truncated(data.len() * 8));
    }
    if data[0] != PREAMBLE {
        return Err(RtcmError::NoPreamble(data[0]));
    }
    let declared = body_length(data).unwrap_or(0);
    let actual = data.len() - HEADER_LEN - CRC_LEN;
    if declared != actual {
        return Err(RtcmError::InvalidLength { declared, actual });
    }
    if !verify(data) {
        return Err(RtcmError::CrcFailed);
    }
    Ok(RtcmMessage {
        bytes: data.to_vec(),
    })
}

/// [`parse_message`] over a hex string.
pub fn parse_hex(message_hex: &str) -> Result<RtcmMessage> {
    let hex = message_hex.trim();
    let data = hex_decode(hex).ok_or_else(|| RtcmError::InvalidSymbols {
        kind: "hex",
        input: hex.to_string(),
    })?;
    parse_message(&data)
}

// ---------------------------------------------------------------------------
// Message type metadata
// ---------------------------------------------------------------------------

/// Known message type table.
pub const MESSAGE_TYPES: &[(u16, &str)] = &[
    (1001, "GPS L1 observations"),
    (1002, "GPS L1 extended observations"),
    (1003, "GPS L1/L2 observations"),
    (1004, "GPS L1/L2 extended observations"),
    (1005, "Station ARP"),
    (1006, "Station ARP with height"),
    (1008, "Antenna descriptor and serial number"),
    (1009, "GLONASS L1 observations"),
    (1010, "GLONASS L1 extended observations"),
    (1011, "GLONASS L1/L2 observations"),
    (1012, "GLONASS L1/L2 extended observations"),
    (1019, "GPS ephemeris"),
    (1020, "GLONASS ephemeris"),
    (1029, "Unicode text"),
    (1045, "Galileo F/NAV ephemeris"),
    (1071, "GPS MSM1"),
    (1072, "GPS MSM2"),
    (1073, "GPS MSM3"),
    (1074, "GPS MSM4"),
    (1075, "GPS MSM5"),
    (1076, "GPS MSM6"),
    (1077, "GPS MSM7"),
    (1081, "GLONASS MSM1"),
    (1082, "GLONASS MSM2"),
    (1083, "GLONASS MSM3"),
    (1084, "GLONASS MSM4"),
    (1085, "GLONASS MSM5"),
    (1086, "GLONASS MSM6"),
    (1087, "GLONASS MSM7"),
    (1091, "Galileo MSM1"),
    (1092, "Galileo MSM2"),
    (1093, "Galileo MSM3"),
    (1094, "Galileo MSM4"),
    (1095, "Galileo MSM5"),
    (1096, "Galileo MSM6"),
    (1097, "Galileo MSM7"),
    (4076, "IGS SSR"),
];

/// Look up a message type description. Returns `None` for unknown types.
pub fn describe(message_type: u16) -> Option<&'static str> {
    MESSAGE_TYPES
        .iter()
        .find(|(t, _)| *t == message_type)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MT1005_EXAMPLE: &str = "D300133ED7D30202980EDEEF34B4BD62AC0941986F33360B98";

    fn body_of(len: usize) -> BitWriter {
        let mut w = BitWriter::new();
        for i in 0..len {
            w.push(to_bits((i % 251) as u64, 8));
        }
        w
    }

    #[test]
    fn test_frame_length_and_length_field() {
        for len in [0usize, 1, 19, 255, 256, 512, 1023] {
            let msg = build_message(&body_of(len));
            assert_eq!(msg.len(), HEADER_LEN + len + CRC_LEN);
            assert_eq!(body_length(msg.as_bytes()), Some(len));
            assert_eq!(msg.body().len(), len);
            assert!(verify(msg.as_bytes()));
        }
    }

    #[test]
    #[should_panic(expected = "10-bit length field")]
    fn test_oversized_body_rejected() {
        build_message(&body_of(1024));
    }

    #[test]
    fn test_body_padding() {
        let mut w = BitWriter::new();
        w.push(to_bits(1005, 12));
        let msg = build_message(&w);
        assert_eq!(msg.body(), &[0x3E, 0xD0]);
        assert_eq!(msg.message_type(), Some(1005));
    }

    #[test]
    fn test_parse_known_frame() {
        let msg = parse_hex(MT1005_EXAMPLE).unwrap();
        assert_eq!(msg.message_type(), Some(1005));
        assert_eq!(msg.body().len(), 19);
        assert_eq!(msg.crc(), 0x360B98);
        assert_eq!(msg.to_hex(), MT1005_EXAMPLE);
        assert!(msg.to_bin_string().starts_with("11010011000000"));
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        let mut data = hex_decode(MT1005_EXAMPLE).unwrap();
        assert!(matches!(parse_message(&data[..5]), Err(RtcmError::Truncated(_))));
        assert!(matches!(
            parse_message(&data[..data.len() - 1]),
            Err(RtcmError::InvalidLength { declared: 19, actual: 18 })
        ));
        data[10] ^= 0x04;
        assert!(matches!(parse_message(&data), Err(RtcmError::CrcFailed)));
        data[0] = 0xD2;
        assert!(matches!(parse_message(&data), Err(RtcmError::NoPreamble(0xD2))));
        assert!(matches!(parse_hex("D3XX"), Err(RtcmError::InvalidSymbols { .. })));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(1019), Some("GPS ephemeris"));
        assert_eq!(describe(1230), None);
    }
}
