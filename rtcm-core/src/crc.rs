//! CRC-24Q integrity check for RTCM 3 frames.
//!
//! Qualcomm polynomial: x^24 + x^23 + x^18 + x^17 + x^14 + x^11 + x^10 + x^7
//! + x^6 + x^5 + x^4 + x^3 + x + 1 (0x1864CFB). Initial value 0, no final XOR,
//! MSB first. The CRC covers preamble, reserved bits, length and body; it
//! occupies the last 3 bytes of a frame.

use crate::types::hex_decode;

const GENERATOR: u32 = 0x864CFB;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x800000 != 0 {
                crc = (crc << 1) ^ GENERATOR;
            } else {
                crc <<= 1;
            }
            crc &= 0xFFFFFF;
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_crc_table();

/// CRC-24Q of all bytes.
pub fn crc24q(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        crc = ((crc << 8) ^ CRC_TABLE[((crc >> 16) ^ byte as u32) as usize & 0xFF]) & 0xFFFFFF;
    }
    crc
}

/// Check a complete frame whose last 3 bytes hold the CRC.
///
/// Frames shorter than 4 bytes have nothing to protect and are invalid.
pub fn verify(message: &[u8]) -> bool {
    if message.len() < 4 {
        return false;
    }
    let payload_len = message.len() - 3;
    let expected = (message[payload_len] as u32) << 16
        | (message[payload_len + 1] as u32) << 8
        | message[payload_len + 2] as u32;
    crc24q(&message[..payload_len]) == expected
}

/// Validate a frame given as a hex string.
pub fn check_crc(message_hex: &str) -> bool {
    match hex_decode(message_hex.trim()) {
        Some(data) => verify(&data),
        None => false,
    }
}

/// CRC as the 3 trailing frame bytes.
pub fn crc_bytes(data: &[u8]) -> [u8; 3] {
    let crc = crc24q(data);
    [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
