//! Reference station messages: MT1005/1006 (antenna reference point),
//! MT1008 (antenna descriptor) and MT1029 (Unicode text).

use serde::Serialize;
use tracing::warn;

use crate::bits::{reserved, BitWriter};
use crate::fields::*;
use crate::frame::{build_message, RtcmMessage};
use crate::types::{GPS_UTC_LEAP_SECONDS, SECONDS_PER_DAY, SECONDS_PER_WEEK};

/// Antenna reference point of a reference station (MT1005/1006).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationPosition {
    pub station_id: u16,
    /// DF021 ITRF realization year.
    pub itrf_year: u8,
    pub gps: bool,
    pub glonass: bool,
    pub galileo: bool,
    /// DF141: the position belongs to a non-physical (virtual) station.
    pub non_physical: bool,
    /// DF142: all raw data comes from a single receiver oscillator.
    pub single_oscillator: bool,
    /// DF364 quarter-cycle indicator.
    pub quarter_cycle_indicator: u8,
    pub ecef_x: f64,
    pub ecef_y: f64,
    pub ecef_z: f64,
    /// Antenna height above the marker (MT1006 only).
    pub antenna_height: Option<f64>,
}

impl StationPosition {
    pub fn new(station_id: u16, ecef_x: f64, ecef_y: f64, ecef_z: f64) -> Self {
        StationPosition {
            station_id,
            ecef_x,
            ecef_y,
            ecef_z,
            ..Default::default()
        }
    }
}

/// DF029/DF032 character counts are 8 bits; the standard limits both strings to 31.
pub const MAX_DESCRIPTOR_LEN: usize = 31;
/// DF138 counts characters in 7 bits.
pub const MAX_TEXT_CHARS: usize = 127;
/// DF139 counts UTF-8 code units in 8 bits.
pub const MAX_TEXT_BYTES: usize = 255;

/// Modified Julian Date of the GPS epoch (1980-01-06).
const GPS_EPOCH_MJD: u64 = 44_244;

fn push_arp(w: &mut BitWriter, msg_type: u16, pos: &StationPosition) {
    w.push(DF002.encode_uint(msg_type as u64))
        .push(DF003.encode_uint(pos.station_id as u64))
        .push(DF021.encode_uint(pos.itrf_year as u64))
        .push(DF022.encode_bool(pos.gps))
        .push(DF023.encode_bool(pos.glonass))
        .push(DF024.encode_bool(pos.galileo))
        .push(DF141.encode_bool(pos.non_physical))
        .push(DF025.encode(pos.ecef_x))
        .push(DF142.encode_bool(pos.single_oscillator))
        .push(reserved(1))
        .push(DF026.encode(pos.ecef_y))
        .push(DF364.encode_uint(pos.quarter_cycle_indicator as u64))
        .push(DF027.encode(pos.ecef_z));
}

/// MT1005: stationary antenna reference point, no height.
pub fn mt1005(pos: &StationPosition) -> RtcmMessage {
    let mut w = BitWriter::new();
    push_arp(&mut w, 1005, pos);
    build_message(&w)
}

/// MT1006: MT1005 plus antenna height (zero when unknown).
pub fn mt1006(pos: &StationPosition) -> RtcmMessage {
    let mut w = BitWriter::new();
    push_arp(&mut w, 1006, pos);
    w.push(DF028.encode(pos.antenna_height.unwrap_or(0.0)));
    build_message(&w)
}

fn clip_ascii<'a>(field: &str, text: &'a str) -> &'a str {
    let mut end = text.len().min(MAX_DESCRIPTOR_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end < text.len() {
        warn!(field, len = text.len(), "descriptor truncated to {MAX_DESCRIPTOR_LEN} bytes");
    }
    &text[..end]
}

/// MT1008: antenna descriptor, setup id and serial number.
pub fn mt1008(station_id: u16, descriptor: &str, setup_id: u8, serial: &str) -> RtcmMessage {
    let descriptor = clip_ascii("descriptor", descriptor);
    let serial = clip_ascii("serial", serial);

    let mut w = BitWriter::new();
    w.push(DF002.encode_uint(1008))
        .push(DF003.encode_uint(station_id as u64))
        .push(DF029.encode_uint(descriptor.len() as u64));
    for b in descriptor.bytes() {
        w.push(DF030.encode_uint(b as u64));
    }
    w.push(DF031.encode_uint(setup_id as u64))
        .push(DF032.encode_uint(serial.len() as u64));
    for b in serial.bytes() {
        w.push(DF033.encode_uint(b as u64));
    }
    build_message(&w)
}

/// UTC Modified Julian Date and second of day for a GPS week and time of week.
pub fn utc_mjd(gps_week: u32, gps_tow: f64) -> (u64, u64) {
    let gps_seconds = gps_week as f64 * SECONDS_PER_WEEK + gps_tow - GPS_UTC_LEAP_SECONDS;
    let gps_seconds = gps_seconds.max(0.0);
    let days = (gps_seconds / SECONDS_PER_DAY).floor();
    let second_of_day = (gps_seconds - days * SECONDS_PER_DAY).floor();
    (GPS_EPOCH_MJD + days as u64, second_of_day as u64)
}

/// MT1029: UTF-8 text stamped with the UTC time of transmission.
pub fn mt1029(station_id: u16, gps_week: u32, gps_tow: f64, text: &str) -> RtcmMessage {
    let mut end = 0;
    for (chars, (i, c)) in text.char_indices().enumerate() {
        if chars == MAX_TEXT_CHARS || i + c.len_utf8() > MAX_TEXT_BYTES {
            break;
        }
        end = i + c.len_utf8();
    }
    if end < text.len() {
        warn!(len = text.len(), "MT1029 text truncated to {end} bytes");
    }
    let text = &text[..end];
    let (mjd, second_of_day) = utc_mjd(gps_week, gps_tow);

    let mut w = BitWriter::new();
    w.push(DF002.encode_uint(1029))
        .push(DF003.encode_uint(station_id as u64))
        .push(DF051.encode_uint(mjd))
        .push(DF052.encode_uint(second_of_day))
        .push(DF138.encode_uint(text.chars().count() as u64))
        .push(DF139.encode_uint(text.len() as u64));
    for b in text.bytes() {
        w.push(DF140.encode_uint(b as u64));
    }
    build_message(&w)
}
