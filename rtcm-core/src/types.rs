//! Shared types, error enum, observables, and physical constants for rtcm-core.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by rtcm-core.
#[derive(Debug, Error)]
pub enum RtcmError {
    #[error("invalid {kind} string: {input:?}")]
    InvalidSymbols { kind: &'static str, input: String },
    #[error("invalid message length: header says {declared} body bytes, frame carries {actual}")]
    InvalidLength { declared: usize, actual: usize },
    #[error("missing RTCM preamble (0xD3), found 0x{0:02X}")]
    NoPreamble(u8),
    #[error("CRC validation failed")]
    CrcFailed,
    #[error("unexpected message type: expected {expected}, got {actual}")]
    UnexpectedType { expected: u16, actual: u16 },
    #[error("message body truncated at bit {0}")]
    Truncated(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RtcmError>;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Distance light travels in one millisecond (m).
pub const RANGE_MS: f64 = SPEED_OF_LIGHT * 0.001;

/// Pi as defined by the GPS and Galileo interface documents for semicircle conversion.
pub const GPS_PI: f64 = 3.1415926535898;

pub const GPS_L1_FREQ_HZ: f64 = 1_575.42e6;
pub const GPS_L2_FREQ_HZ: f64 = 1_227.60e6;
pub const GPS_L5_FREQ_HZ: f64 = 1_176.45e6;
pub const GAL_E1_FREQ_HZ: f64 = 1_575.42e6;
pub const GAL_E5A_FREQ_HZ: f64 = 1_176.45e6;
pub const GAL_E5B_FREQ_HZ: f64 = 1_207.14e6;
pub const GLO_L1_FREQ_HZ: f64 = 1_602.0e6;
pub const GLO_L1_STEP_HZ: f64 = 0.5625e6;
pub const GLO_L2_FREQ_HZ: f64 = 1_246.0e6;
pub const GLO_L2_STEP_HZ: f64 = 0.4375e6;

pub const SECONDS_PER_WEEK: f64 = 604_800.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// GPS-UTC leap seconds applied when deriving GLONASS (UTC(SU) + 3h) time.
pub const GPS_UTC_LEAP_SECONDS: f64 = 18.0;

/// GLONASS time of week (s) for a GPS time of week: UTC(SU) + 3 h.
pub fn glonass_time_of_week(gps_tow: f64) -> f64 {
    (gps_tow + 10_800.0 - GPS_UTC_LEAP_SECONDS).rem_euclid(SECONDS_PER_WEEK)
}

/// GLONASS time of day (s) for a GPS time of week.
pub fn glonass_time_of_day(gps_tow: f64) -> f64 {
    glonass_time_of_week(gps_tow).rem_euclid(SECONDS_PER_DAY)
}

/// GLONASS day of week (0 = Sunday) for a GPS time of week.
pub fn glonass_day_of_week(gps_tow: f64) -> u64 {
    (glonass_time_of_week(gps_tow) / SECONDS_PER_DAY) as u64 % 7
}

// ---------------------------------------------------------------------------
// Constellations and signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
}

impl Constellation {
    /// Message number of MSM0 for this constellation (MSMn = base + n).
    pub fn msm_base(self) -> u16 {
        match self {
            Constellation::Gps => 1070,
            Constellation::Glonass => 1080,
            Constellation::Galileo => 1090,
        }
    }

    /// IGS SSR message number base (IGM0n = base + n).
    pub fn igs_base(self) -> u8 {
        match self {
            Constellation::Gps => 20,
            Constellation::Glonass => 40,
            Constellation::Galileo => 60,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Constellation::Gps => "GPS",
            Constellation::Glonass => "GLONASS",
            Constellation::Galileo => "Galileo",
        }
    }
}

/// Tracked signal of an observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Signal {
    /// GPS L1 C/A ("1C").
    GpsL1Ca,
    /// GPS L2C M ("2S").
    GpsL2Cm,
    /// GPS L5 ("L5").
    GpsL5,
    /// Galileo E1 B/C ("1B").
    GalE1,
    /// Galileo E5a ("5X").
    GalE5a,
    /// Galileo E5b ("7X").
    GalE5b,
    /// GLONASS L1 C/A ("1G").
    GloL1Ca,
    /// GLONASS L2 C/A ("2G").
    GloL2Ca,
}

impl Signal {
    pub const COUNT: usize = 8;

    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::GpsL1Ca,
        Signal::GpsL2Cm,
        Signal::GpsL5,
        Signal::GalE1,
        Signal::GalE5a,
        Signal::GalE5b,
        Signal::GloL1Ca,
        Signal::GloL2Ca,
    ];

    pub fn constellation(self) -> Constellation {
        match self {
            Signal::GpsL1Ca | Signal::GpsL2Cm | Signal::GpsL5 => Constellation::Gps,
            Signal::GalE1 | Signal::GalE5a | Signal::GalE5b => Constellation::Galileo,
            Signal::GloL1Ca | Signal::GloL2Ca => Constellation::Glonass,
        }
    }

    /// Two-character receiver signal code.
    pub fn code(self) -> &'static str {
        match self {
            Signal::GpsL1Ca => "1C",
            Signal::GpsL2Cm => "2S",
            Signal::GpsL5 => "L5",
            Signal::GalE1 => "1B",
            Signal::GalE5a => "5X",
            Signal::GalE5b => "7X",
            Signal::GloL1Ca => "1G",
            Signal::GloL2Ca => "2G",
        }
    }

    pub fn from_code(constellation: Constellation, code: &str) -> Option<Signal> {
        Signal::ALL
            .into_iter()
            .find(|s| s.constellation() == constellation && s.code() == code)
    }

    /// MSM signal ID (1..=32) per the RTCM signal ID mapping tables.
    pub fn msm_signal_id(self) -> u32 {
        match self {
            Signal::GpsL1Ca => 2,
            Signal::GpsL2Cm => 15,
            Signal::GpsL5 => 24,
            Signal::GalE1 => 2,
            Signal::GalE5a => 24,
            Signal::GalE5b => 16,
            Signal::GloL1Ca => 2,
            Signal::GloL2Ca => 8,
        }
    }

    /// IGS SSR signal and tracking mode identifier (IDF024).
    pub fn igs_signal_id(self) -> u8 {
        match self {
            Signal::GpsL1Ca => 0,
            Signal::GpsL2Cm => 7,
            Signal::GpsL5 => 14,
            Signal::GalE1 => 1,
            Signal::GalE5a => 5,
            Signal::GalE5b => 8,
            Signal::GloL1Ca => 0,
            Signal::GloL2Ca => 2,
        }
    }

    /// Carrier frequency; `fcn` only matters for GLONASS FDMA signals.
    pub fn carrier_frequency_hz(self, fcn: i32) -> f64 {
        match self {
            Signal::GpsL1Ca => GPS_L1_FREQ_HZ,
            Signal::GpsL2Cm => GPS_L2_FREQ_HZ,
            Signal::GpsL5 => GPS_L5_FREQ_HZ,
            Signal::GalE1 => GAL_E1_FREQ_HZ,
            Signal::GalE5a => GAL_E5A_FREQ_HZ,
            Signal::GalE5b => GAL_E5B_FREQ_HZ,
            Signal::GloL1Ca => GLO_L1_FREQ_HZ + fcn as f64 * GLO_L1_STEP_HZ,
            Signal::GloL2Ca => GLO_L2_FREQ_HZ + fcn as f64 * GLO_L2_STEP_HZ,
        }
    }

    pub fn wavelength_m(self, fcn: i32) -> f64 {
        SPEED_OF_LIGHT / self.carrier_frequency_hz(fcn)
    }

    /// Row of this signal in the lock-time table.
    pub fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Observables
// ---------------------------------------------------------------------------

/// One tracked signal of one satellite at the current epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observable {
    pub signal: Signal,
    pub prn: u32,
    /// Pseudorange (m).
    pub pseudorange_m: f64,
    /// Accumulated carrier phase (rad).
    pub carrier_phase_rads: f64,
    pub carrier_doppler_hz: f64,
    pub cn0_db_hz: f64,
    /// GLONASS frequency channel number (-7..=6); zero for CDMA systems.
    pub glonass_fcn: i32,
    pub valid_pseudorange: bool,
    pub valid_phase: bool,
    /// False when the tracking loop reports loss of lock at this epoch.
    pub locked: bool,
}

impl Observable {
    pub fn new(signal: Signal, prn: u32) -> Self {
        Observable {
            signal,
            prn,
            pseudorange_m: 0.0,
            carrier_phase_rads: 0.0,
            carrier_doppler_hz: 0.0,
            cn0_db_hz: 0.0,
            glonass_fcn: 0,
            valid_pseudorange: true,
            valid_phase: true,
            locked: true,
        }
    }

    pub fn constellation(&self) -> Constellation {
        self.signal.constellation()
    }

    pub fn wavelength_m(&self) -> f64 {
        self.signal.wavelength_m(self.glonass_fcn)
    }

    /// Carrier phase in cycles.
    pub fn carrier_cycles(&self) -> f64 {
        self.carrier_phase_rads / (2.0 * PI)
    }

    /// Phase range rate (m/s), positive when the range grows.
    pub fn range_rate_mps(&self) -> f64 {
        -self.carrier_doppler_hz * self.wavelength_m()
    }
}

/// Observables of one epoch keyed by receiver channel id.
pub type ObservationSnapshot = BTreeMap<i32, Observable>;

/// Observables of `signal` in channel order.
pub fn observables_for(snapshot: &ObservationSnapshot, signal: Signal) -> Vec<&Observable> {
    snapshot.values().filter(|o| o.signal == signal).collect()
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Decode a hex string to bytes. Returns `None` on invalid input.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Encode bytes as an uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02X}")).collect()
}
