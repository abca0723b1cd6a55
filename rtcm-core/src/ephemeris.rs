//! Broadcast navigation records consumed by the assembler and produced by the reader.
//!
//! Units are SI: seconds, metres, radians. GLONASS records use kilometres as
//! broadcast (km, km/s, km/s^2).

use serde::Serialize;

use crate::types::{glonass_time_of_day, SECONDS_PER_DAY, SECONDS_PER_WEEK};

/// GPS LNAV ephemeris (MT1019).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsEphemeris {
    pub prn: u32,
    /// Full GPS week number (the message carries it modulo 1024).
    pub week: u32,
    /// URA index.
    pub sv_accuracy: u32,
    pub code_on_l2: u32,
    pub idot: f64,
    pub iode: u32,
    pub toc: f64,
    pub af2: f64,
    pub af1: f64,
    pub af0: f64,
    pub iodc: u32,
    pub crs: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub cuc: f64,
    pub ecc: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub tgd: f64,
    pub sv_health: u32,
    pub l2_p_data_flag: bool,
    pub fit_interval_flag: bool,
}

/// Galileo F/NAV ephemeris (MT1045).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GalileoEphemeris {
    pub prn: u32,
    /// Galileo System Time week number.
    pub week: u32,
    pub iod_nav: u32,
    pub sisa: u32,
    pub idot: f64,
    pub toc: f64,
    pub af2: f64,
    pub af1: f64,
    pub af0: f64,
    pub crs: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub cuc: f64,
    pub ecc: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omega_dot: f64,
    /// E1-E5a broadcast group delay (s).
    pub bgd_e1e5a: f64,
    pub e5a_hs: u32,
    pub e5a_dvs: bool,
}

/// GLONASS immediate navigation data (MT1020).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlonassEphemeris {
    /// Slot number (1..=24).
    pub slot: u32,
    /// Frequency channel number (-7..=6).
    pub fcn: i32,
    pub almanac_health: bool,
    pub almanac_health_available: bool,
    pub p1: u32,
    /// Start of the frame within the day (s), 30 s resolution.
    pub tk: f64,
    pub bn_msb: bool,
    pub p2: bool,
    /// Reference time of the ephemeris within the day (s), 15 min resolution.
    pub tb: f64,
    pub xn_dot: f64,
    pub xn: f64,
    pub xn_ddot: f64,
    pub yn_dot: f64,
    pub yn: f64,
    pub yn_ddot: f64,
    pub zn_dot: f64,
    pub zn: f64,
    pub zn_ddot: f64,
    pub p3: bool,
    pub gamma_n: f64,
    pub p: u32,
    pub ln_third: bool,
    pub tau_n: f64,
    pub delta_tau_n: f64,
    pub en: u32,
    pub p4: bool,
    pub ft: u32,
    /// Day number within the four-year interval.
    pub nt: u32,
    pub m: u32,
    pub additional_data: bool,
    pub ln_fifth: bool,
}

/// GLONASS time parameters carried in the tail of MT1020.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlonassUtcModel {
    pub na: u32,
    pub tau_c: f64,
    pub n4: u32,
    pub tau_gps: f64,
}

/// Maps an observation time-of-week onto an absolute, monotonic epoch in
/// seconds for lock-time accounting.
pub trait TimeReference {
    fn epoch_seconds(&self, obs_time: f64) -> f64;
}

impl TimeReference for GpsEphemeris {
    fn epoch_seconds(&self, obs_time: f64) -> f64 {
        self.week as f64 * SECONDS_PER_WEEK + obs_time
    }
}

impl TimeReference for GalileoEphemeris {
    fn epoch_seconds(&self, obs_time: f64) -> f64 {
        self.week as f64 * SECONDS_PER_WEEK + obs_time
    }
}

impl TimeReference for GlonassEphemeris {
    fn epoch_seconds(&self, obs_time: f64) -> f64 {
        self.nt as f64 * SECONDS_PER_DAY + glonass_time_of_day(obs_time)
    }
}
