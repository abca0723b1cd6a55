//! The `Rtcm` codec facade.
//!
//! Owns the per-signal lock-time table so that consecutive epochs report
//! continuous lock correctly. `print_*` methods return the framed message as
//! upper-case hex, the form handed to the fan-out server; `read_*` methods
//! take that same hex form back.

use crate::ephemeris::{GalileoEphemeris, GlonassEphemeris, GlonassUtcModel, GpsEphemeris, TimeReference};
use crate::frame::{parse_hex, RtcmMessage};
use crate::lock_time::LockTimeTable;
use crate::msm::{msm, MsmOptions, MSM_VARIANTS};
use crate::navigation::{mt1019, mt1020, mt1045};
use crate::observation::{glonass_observations, gps_observations, ObservationOptions};
use crate::reader;
use crate::ssr::{igm, IgmKind, SsrCorrections};
use crate::station::{mt1005, mt1006, mt1008, mt1029, StationPosition};
use crate::types::{Constellation, Observable, ObservationSnapshot, Result};

/// Stateful RTCM encoder/decoder.
#[derive(Debug, Clone, Default)]
pub struct Rtcm {
    lock_times: LockTimeTable,
}

impl Rtcm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_times(&self) -> &LockTimeTable {
        &self.lock_times
    }

    /// Seconds `obs` has been continuously tracked as of `obs_time`.
    /// Repeating an epoch reports no additional lock time.
    pub fn lock_time(&mut self, time: &impl TimeReference, obs_time: f64, obs: &Observable) -> u32 {
        let epoch = time.epoch_seconds(obs_time);
        self.lock_times.update(obs.signal, obs.prn, epoch, obs.locked) as u32
    }

    // -----------------------------------------------------------------------
    // Legacy observations
    // -----------------------------------------------------------------------

    fn gps_obs(&mut self, msg_type: u16, eph: &GpsEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        let opts = ObservationOptions {
            station_id,
            ..Default::default()
        };
        gps_observations(msg_type, &mut self.lock_times, eph, obs_time, snapshot, &opts).to_hex()
    }

    fn glonass_obs(
        &mut self,
        msg_type: u16,
        eph: &GlonassEphemeris,
        obs_time: f64,
        snapshot: &ObservationSnapshot,
        station_id: u16,
    ) -> String {
        let opts = ObservationOptions {
            station_id,
            ..Default::default()
        };
        glonass_observations(msg_type, &mut self.lock_times, eph, obs_time, snapshot, &opts).to_hex()
    }

    /// GPS L1-only RTK observables.
    pub fn print_mt1001(&mut self, eph: &GpsEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.gps_obs(1001, eph, obs_time, snapshot, station_id)
    }

    /// GPS extended L1-only RTK observables.
    pub fn print_mt1002(&mut self, eph: &GpsEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.gps_obs(1002, eph, obs_time, snapshot, station_id)
    }

    /// GPS L1&L2 RTK observables.
    pub fn print_mt1003(&mut self, eph: &GpsEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.gps_obs(1003, eph, obs_time, snapshot, station_id)
    }

    /// GPS extended L1&L2 RTK observables.
    pub fn print_mt1004(&mut self, eph: &GpsEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.gps_obs(1004, eph, obs_time, snapshot, station_id)
    }

    pub fn print_mt1009(&mut self, eph: &GlonassEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.glonass_obs(1009, eph, obs_time, snapshot, station_id)
    }

    pub fn print_mt1010(&mut self, eph: &GlonassEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.glonass_obs(1010, eph, obs_time, snapshot, station_id)
    }

    pub fn print_mt1011(&mut self, eph: &GlonassEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.glonass_obs(1011, eph, obs_time, snapshot, station_id)
    }

    pub fn print_mt1012(&mut self, eph: &GlonassEphemeris, obs_time: f64, snapshot: &ObservationSnapshot, station_id: u16) -> String {
        self.glonass_obs(1012, eph, obs_time, snapshot, station_id)
    }

    // -----------------------------------------------------------------------
    // Station and navigation
    // -----------------------------------------------------------------------

    pub fn print_mt1005(&self, pos: &StationPosition) -> String {
        mt1005(pos).to_hex()
    }

    /// The MT1005 worked example of RTCM 10403 (station 2003).
    pub fn print_mt1005_test(&self) -> String {
        let pos = StationPosition {
            gps: true,
            ..StationPosition::new(2003, 1_114_104.5999, -4_850_729.7108, 3_975_521.4643)
        };
        mt1005(&pos).to_hex()
    }

    pub fn print_mt1006(&self, pos: &StationPosition) -> String {
        mt1006(pos).to_hex()
    }

    pub fn print_mt1008(&self, station_id: u16, descriptor: &str, setup_id: u8, serial: &str) -> String {
        mt1008(station_id, descriptor, setup_id, serial).to_hex()
    }

    pub fn print_mt1019(&self, eph: &GpsEphemeris) -> String {
        mt1019(eph).to_hex()
    }

    pub fn print_mt1020(&self, eph: &GlonassEphemeris, utc: &GlonassUtcModel) -> String {
        mt1020(eph, utc).to_hex()
    }

    pub fn print_mt1029(&self, station_id: u16, gps_week: u32, gps_tow: f64, text: &str) -> String {
        mt1029(station_id, gps_week, gps_tow, text).to_hex()
    }

    pub fn print_mt1045(&self, eph: &GalileoEphemeris) -> String {
        mt1045(eph).to_hex()
    }

    // -----------------------------------------------------------------------
    // MSM
    // -----------------------------------------------------------------------

    fn print_msm(
        &mut self,
        number: usize,
        constellation: Constellation,
        time: &impl TimeReference,
        obs_time: f64,
        snapshot: &ObservationSnapshot,
        opts: &MsmOptions,
    ) -> String {
        let variant = &MSM_VARIANTS[number - 1];
        msm(variant, constellation, &mut self.lock_times, time, obs_time, snapshot, opts).to_hex()
    }

    pub fn print_msm_1(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(1, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_2(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(2, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_3(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(3, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_4(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(4, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_5(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(5, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_6(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(6, constellation, time, obs_time, snapshot, opts)
    }

    pub fn print_msm_7(&mut self, constellation: Constellation, time: &impl TimeReference, obs_time: f64, snapshot: &ObservationSnapshot, opts: &MsmOptions) -> String {
        self.print_msm(7, constellation, time, obs_time, snapshot, opts)
    }

    // -----------------------------------------------------------------------
    // SSR
    // -----------------------------------------------------------------------

    /// SSR orbit corrections, one or more messages per constellation.
    pub fn print_igm01(&self, ssr: &SsrCorrections) -> Vec<String> {
        to_hex_all(igm(IgmKind::Orbit, ssr))
    }

    /// SSR clock corrections.
    pub fn print_igm02(&self, ssr: &SsrCorrections) -> Vec<String> {
        to_hex_all(igm(IgmKind::Clock, ssr))
    }

    /// SSR combined orbit and clock corrections.
    pub fn print_igm03(&self, ssr: &SsrCorrections) -> Vec<String> {
        to_hex_all(igm(IgmKind::Combined, ssr))
    }

    /// SSR code biases.
    pub fn print_igm05(&self, ssr: &SsrCorrections) -> Vec<String> {
        to_hex_all(igm(IgmKind::CodeBias, ssr))
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Station position from an MT1005 or MT1006 in hex form.
    pub fn read_mt1005(&self, message_hex: &str) -> Result<StationPosition> {
        let msg = parse_hex(message_hex)?;
        match msg.message_type() {
            Some(1006) => reader::read_mt1006(msg.as_bytes()),
            _ => reader::read_mt1005(msg.as_bytes()),
        }
    }

    pub fn read_mt1019(&self, message_hex: &str) -> Result<GpsEphemeris> {
        reader::read_mt1019(parse_hex(message_hex)?.as_bytes())
    }

    pub fn read_mt1020(&self, message_hex: &str) -> Result<(GlonassEphemeris, GlonassUtcModel)> {
        reader::read_mt1020(parse_hex(message_hex)?.as_bytes())
    }

    pub fn read_mt1045(&self, message_hex: &str) -> Result<GalileoEphemeris> {
        reader::read_mt1045(parse_hex(message_hex)?.as_bytes())
    }

    /// Message number of a hex-form frame.
    pub fn read_message_type(&self, message_hex: &str) -> Result<u16> {
        reader::message_type(parse_hex(message_hex)?.as_bytes())
    }

    pub fn check_crc(&self, message_hex: &str) -> bool {
        crate::crc::check_crc(message_hex)
    }
}

fn to_hex_all(messages: Vec<RtcmMessage>) -> Vec<String> {
    messages.iter().map(RtcmMessage::to_hex).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssr::{ClockCorrection, SatelliteCorrection};
    use crate::types::{RtcmError, Signal};

    fn gps_ephemeris() -> GpsEphemeris {
        GpsEphemeris {
            prn: 5,
            week: 2300,
            iode: 42,
            iodc: 298,
            toc: 7200.0,
            toe: 7200.0,
            af0: -1.25e-4,
            af1: 3.2e-12,
            sqrt_a: 5153.7,
            ..Default::default()
        }
    }

    fn snapshot() -> ObservationSnapshot {
        let mut snap = ObservationSnapshot::new();
        for (ch, prn) in [(0, 3), (1, 12)] {
            let mut o = Observable::new(Signal::GpsL1Ca, prn);
            o.pseudorange_m = 21_000_000.0 + prn as f64 * 1000.0;
            o.cn0_db_hz = 44.0;
            snap.insert(ch, o);
        }
        snap
    }

    #[test]
    fn test_print_mt1005_test_matches_standard_example() {
        assert_eq!(
            Rtcm::new().print_mt1005_test(),
            "D300133ED7D30202980EDEEF34B4BD62AC0941986F33360B98"
        );
    }

    #[test]
    fn test_mt1005_scenario() {
        let rtcm = Rtcm::new();
        let pos = StationPosition {
            gps: true,
            ..StationPosition::new(4, 4_075_580.0, 931_853.0, 4_801_568.0)
        };
        let hex = rtcm.print_mt1005(&pos);
        assert!(rtcm.check_crc(&hex));

        let back = rtcm.read_mt1005(&hex).unwrap();
        assert_eq!(back.station_id, 4);
        assert!(back.gps && !back.glonass && !back.galileo);
        assert!((back.ecef_x - 4_075_580.0).abs() < 1e-4);
        assert!((back.ecef_y - 931_853.0).abs() < 1e-4);
        assert!((back.ecef_z - 4_801_568.0).abs() < 1e-4);
    }

    #[test]
    fn test_read_mt1005_accepts_mt1006() {
        let rtcm = Rtcm::new();
        let pos = StationPosition {
            antenna_height: Some(1.5),
            ..StationPosition::new(8, 10.0, 20.0, 30.0)
        };
        let back = rtcm.read_mt1005(&rtcm.print_mt1006(&pos)).unwrap();
        assert_eq!(back.antenna_height, Some(1.5));
    }

    #[test]
    fn test_mt1019_roundtrip_via_hex() {
        let rtcm = Rtcm::new();
        let eph = gps_ephemeris();
        let back = rtcm.read_mt1019(&rtcm.print_mt1019(&eph)).unwrap();
        assert_eq!(back.iode, 42);
        assert_eq!(back.iodc, 298);
        assert_eq!(back.toc, 7200.0);
        assert!((back.af0 - eph.af0).abs() <= 2f64.powi(-31));
        assert!((back.af1 - eph.af1).abs() <= 2f64.powi(-43));
    }

    #[test]
    fn test_read_rejects_bad_input() {
        let rtcm = Rtcm::new();
        assert!(matches!(rtcm.read_mt1019("not hex"), Err(RtcmError::InvalidSymbols { .. })));

        let station = rtcm.print_mt1005_test();
        assert!(matches!(
            rtcm.read_mt1045(&station),
            Err(RtcmError::UnexpectedType { expected: 1045, actual: 1005 })
        ));

        let mut corrupt = station.into_bytes();
        corrupt[10] = if corrupt[10] == b'0' { b'1' } else { b'0' };
        let corrupt = String::from_utf8(corrupt).unwrap();
        assert!(!rtcm.check_crc(&corrupt));
        assert!(rtcm.read_mt1005(&corrupt).is_err());
    }

    #[test]
    fn test_lock_time_repeated_epoch_is_zero() {
        let mut rtcm = Rtcm::new();
        let eph = gps_ephemeris();
        let obs = Observable::new(Signal::GpsL1Ca, 9);
        rtcm.lock_time(&eph, 1000.0, &obs);
        assert_eq!(rtcm.lock_time(&eph, 1000.0, &obs), 0);
        assert_eq!(rtcm.lock_time(&eph, 1025.0, &obs), 25);
    }

    #[test]
    fn test_observations_accumulate_lock_across_epochs() {
        let mut rtcm = Rtcm::new();
        let eph = gps_ephemeris();
        let first = rtcm.print_mt1001(&eph, 100.0, &snapshot(), 7);
        assert_eq!(rtcm.read_message_type(&first).unwrap(), 1001);
        rtcm.print_mt1003(&eph, 110.0, &snapshot(), 7);
        assert_eq!(rtcm.lock_times().lock_start(Signal::GpsL1Ca, 12), Some(2300.0 * 604_800.0 + 100.0));
    }

    #[test]
    fn test_msm_variants_map_to_message_numbers() {
        let mut rtcm = Rtcm::new();
        let eph = gps_ephemeris();
        let opts = MsmOptions {
            station_id: 7,
            ..Default::default()
        };
        let snap = snapshot();
        let hexes = [
            rtcm.print_msm_1(Constellation::Gps, &eph, 100.0, &snap, &opts),
            rtcm.print_msm_4(Constellation::Gps, &eph, 100.0, &snap, &opts),
            rtcm.print_msm_7(Constellation::Gps, &eph, 100.0, &snap, &opts),
        ];
        let types: Vec<u16> = hexes.iter().map(|h| rtcm.read_message_type(h).unwrap()).collect();
        assert_eq!(types, vec![1071, 1074, 1077]);
    }

    #[test]
    fn test_print_igm_returns_valid_frames() {
        let rtcm = Rtcm::new();
        let mut sat = SatelliteCorrection::new(Constellation::Gps, 14);
        sat.clock = ClockCorrection {
            c0: 0.12,
            ..Default::default()
        };
        let ssr = SsrCorrections {
            epoch_tow: 3600.0,
            validity_s: 5.0,
            satellites: vec![sat],
            ..Default::default()
        };
        let msgs = rtcm.print_igm02(&ssr);
        assert_eq!(msgs.len(), 1);
        assert!(rtcm.check_crc(&msgs[0]));
        assert_eq!(rtcm.read_message_type(&msgs[0]).unwrap(), 4076);
    }
}
