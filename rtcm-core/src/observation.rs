//! Legacy observation messages: GPS MT1001-1004 and GLONASS MT1009-1012.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::bits::{BitWriter, Field};
use crate::ephemeris::TimeReference;
use crate::fields::*;
use crate::frame::{build_message, RtcmMessage};
use crate::lock_time::{lock_time_indicator, LockTimeTable};
use crate::types::{glonass_time_of_day, observables_for, Observable, ObservationSnapshot, Signal};

/// Satellite count fields (DF006/DF035) are 5 bits wide.
pub const MAX_SATELLITES: usize = 31;

/// Header options shared by the legacy observation messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationOptions {
    pub station_id: u16,
    /// DF005: more observation messages follow for the same epoch.
    pub synchronous: bool,
    pub divergence_free: bool,
    /// Smoothing interval in seconds; negative means unlimited.
    pub smoothing_interval_s: i32,
}

/// Split a pseudorange into (modulus ambiguity, modular part in 0.02 m, the
/// pseudorange as the receiver will reconstruct it).
fn split_pseudorange(pseudorange: f64, modulus: f64) -> (u64, u64, f64) {
    let ambiguity = (pseudorange / modulus).floor().max(0.0);
    let raw = ((pseudorange - ambiguity * modulus) / 0.02).round().max(0.0);
    (ambiguity as u64, raw as u64, raw * 0.02 + ambiguity * modulus)
}

/// Phaserange minus reconstructed L1 pseudorange (m), wrapped to +/-1500 cycles.
fn phase_minus_pseudorange(obs: &Observable, reconstructed_pr: f64) -> f64 {
    let lambda = obs.wavelength_m();
    let cycles = obs.carrier_cycles() - reconstructed_pr / lambda;
    ((cycles + 1500.0).rem_euclid(3000.0) - 1500.0) * lambda
}

fn phase_field(def: &FieldDef, obs: &Observable, reconstructed_pr: f64) -> Field {
    if obs.valid_phase {
        def.encode_or(phase_minus_pseudorange(obs, reconstructed_pr), PHASERANGE_INVALID)
    } else {
        def.encode_int(PHASERANGE_INVALID)
    }
}

fn l2_minus_l1_field(def: &FieldDef, l2: &Observable, reconstructed_pr: f64) -> Field {
    if l2.valid_pseudorange {
        def.encode_or(l2.pseudorange_m - reconstructed_pr, PSEUDORANGE_DIFF_INVALID)
    } else {
        def.encode_int(PSEUDORANGE_DIFF_INVALID)
    }
}

fn lock_indicator(table: &mut LockTimeTable, epoch_s: f64, obs: &Observable) -> u64 {
    let seconds = table.update(obs.signal, obs.prn, epoch_s, obs.locked);
    lock_time_indicator(seconds as u32) as u64
}

/// Satellites carrying both `l1` and `l2` observables, in PRN order.
pub fn pair_by_prn<'a>(
    snapshot: &'a ObservationSnapshot,
    l1: Signal,
    l2: Signal,
) -> Vec<(&'a Observable, &'a Observable)> {
    let mut first: BTreeMap<u32, &Observable> = BTreeMap::new();
    for obs in observables_for(snapshot, l1) {
        first.entry(obs.prn).or_insert(obs);
    }
    let mut second: BTreeMap<u32, &Observable> = BTreeMap::new();
    for obs in observables_for(snapshot, l2) {
        second.entry(obs.prn).or_insert(obs);
    }
    first
        .into_iter()
        .filter_map(|(prn, a)| second.get(&prn).map(|b| (a, *b)))
        .collect()
}

fn select_satellites<'a>(
    snapshot: &'a ObservationSnapshot,
    l1: Signal,
    l2: Signal,
    dual: bool,
) -> Vec<(&'a Observable, Option<&'a Observable>)> {
    let mut sats: Vec<_> = if dual {
        pair_by_prn(snapshot, l1, l2)
            .into_iter()
            .map(|(a, b)| (a, Some(b)))
            .collect()
    } else {
        observables_for(snapshot, l1)
            .into_iter()
            .map(|a| (a, None))
            .collect()
    };
    if sats.len() > MAX_SATELLITES {
        warn!(
            count = sats.len(),
            "observation message limited to {MAX_SATELLITES} satellites"
        );
        sats.truncate(MAX_SATELLITES);
    }
    sats
}

// ---------------------------------------------------------------------------
// GPS MT1001-1004
// ---------------------------------------------------------------------------

fn gps_header(w: &mut BitWriter, msg_type: u16, obs_time: f64, nsat: usize, opts: &ObservationOptions) {
    w.push(DF002.encode_uint(msg_type as u64))
        .push(DF003.encode_uint(opts.station_id as u64))
        .push(DF004.encode_uint(epoch_time_ms(obs_time, WEEK_MS)))
        .push(DF005.encode_bool(opts.synchronous))
        .push(DF006.encode_uint(nsat as u64))
        .push(DF007.encode_bool(opts.divergence_free))
        .push(DF008.encode_uint(smoothing_interval_code(opts.smoothing_interval_s)));
}

/// Assemble MT1001 (L1), MT1002 (L1 extended), MT1003 (L1/L2) or MT1004
/// (L1/L2 extended).
///
/// # Panics
/// If `msg_type` is not one of 1001..=1004.
pub fn gps_observations(
    msg_type: u16,
    table: &mut LockTimeTable,
    time: &impl TimeReference,
    obs_time: f64,
    snapshot: &ObservationSnapshot,
    opts: &ObservationOptions,
) -> RtcmMessage {
    assert!((1001..=1004).contains(&msg_type), "not a GPS observation message: {msg_type}");
    let extended = msg_type % 2 == 0;
    let dual = msg_type >= 1003;
    let epoch = time.epoch_seconds(obs_time);
    let sats = select_satellites(snapshot, Signal::GpsL1Ca, Signal::GpsL2Cm, dual);

    let mut w = BitWriter::new();
    gps_header(&mut w, msg_type, obs_time, sats.len(), opts);

    for (l1, l2) in &sats {
        let (ambiguity, raw, pr) = split_pseudorange(l1.pseudorange_m, GPS_PSEUDORANGE_MODULUS);
        w.push(DF009.encode_uint(l1.prn as u64))
            .push(DF010.encode_uint(0))
            .push(DF011.encode_uint(raw))
            .push(phase_field(&DF012, l1, pr))
            .push(DF013.encode_uint(lock_indicator(table, epoch, l1)));
        if extended {
            w.push(DF014.encode_uint(ambiguity)).push(DF015.encode(l1.cn0_db_hz));
        }
        if let Some(l2) = l2 {
            w.push(DF016.encode_uint(0))
                .push(l2_minus_l1_field(&DF017, l2, pr))
                .push(phase_field(&DF018, l2, pr))
                .push(DF019.encode_uint(lock_indicator(table, epoch, l2)));
            if extended {
                w.push(DF020.encode(l2.cn0_db_hz));
            }
        }
    }

    debug!(msg_type, satellites = sats.len(), bits = w.len(), "assembled GPS observations");
    build_message(&w)
}

// ---------------------------------------------------------------------------
// GLONASS MT1009-1012
// ---------------------------------------------------------------------------

fn glonass_header(w: &mut BitWriter, msg_type: u16, obs_time: f64, nsat: usize, opts: &ObservationOptions) {
    w.push(DF002.encode_uint(msg_type as u64))
        .push(DF003.encode_uint(opts.station_id as u64))
        .push(DF034.encode_uint(epoch_time_ms(glonass_time_of_day(obs_time), DAY_MS)))
        .push(DF005.encode_bool(opts.synchronous))
        .push(DF035.encode_uint(nsat as u64))
        .push(DF036.encode_bool(opts.divergence_free))
        .push(DF037.encode_uint(smoothing_interval_code(opts.smoothing_interval_s)));
}

/// Assemble MT1009 (L1), MT1010 (L1 extended), MT1011 (L1/L2) or MT1012
/// (L1/L2 extended). `obs_time` is GPS time of week.
///
/// # Panics
/// If `msg_type` is not one of 1009..=1012.
pub fn glonass_observations(
    msg_type: u16,
    table: &mut LockTimeTable,
    time: &impl TimeReference,
    obs_time: f64,
    snapshot: &ObservationSnapshot,
    opts: &ObservationOptions,
) -> RtcmMessage {
    assert!((1009..=1012).contains(&msg_type), "not a GLONASS observation message: {msg_type}");
    let extended = msg_type % 2 == 0;
    let dual = msg_type >= 1011;
    let epoch = time.epoch_seconds(obs_time);
    let sats = select_satellites(snapshot, Signal::GloL1Ca, Signal::GloL2Ca, dual);

    let mut w = BitWriter::new();
    glonass_header(&mut w, msg_type, obs_time, sats.len(), opts);

    for (l1, l2) in &sats {
        let (ambiguity, raw, pr) = split_pseudorange(l1.pseudorange_m, GLONASS_PSEUDORANGE_MODULUS);
        w.push(DF038.encode_uint(l1.prn as u64))
            .push(DF039.encode_uint(0))
            .push(DF040.encode_uint(glonass_fcn_code(l1.glonass_fcn)))
            .push(DF041.encode_uint(raw))
            .push(phase_field(&DF042, l1, pr))
            .push(DF043.encode_uint(lock_indicator(table, epoch, l1)));
        if extended {
            w.push(DF044.encode_uint(ambiguity)).push(DF045.encode(l1.cn0_db_hz));
        }
        if let Some(l2) = l2 {
            w.push(DF046.encode_uint(0))
                .push(l2_minus_l1_field(&DF047, l2, pr))
                .push(phase_field(&DF048, l2, pr))
                .push(DF049.encode_uint(lock_indicator(table, epoch, l2)));
            if extended {
                w.push(DF050.encode(l2.cn0_db_hz));
            }
        }
    }

    debug!(msg_type, satellites = sats.len(), bits = w.len(), "assembled GLONASS observations");
    build_message(&w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;
    use crate::ephemeris::{GlonassEphemeris, GpsEphemeris};

    fn gps_obs(prn: u32, signal: Signal, pr: f64) -> Observable {
        let mut o = Observable::new(signal, prn);
        o.pseudorange_m = pr;
        o.carrier_phase_rads = 2.0 * std::f64::consts::PI * pr / o.wavelength_m() + 1.25;
        o.cn0_db_hz = 45.25;
        o
    }

    fn snapshot(obs: Vec<Observable>) -> ObservationSnapshot {
        obs.into_iter().enumerate().map(|(i, o)| (i as i32, o)).collect()
    }

    fn opts() -> ObservationOptions {
        ObservationOptions {
            station_id: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_pseudorange() {
        let (amb, raw, pr) = split_pseudorange(21_000_123.456, GPS_PSEUDORANGE_MODULUS);
        assert_eq!(amb, 70);
        assert!((pr - 21_000_123.456).abs() <= 0.01);
        assert_eq!(raw, ((21_000_123.456 - 70.0 * GPS_PSEUDORANGE_MODULUS) / 0.02_f64).round() as u64);
    }

    #[test]
    fn test_mt1001_layout() {
        let snap = snapshot(vec![
            gps_obs(7, Signal::GpsL1Ca, 21_000_000.0),
            gps_obs(12, Signal::GpsL1Ca, 23_500_000.0),
            gps_obs(12, Signal::GalE1, 23_500_000.0),
        ]);
        let mut table = LockTimeTable::new();
        let eph = GpsEphemeris::default();
        let msg = gps_observations(1001, &mut table, &eph, 345_600.5, &snap, &opts());
        let body = msg.body();
        assert_eq!(body.len(), (64 + 2 * 58 + 7) / 8);

        let mut r = BitReader::new(body);
        assert_eq!(DF002.decode_uint(&mut r), Some(1001));
        assert_eq!(DF003.decode_uint(&mut r), Some(42));
        assert_eq!(DF004.decode_uint(&mut r), Some(345_600_500));
        r.skip(1).unwrap();
        assert_eq!(DF006.decode_uint(&mut r), Some(2));
        r.skip(4).unwrap();
        assert_eq!(DF009.decode_uint(&mut r), Some(7));
        r.skip(1).unwrap();
        let pr = DF011.decode(&mut r).unwrap() + 70.0 * GPS_PSEUDORANGE_MODULUS;
        assert!((pr - 21_000_000.0).abs() <= 0.01);
        let diff = DF012.decode(&mut r).unwrap();
        let expected = 1.25 / (2.0 * std::f64::consts::PI) * Signal::GpsL1Ca.wavelength_m(0);
        assert!((diff - expected).abs() < 0.02, "phase diff {diff} vs {expected}");
        assert_eq!(DF013.decode_uint(&mut r), Some(0));
    }

    #[test]
    fn test_mt1004_pairs_by_prn() {
        let snap = snapshot(vec![
            gps_obs(20, Signal::GpsL1Ca, 22_000_000.0),
            gps_obs(3, Signal::GpsL1Ca, 21_000_000.0),
            gps_obs(3, Signal::GpsL2Cm, 21_000_001.0),
            gps_obs(20, Signal::GpsL2Cm, 22_000_002.0),
            gps_obs(9, Signal::GpsL1Ca, 24_000_000.0),
        ]);
        let pairs = pair_by_prn(&snap, Signal::GpsL1Ca, Signal::GpsL2Cm);
        let prns: Vec<u32> = pairs.iter().map(|(a, _)| a.prn).collect();
        assert_eq!(prns, vec![3, 20]);

        let mut table = LockTimeTable::new();
        let msg = gps_observations(1004, &mut table, &GpsEphemeris::default(), 0.0, &snap, &opts());
        assert_eq!(msg.body().len(), (64 + 2 * 125 + 7) / 8);
        let mut r = BitReader::at(msg.body(), 64);
        assert_eq!(DF009.decode_uint(&mut r), Some(3));
        r.skip(1 + 24 + 20 + 7 + 8).unwrap();
        assert_eq!(DF015.decode(&mut r), Some(45.25));
        r.skip(2).unwrap();
        let diff = DF017.decode(&mut r).unwrap();
        assert!((diff - 1.0).abs() <= 0.02);
    }

    #[test]
    fn test_invalid_phase_uses_sentinel() {
        let mut o = gps_obs(5, Signal::GpsL1Ca, 20_000_000.0);
        o.valid_phase = false;
        let snap = snapshot(vec![o]);
        let mut table = LockTimeTable::new();
        let msg = gps_observations(1001, &mut table, &GpsEphemeris::default(), 0.0, &snap, &opts());
        let mut r = BitReader::at(msg.body(), 64 + 6 + 1 + 24);
        assert_eq!(DF012.decode_raw(&mut r), Some(PHASERANGE_INVALID));
    }

    #[test]
    fn test_lock_time_accumulates_between_messages() {
        let snap = snapshot(vec![gps_obs(5, Signal::GpsL1Ca, 20_000_000.0)]);
        let mut table = LockTimeTable::new();
        let eph = GpsEphemeris::default();
        gps_observations(1001, &mut table, &eph, 100.0, &snap, &opts());
        let msg = gps_observations(1001, &mut table, &eph, 150.0, &snap, &opts());
        let mut r = BitReader::at(msg.body(), 64 + 6 + 1 + 24 + 20);
        assert_eq!(DF013.decode_uint(&mut r), Some(37));
    }

    #[test]
    fn test_empty_constellation_gives_header_only() {
        let snap = snapshot(vec![gps_obs(5, Signal::GalE1, 20_000_000.0)]);
        let mut table = LockTimeTable::new();
        let msg = gps_observations(1002, &mut table, &GpsEphemeris::default(), 0.0, &snap, &opts());
        assert_eq!(msg.body().len(), 8);
        let msg = glonass_observations(1010, &mut table, &GlonassEphemeris::default(), 0.0, &snap, &opts());
        assert_eq!(msg.body().len(), 8);
    }

    #[test]
    fn test_mt1012_glonass_layout() {
        let mut a = gps_obs(4, Signal::GloL1Ca, 0.0);
        a.glonass_fcn = -3;
        a.pseudorange_m = 20_100_000.0;
        a.carrier_phase_rads = 2.0 * std::f64::consts::PI * a.pseudorange_m / a.wavelength_m();
        let mut b = a.clone();
        b.signal = Signal::GloL2Ca;
        b.carrier_phase_rads = 2.0 * std::f64::consts::PI * b.pseudorange_m / b.wavelength_m();
        let snap = snapshot(vec![a, b]);
        let mut table = LockTimeTable::new();
        let msg = glonass_observations(1012, &mut table, &GlonassEphemeris::default(), 0.0, &snap, &opts());
        assert_eq!(msg.body().len(), (61 + 130 + 7) / 8);

        let mut r = BitReader::new(msg.body());
        assert_eq!(DF002.decode_uint(&mut r), Some(1012));
        r.skip(12).unwrap();
        assert_eq!(DF034.decode_uint(&mut r), Some(10_782_000));
        r.skip(1).unwrap();
        assert_eq!(DF035.decode_uint(&mut r), Some(1));
        r.skip(4).unwrap();
        assert_eq!(DF038.decode_uint(&mut r), Some(4));
        r.skip(1).unwrap();
        assert_eq!(DF040.decode_uint(&mut r), Some(4));
        let pr = DF041.decode(&mut r).unwrap() + 33.0 * GLONASS_PSEUDORANGE_MODULUS;
        assert!((pr - 20_100_000.0).abs() <= 0.01);
    }
}
