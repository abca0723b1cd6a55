//! IGS SSR correction messages: IGM01 (orbit), IGM02 (clock), IGM03
//! (combined orbit and clock) and IGM05 (code bias).
//!
//! All four share the RTCM message number 4076 and are told apart by the
//! IGS subtype (IDF002). One epoch produces one message per constellation,
//! split further when the satellite count or body size limit is reached.

use serde::Serialize;
use tracing::debug;

use crate::bits::BitWriter;
use crate::fields::*;
use crate::frame::{build_message, RtcmMessage, MAX_BODY_LEN};
use crate::types::{Constellation, Signal};

/// RTCM message number reserved for the IGS SSR messages.
pub const IGS_MESSAGE_NUMBER: u16 = 4076;
/// IDF001 version of the IGS SSR format.
pub const IGS_SSR_VERSION: u8 = 0;
/// IDF010 is 6 bits wide.
pub const MAX_SSR_SATELLITES: usize = 63;

/// IDF004 update interval codes 0..=15, in seconds.
pub const UPDATE_INTERVALS: [u32; 16] = [
    1, 2, 5, 10, 15, 30, 60, 120, 240, 300, 600, 900, 1800, 3600, 7200, 10800,
];

/// IDF004 code of the largest update interval not exceeding `validity_s`.
/// Intervals below one second map to code 0.
pub fn update_interval_code(validity_s: f64) -> u8 {
    UPDATE_INTERVALS
        .iter()
        .rposition(|&bucket| bucket as f64 <= validity_s)
        .unwrap_or(0) as u8
}

// ---------------------------------------------------------------------------
// Correction data
// ---------------------------------------------------------------------------

/// Orbit correction in the radial, along-track, cross-track frame (m, m/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrbitCorrection {
    /// IOD of the broadcast ephemeris the correction applies to.
    pub iod: u32,
    pub radial: f64,
    pub along_track: f64,
    pub cross_track: f64,
    pub dot_radial: f64,
    pub dot_along_track: f64,
    pub dot_cross_track: f64,
}

/// Clock correction polynomial (m, m/s, m/s^2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClockCorrection {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CodeBias {
    pub signal: Signal,
    /// Bias in metres.
    pub bias_m: f64,
}

/// Corrections of one satellite at the SSR epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteCorrection {
    pub constellation: Constellation,
    /// PRN, or slot number for GLONASS.
    pub prn: u32,
    pub orbit: OrbitCorrection,
    pub clock: ClockCorrection,
    pub code_biases: Vec<CodeBias>,
}

impl SatelliteCorrection {
    pub fn new(constellation: Constellation, prn: u32) -> Self {
        SatelliteCorrection {
            constellation,
            prn,
            orbit: OrbitCorrection::default(),
            clock: ClockCorrection::default(),
            code_biases: Vec::new(),
        }
    }
}

/// One SSR epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SsrCorrections {
    /// GPS time of week (s) the corrections refer to.
    pub epoch_tow: f64,
    /// Validity of the corrections (s); quantized into IDF004.
    pub validity_s: f64,
    /// IDF006: corrections refer to a regional rather than global datum.
    pub regional_datum: bool,
    pub iod_ssr: u8,
    pub provider_id: u16,
    pub solution_id: u8,
    pub satellites: Vec<SatelliteCorrection>,
}

impl SsrCorrections {
    fn satellites_of(&self, constellation: Constellation) -> Vec<&SatelliteCorrection> {
        let mut sats: Vec<_> = self
            .satellites
            .iter()
            .filter(|s| s.constellation == constellation)
            .collect();
        sats.sort_by_key(|s| s.prn);
        sats
    }
}

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// The IGS SSR message kinds this codec emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgmKind {
    Orbit,
    Clock,
    Combined,
    CodeBias,
}

impl IgmKind {
    /// IGMnn number; the IDF002 subtype is `constellation.igs_base() + number`.
    pub fn number(self) -> u8 {
        match self {
            IgmKind::Orbit => 1,
            IgmKind::Clock => 2,
            IgmKind::Combined => 3,
            IgmKind::CodeBias => 5,
        }
    }

    pub fn subtype(self, constellation: Constellation) -> u8 {
        constellation.igs_base() + self.number()
    }

    /// Orbit-bearing messages carry the IDF006 datum flag.
    fn has_datum(self) -> bool {
        matches!(self, IgmKind::Orbit | IgmKind::Combined)
    }

    fn has_orbit(self) -> bool {
        self.has_datum()
    }

    fn has_clock(self) -> bool {
        matches!(self, IgmKind::Clock | IgmKind::Combined)
    }

    pub fn header_bits(self) -> usize {
        let datum = if self.has_datum() { 1 } else { 0 };
        12 + 3 + 8 + 20 + 4 + 1 + datum + 4 + 16 + 4 + 6
    }
}

fn push_header(
    w: &mut BitWriter,
    kind: IgmKind,
    constellation: Constellation,
    ssr: &SsrCorrections,
    multiple: bool,
    nsat: usize,
) {
    let tow = epoch_time_ms(ssr.epoch_tow, WEEK_MS) / 1000;
    w.push(DF002.encode_uint(IGS_MESSAGE_NUMBER as u64))
        .push(IDF001.encode_uint(IGS_SSR_VERSION as u64))
        .push(IDF002.encode_uint(kind.subtype(constellation) as u64))
        .push(IDF003.encode_uint(tow))
        .push(IDF004.encode_uint(update_interval_code(ssr.validity_s) as u64))
        .push(IDF005.encode_bool(multiple));
    if kind.has_datum() {
        w.push(IDF006.encode_bool(ssr.regional_datum));
    }
    w.push(IDF007.encode_uint(ssr.iod_ssr as u64))
        .push(IDF008.encode_uint(ssr.provider_id as u64))
        .push(IDF009.encode_uint(ssr.solution_id as u64))
        .push(IDF010.encode_uint(nsat as u64));
}

fn push_orbit(w: &mut BitWriter, orbit: &OrbitCorrection) {
    w.push(IDF012.encode_uint(orbit.iod as u64))
        .push(IDF013.encode(orbit.radial))
        .push(IDF014.encode(orbit.along_track))
        .push(IDF015.encode(orbit.cross_track))
        .push(IDF016.encode(orbit.dot_radial))
        .push(IDF017.encode(orbit.dot_along_track))
        .push(IDF018.encode(orbit.dot_cross_track));
}

fn push_clock(w: &mut BitWriter, clock: &ClockCorrection) {
    w.push(IDF019.encode(clock.c0))
        .push(IDF020.encode(clock.c1))
        .push(IDF021.encode(clock.c2));
}

/// IDF023 counts biases in 5 bits.
const MAX_BIASES: usize = 31;

fn satellite_block(kind: IgmKind, sat: &SatelliteCorrection) -> BitWriter {
    let mut w = BitWriter::new();
    w.push(IDF011.encode_uint(sat.prn as u64));
    if kind.has_orbit() {
        push_orbit(&mut w, &sat.orbit);
    }
    if kind.has_clock() {
        push_clock(&mut w, &sat.clock);
    }
    if kind == IgmKind::CodeBias {
        let biases = &sat.code_biases[..sat.code_biases.len().min(MAX_BIASES)];
        w.push(IDF023.encode_uint(biases.len() as u64));
        for bias in biases {
            w.push(IDF024.encode_uint(bias.signal.igs_signal_id() as u64))
                .push(IDF025.encode(bias.bias_m));
        }
    }
    w
}

/// Group satellite blocks into messages that respect the satellite count
/// and body size limits.
fn split_blocks(kind: IgmKind, blocks: Vec<BitWriter>) -> Vec<Vec<BitWriter>> {
    let capacity = MAX_BODY_LEN * 8 - kind.header_bits();
    let mut groups: Vec<Vec<BitWriter>> = Vec::new();
    let mut bits = 0;
    for block in blocks {
        let full = match groups.last() {
            Some(group) => group.len() == MAX_SSR_SATELLITES || bits + block.len() > capacity,
            None => true,
        };
        if full {
            groups.push(Vec::new());
            bits = 0;
        }
        bits += block.len();
        if let Some(group) = groups.last_mut() {
            group.push(block);
        }
    }
    groups
}

/// Assemble every message of `kind` for one SSR epoch, constellation by
/// constellation. IDF005 is set on all messages but the last.
///
/// An epoch without satellites produces no messages.
pub fn igm(kind: IgmKind, ssr: &SsrCorrections) -> Vec<RtcmMessage> {
    let mut pending: Vec<(Constellation, Vec<BitWriter>)> = Vec::new();
    for constellation in [Constellation::Gps, Constellation::Glonass, Constellation::Galileo] {
        let blocks: Vec<BitWriter> = ssr
            .satellites_of(constellation)
            .into_iter()
            .map(|sat| satellite_block(kind, sat))
            .collect();
        if blocks.is_empty() {
            continue;
        }
        for group in split_blocks(kind, blocks) {
            pending.push((constellation, group));
        }
    }

    let count = pending.len();
    let messages: Vec<RtcmMessage> = pending
        .into_iter()
        .enumerate()
        .map(|(i, (constellation, group))| {
            let mut w = BitWriter::new();
            push_header(&mut w, kind, constellation, ssr, i + 1 < count, group.len());
            for block in &group {
                w.append(block);
            }
            build_message(&w)
        })
        .collect();

    debug!(igm = kind.number(), messages = messages.len(), "assembled SSR corrections");
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;

    fn epoch(sats: Vec<SatelliteCorrection>) -> SsrCorrections {
        SsrCorrections {
            epoch_tow: 345_678.0,
            validity_s: 50.0,
            iod_ssr: 3,
            provider_id: 1234,
            solution_id: 2,
            satellites: sats,
            ..Default::default()
        }
    }

    fn galileo(prn: u32) -> SatelliteCorrection {
        let mut sat = SatelliteCorrection::new(Constellation::Galileo, prn);
        sat.orbit = OrbitCorrection {
            iod: 77,
            radial: 0.1234,
            along_track: -0.5,
            cross_track: 0.25,
            ..Default::default()
        };
        sat.clock.c0 = -1.2345;
        sat
    }

    #[test]
    fn test_update_interval_buckets() {
        assert_eq!(update_interval_code(0.5), 0);
        assert_eq!(update_interval_code(1.0), 0);
        assert_eq!(update_interval_code(4.9), 1);
        assert_eq!(update_interval_code(5.0), 2);
        assert_eq!(update_interval_code(50.0), 5);
        assert_eq!(update_interval_code(300.0), 9);
        assert_eq!(update_interval_code(10_800.0), 15);
        assert_eq!(update_interval_code(86_400.0), 15);
    }

    #[test]
    fn test_orbit_header_and_block() {
        let msgs = igm(IgmKind::Orbit, &epoch(vec![galileo(11), galileo(4)]));
        assert_eq!(msgs.len(), 1);
        let body = msgs[0].body();
        assert_eq!(body.len(), (79 + 2 * 135usize).div_ceil(8));

        let mut r = BitReader::new(body);
        assert_eq!(DF002.decode_uint(&mut r), Some(4076));
        assert_eq!(IDF001.decode_uint(&mut r), Some(0));
        assert_eq!(IDF002.decode_uint(&mut r), Some(61));
        assert_eq!(IDF003.decode_uint(&mut r), Some(345_678));
        assert_eq!(IDF004.decode_uint(&mut r), Some(5));
        assert_eq!(IDF005.decode_bool(&mut r), Some(false));
        assert_eq!(IDF006.decode_bool(&mut r), Some(false));
        assert_eq!(IDF007.decode_uint(&mut r), Some(3));
        assert_eq!(IDF008.decode_uint(&mut r), Some(1234));
        assert_eq!(IDF009.decode_uint(&mut r), Some(2));
        assert_eq!(IDF010.decode_uint(&mut r), Some(2));
        // satellites go out in PRN order
        assert_eq!(IDF011.decode_uint(&mut r), Some(4));
        assert_eq!(IDF012.decode_uint(&mut r), Some(77));
        let radial = IDF013.decode(&mut r).unwrap();
        assert!((radial - 0.1234).abs() < 0.00005);
    }

    #[test]
    fn test_clock_message_has_no_datum_flag() {
        let msgs = igm(IgmKind::Clock, &epoch(vec![galileo(1)]));
        assert_eq!(msgs[0].body().len(), (78 + 76usize).div_ceil(8));
        let mut r = BitReader::at(msgs[0].body(), 78 + 6);
        let c0 = IDF019.decode(&mut r).unwrap();
        assert!((c0 + 1.2345).abs() < 0.00005);
    }

    #[test]
    fn test_one_message_per_constellation_with_multiple_flag() {
        let mut gps = SatelliteCorrection::new(Constellation::Gps, 5);
        gps.clock.c0 = 0.5;
        let msgs = igm(IgmKind::Combined, &epoch(vec![galileo(2), gps]));
        assert_eq!(msgs.len(), 2);
        let subtypes: Vec<u64> = msgs
            .iter()
            .map(|m| BitReader::at(m.body(), 15).get_uint(8).unwrap())
            .collect();
        assert_eq!(subtypes, vec![23, 63]);
        let flags: Vec<u64> = msgs
            .iter()
            .map(|m| BitReader::at(m.body(), 47).get_uint(1).unwrap())
            .collect();
        assert_eq!(flags, vec![1, 0]);
    }

    #[test]
    fn test_split_on_satellite_limit() {
        let sats: Vec<SatelliteCorrection> = (0..100)
            .map(|i| SatelliteCorrection::new(Constellation::Gps, i % 64))
            .collect();
        let msgs = igm(IgmKind::Clock, &epoch(sats));
        assert_eq!(msgs.len(), 2);
        let counts: Vec<u64> = msgs
            .iter()
            .map(|m| IDF010.decode_uint(&mut BitReader::at(m.body(), 72)).unwrap())
            .collect();
        assert_eq!(counts, vec![63, 37]);
    }

    #[test]
    fn test_split_on_body_size() {
        let sats: Vec<SatelliteCorrection> = (1..=50).map(galileo).collect();
        let msgs = igm(IgmKind::Combined, &epoch(sats));
        // 205 bits per satellite: 39 fit in one body
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().all(|m| m.body().len() <= MAX_BODY_LEN));
        let first = IDF010.decode_uint(&mut BitReader::at(msgs[0].body(), 73)).unwrap();
        assert_eq!(first, 39);
    }

    #[test]
    fn test_code_bias_block() {
        let mut sat = SatelliteCorrection::new(Constellation::Gps, 9);
        sat.code_biases = vec![
            CodeBias {
                signal: Signal::GpsL1Ca,
                bias_m: 1.23,
            },
            CodeBias {
                signal: Signal::GpsL2Cm,
                bias_m: -0.5,
            },
        ];
        let msgs = igm(IgmKind::CodeBias, &epoch(vec![sat]));
        let mut r = BitReader::at(msgs[0].body(), 78);
        assert_eq!(IDF011.decode_uint(&mut r), Some(9));
        assert_eq!(IDF023.decode_uint(&mut r), Some(2));
        assert_eq!(IDF024.decode_uint(&mut r), Some(0));
        assert_eq!(IDF025.decode_raw(&mut r), Some(123));
        assert_eq!(IDF024.decode_uint(&mut r), Some(7));
        assert_eq!(IDF025.decode_raw(&mut r), Some(-50));
    }

    #[test]
    fn test_empty_epoch_produces_nothing() {
        assert!(igm(IgmKind::Orbit, &SsrCorrections::default()).is_empty());
    }
}
