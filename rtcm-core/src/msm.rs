//! Multiple Signal Messages (MSM1-MSM7) for GPS, GLONASS and Galileo.
//!
//! Every variant shares one header layout and differs only in which fields
//! make up the satellite and signal data blocks. The variants are described
//! by the [`MSM_VARIANTS`] table and assembled by a single routine, [`msm`].
//!
//! Data blocks are field-major: the first satellite field is written for all
//! satellites, then the second, and so on. Signal data follows the cell mask
//! order (satellite-major, signal-minor).

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::bits::{reserved, BitWriter, Field};
use crate::ephemeris::TimeReference;
use crate::fields::*;
use crate::frame::{build_message, RtcmMessage};
use crate::lock_time::{msm_extended_lock_time_indicator, msm_lock_time_indicator, LockTimeTable};
use crate::types::{
    glonass_day_of_week, glonass_time_of_day, Constellation, Observable, ObservationSnapshot,
    RANGE_MS,
};

/// DF396 is limited to 64 cells.
pub const MAX_CELLS: usize = 64;
/// DF394 has one bit per satellite id 1..=64.
pub const MAX_SATELLITE_ID: u32 = 64;
/// DF395 has one bit per signal id 1..=32.
pub const MAX_SIGNAL_ID: u32 = 32;

/// Fine phase ranges are wrapped into +/- this many cycles of the rough range.
const PHASE_WRAP_CYCLES: f64 = 1500.0;

/// One column of the satellite data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatelliteField {
    /// DF397 integer milliseconds of the rough range.
    RoughRangeMs,
    /// Extended satellite information (GLONASS frequency channel).
    ExtendedInfo,
    /// DF398 rough range modulo 1 ms.
    RoughRangeModMs,
    /// DF399 rough phase range rate.
    RoughRangeRate,
}

/// One column of the signal data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalField {
    /// DF400
    FinePseudorange,
    /// DF405
    FinePseudorangeExt,
    /// DF401
    FinePhaseRange,
    /// DF406
    FinePhaseRangeExt,
    /// DF402
    LockTime,
    /// DF407
    LockTimeExt,
    /// DF420
    HalfCycleAmbiguity,
    /// DF403
    Cnr,
    /// DF408
    CnrExt,
    /// DF404
    FineRangeRate,
}

impl SatelliteField {
    pub fn def(self) -> &'static FieldDef {
        match self {
            SatelliteField::RoughRangeMs => &DF397,
            SatelliteField::ExtendedInfo => &MSM_EXTENDED_INFO,
            SatelliteField::RoughRangeModMs => &DF398,
            SatelliteField::RoughRangeRate => &DF399,
        }
    }
}

impl SignalField {
    pub fn def(self) -> &'static FieldDef {
        match self {
            SignalField::FinePseudorange => &DF400,
            SignalField::FinePseudorangeExt => &DF405,
            SignalField::FinePhaseRange => &DF401,
            SignalField::FinePhaseRangeExt => &DF406,
            SignalField::LockTime => &DF402,
            SignalField::LockTimeExt => &DF407,
            SignalField::HalfCycleAmbiguity => &DF420,
            SignalField::Cnr => &DF403,
            SignalField::CnrExt => &DF408,
            SignalField::FineRangeRate => &DF404,
        }
    }

    fn is_lock_time(self) -> bool {
        matches!(self, SignalField::LockTime | SignalField::LockTimeExt)
    }
}

/// Field layout of one MSM variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsmVariant {
    pub number: u8,
    pub satellite: &'static [SatelliteField],
    pub signal: &'static [SignalField],
}

impl MsmVariant {
    /// Message number for `constellation` (e.g. 1077 for GPS MSM7).
    pub fn message_type(&self, constellation: Constellation) -> u16 {
        constellation.msm_base() + self.number as u16
    }

    pub fn satellite_bits(&self) -> usize {
        self.satellite.iter().map(|f| f.def().width as usize).sum()
    }

    pub fn cell_bits(&self) -> usize {
        self.signal.iter().map(|f| f.def().width as usize).sum()
    }
}

use SatelliteField as Sat;
use SignalField as Sig;

pub const MSM_VARIANTS: [MsmVariant; 7] = [
    MsmVariant {
        number: 1,
        satellite: &[Sat::RoughRangeModMs],
        signal: &[Sig::FinePseudorange],
    },
    MsmVariant {
        number: 2,
        satellite: &[Sat::RoughRangeModMs],
        signal: &[Sig::FinePhaseRange, Sig::LockTime, Sig::HalfCycleAmbiguity],
    },
    MsmVariant {
        number: 3,
        satellite: &[Sat::RoughRangeModMs],
        signal: &[
            Sig::FinePseudorange,
            Sig::FinePhaseRange,
            Sig::LockTime,
            Sig::HalfCycleAmbiguity,
        ],
    },
    MsmVariant {
        number: 4,
        satellite: &[Sat::RoughRangeMs, Sat::RoughRangeModMs],
        signal: &[
            Sig::FinePseudorange,
            Sig::FinePhaseRange,
            Sig::LockTime,
            Sig::HalfCycleAmbiguity,
            Sig::Cnr,
        ],
    },
    MsmVariant {
        number: 5,
        satellite: &[
            Sat::RoughRangeMs,
            Sat::ExtendedInfo,
            Sat::RoughRangeModMs,
            Sat::RoughRangeRate,
        ],
        signal: &[
            Sig::FinePseudorange,
            Sig::FinePhaseRange,
            Sig::LockTime,
            Sig::HalfCycleAmbiguity,
            Sig::Cnr,
            Sig::FineRangeRate,
        ],
    },
    MsmVariant {
        number: 6,
        satellite: &[Sat::RoughRangeMs, Sat::RoughRangeModMs],
        signal: &[
            Sig::FinePseudorangeExt,
            Sig::FinePhaseRangeExt,
            Sig::LockTimeExt,
            Sig::HalfCycleAmbiguity,
            Sig::CnrExt,
        ],
    },
    MsmVariant {
        number: 7,
        satellite: &[
            Sat::RoughRangeMs,
            Sat::ExtendedInfo,
            Sat::RoughRangeModMs,
            Sat::RoughRangeRate,
        ],
        signal: &[
            Sig::FinePseudorangeExt,
            Sig::FinePhaseRangeExt,
            Sig::LockTimeExt,
            Sig::HalfCycleAmbiguity,
            Sig::CnrExt,
            Sig::FineRangeRate,
        ],
    },
];

/// Layout of MSM`number` (1..=7).
pub fn variant(number: u8) -> Option<&'static MsmVariant> {
    MSM_VARIANTS.iter().find(|v| v.number == number)
}

/// Header flags of an MSM epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsmOptions {
    pub station_id: u16,
    /// DF393: more MSMs follow for the same epoch.
    pub more_messages: bool,
    /// DF409 issue of data station.
    pub iods: u8,
    /// DF411 clock steering indicator.
    pub clock_steering: u8,
    /// DF412 external clock indicator.
    pub external_clock: u8,
    pub divergence_free: bool,
    /// Smoothing interval in seconds; negative means unlimited.
    pub smoothing_interval_s: i32,
}

// ---------------------------------------------------------------------------
// Satellite and cell selection
// ---------------------------------------------------------------------------

/// Present satellites and signals of one epoch, after the cell limit.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLayout<'a> {
    /// Satellite ids in ascending order.
    pub satellites: Vec<u32>,
    /// Signal ids in ascending order.
    pub signals: Vec<u32>,
    /// Observable of each (satellite, signal) pair, satellite-major.
    pub cells: Vec<Option<&'a Observable>>,
}

impl<'a> CellLayout<'a> {
    pub fn satellite_mask(&self) -> u64 {
        self.satellites
            .iter()
            .fold(0u64, |mask, &id| mask | 1u64 << (MAX_SATELLITE_ID - id))
    }

    pub fn signal_mask(&self) -> u64 {
        self.signals
            .iter()
            .fold(0u64, |mask, &id| mask | 1u64 << (MAX_SIGNAL_ID - id))
    }

    /// Cell mask bits in transmission order.
    pub fn cell_mask(&self) -> Vec<bool> {
        self.cells.iter().map(Option::is_some).collect()
    }

    fn satellite_cells(&self, sat_index: usize) -> impl Iterator<Item = &'a Observable> + '_ {
        let nsig = self.signals.len();
        self.cells[sat_index * nsig..(sat_index + 1) * nsig]
            .iter()
            .filter_map(|c| *c)
    }
}

/// Group the snapshot's observables of `constellation` into MSM cells.
///
/// Satellites are dropped from the highest id down until
/// satellites x signals fits in [`MAX_CELLS`].
pub fn cell_layout(snapshot: &ObservationSnapshot, constellation: Constellation) -> CellLayout<'_> {
    let mut by_sat: BTreeMap<u32, BTreeMap<u32, &Observable>> = BTreeMap::new();
    for obs in snapshot.values() {
        if obs.constellation() != constellation || obs.prn == 0 || obs.prn > MAX_SATELLITE_ID {
            continue;
        }
        by_sat
            .entry(obs.prn)
            .or_default()
            .entry(obs.signal.msm_signal_id())
            .or_insert(obs);
    }

    let signals_of = |by_sat: &BTreeMap<u32, BTreeMap<u32, &Observable>>| -> Vec<u32> {
        let mut ids: Vec<u32> = by_sat.values().flat_map(|s| s.keys().copied()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };

    let mut signals = signals_of(&by_sat);
    let mut dropped = Vec::new();
    while by_sat.len() * signals.len() > MAX_CELLS {
        if let Some((prn, _)) = by_sat.pop_last() {
            dropped.push(prn);
        }
        signals = signals_of(&by_sat);
    }
    if !dropped.is_empty() {
        warn!(
            constellation = constellation.name(),
            ?dropped,
            "MSM cell mask limited to {MAX_CELLS} cells, satellites dropped"
        );
    }

    let satellites: Vec<u32> = by_sat.keys().copied().collect();
    let cells = by_sat
        .values()
        .flat_map(|sigs| signals.iter().map(move |id| sigs.get(id).copied()))
        .collect();

    CellLayout {
        satellites,
        signals,
        cells,
    }
}

// ---------------------------------------------------------------------------
// Derived satellite values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct SatelliteData {
    /// Rough range in units of 2^-10 ms.
    rough_range: Option<u64>,
    /// Rough range rate, whole m/s.
    rough_rate: Option<f64>,
    extended_info: u64,
}

impl SatelliteData {
    fn from_cells<'a>(constellation: Constellation, mut cells: impl Iterator<Item = &'a Observable>) -> Self {
        let Some(first) = cells.next() else {
            return SatelliteData::default();
        };
        let reference = std::iter::once(first)
            .chain(cells)
            .find(|o| o.valid_pseudorange)
            .unwrap_or(first);

        let rough_range = if reference.valid_pseudorange && reference.pseudorange_m > 0.0 {
            let units = (reference.pseudorange_m / RANGE_MS * 1024.0).round();
            (units.is_finite() && units < DF397_INVALID as f64 * 1024.0).then_some(units as u64)
        } else {
            None
        };
        let rate = first.range_rate_mps().round();
        let rough_rate = (rate.is_finite() && rate.abs() <= DF399.max_raw() as f64).then_some(rate);
        let extended_info = match constellation {
            Constellation::Glonass => glonass_fcn_code(first.glonass_fcn),
            _ => 0,
        };

        SatelliteData {
            rough_range,
            rough_rate,
            extended_info,
        }
    }

    fn rough_range_ms(&self) -> Option<f64> {
        self.rough_range.map(|units| units as f64 / 1024.0)
    }

    fn field(&self, field: SatelliteField) -> Field {
        match field {
            SatelliteField::RoughRangeMs => match self.rough_range {
                Some(units) => DF397.encode_uint(units >> 10),
                None => DF397.encode_int(DF397_INVALID),
            },
            SatelliteField::RoughRangeModMs => DF398.encode_uint(self.rough_range.unwrap_or(0) & 0x3FF),
            SatelliteField::ExtendedInfo => MSM_EXTENDED_INFO.encode_uint(self.extended_info),
            SatelliteField::RoughRangeRate => match self.rough_rate {
                Some(rate) => DF399.encode(rate),
                None => DF399.encode_int(DF399_INVALID),
            },
        }
    }
}

fn fine_pseudorange(def: &FieldDef, sentinel: i64, sat: &SatelliteData, obs: &Observable) -> Field {
    match sat.rough_range_ms() {
        Some(rough) if obs.valid_pseudorange => def.encode_or(obs.pseudorange_m / RANGE_MS - rough, sentinel),
        _ => def.encode_int(sentinel),
    }
}

fn fine_phase_range(def: &FieldDef, sentinel: i64, sat: &SatelliteData, obs: &Observable) -> Field {
    match sat.rough_range_ms() {
        Some(rough) if obs.valid_phase => {
            let lambda = obs.wavelength_m();
            let cycles = obs.carrier_cycles() - rough * RANGE_MS / lambda;
            let wrapped = (cycles + PHASE_WRAP_CYCLES).rem_euclid(2.0 * PHASE_WRAP_CYCLES) - PHASE_WRAP_CYCLES;
            def.encode_or(wrapped * lambda / RANGE_MS, sentinel)
        }
        _ => def.encode_int(sentinel),
    }
}

fn fine_range_rate(sat: &SatelliteData, obs: &Observable) -> Field {
    match sat.rough_rate {
        Some(rough) => DF404.encode_or(obs.range_rate_mps() - rough, DF404_INVALID),
        None => DF404.encode_int(DF404_INVALID),
    }
}

fn signal_field(field: SignalField, sat: &SatelliteData, obs: &Observable, lock_ms: u64) -> Field {
    match field {
        SignalField::FinePseudorange => fine_pseudorange(&DF400, DF400_INVALID, sat, obs),
        SignalField::FinePseudorangeExt => fine_pseudorange(&DF405, DF405_INVALID, sat, obs),
        SignalField::FinePhaseRange => fine_phase_range(&DF401, DF401_INVALID, sat, obs),
        SignalField::FinePhaseRangeExt => fine_phase_range(&DF406, DF406_INVALID, sat, obs),
        SignalField::LockTime => DF402.encode_uint(msm_lock_time_indicator(lock_ms) as u64),
        SignalField::LockTimeExt => DF407.encode_uint(msm_extended_lock_time_indicator(lock_ms) as u64),
        SignalField::HalfCycleAmbiguity => DF420.encode_bool(false),
        SignalField::Cnr => DF403.encode(obs.cn0_db_hz),
        SignalField::CnrExt => DF408.encode(obs.cn0_db_hz),
        SignalField::FineRangeRate => fine_range_rate(sat, obs),
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn push_epoch(w: &mut BitWriter, constellation: Constellation, obs_time: f64) {
    match constellation {
        Constellation::Gps => {
            w.push(DF004.encode_uint(epoch_time_ms(obs_time, WEEK_MS)));
        }
        Constellation::Galileo => {
            w.push(DF248.encode_uint(epoch_time_ms(obs_time, WEEK_MS)));
        }
        Constellation::Glonass => {
            w.push(DF416.encode_uint(glonass_day_of_week(obs_time)))
                .push(DF034.encode_uint(epoch_time_ms(glonass_time_of_day(obs_time), DAY_MS)));
        }
    }
}

fn push_header(
    w: &mut BitWriter,
    msg_type: u16,
    constellation: Constellation,
    obs_time: f64,
    layout: &CellLayout,
    opts: &MsmOptions,
) {
    w.push(DF002.encode_uint(msg_type as u64))
        .push(DF003.encode_uint(opts.station_id as u64));
    push_epoch(w, constellation, obs_time);
    w.push(DF393.encode_bool(opts.more_messages))
        .push(DF409.encode_uint(opts.iods as u64))
        .push(reserved(7))
        .push(DF411.encode_uint(opts.clock_steering as u64))
        .push(DF412.encode_uint(opts.external_clock as u64))
        .push(DF417.encode_bool(opts.divergence_free))
        .push(DF418.encode_uint(smoothing_interval_code(opts.smoothing_interval_s)))
        .push(DF394.encode_uint(layout.satellite_mask()))
        .push(DF395.encode_uint(layout.signal_mask()));
    for bit in layout.cell_mask() {
        w.push_bit(bit);
    }
}

/// Assemble one MSM of the given variant for the `constellation`
/// observables in `snapshot`. `obs_time` is GPS time of week.
///
/// An epoch without observables of the constellation yields a header-only
/// message with empty masks.
pub fn msm(
    variant: &MsmVariant,
    constellation: Constellation,
    table: &mut LockTimeTable,
    time: &impl TimeReference,
    obs_time: f64,
    snapshot: &ObservationSnapshot,
    opts: &MsmOptions,
) -> RtcmMessage {
    let msg_type = variant.message_type(constellation);
    let layout = cell_layout(snapshot, constellation);

    let satellites: Vec<SatelliteData> = (0..layout.satellites.len())
        .map(|i| SatelliteData::from_cells(constellation, layout.satellite_cells(i)))
        .collect();

    // (satellite index, observable, lock ms) per present cell
    let nsig = layout.signals.len().max(1);
    let with_lock = variant.signal.iter().any(|f| f.is_lock_time());
    let epoch = time.epoch_seconds(obs_time);
    let cells: Vec<(usize, &Observable, u64)> = layout
        .cells
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| cell.map(|obs| (i / nsig, obs)))
        .map(|(sat, obs)| {
            let lock_ms = if with_lock {
                let seconds = table.update(obs.signal, obs.prn, epoch, obs.locked);
                (seconds * 1000.0) as u64
            } else {
                0
            };
            (sat, obs, lock_ms)
        })
        .collect();

    let mut w = BitWriter::new();
    push_header(&mut w, msg_type, constellation, obs_time, &layout, opts);
    for &field in variant.satellite {
        for sat in &satellites {
            w.push(sat.field(field));
        }
    }
    for &field in variant.signal {
        for &(sat, obs, lock_ms) in &cells {
            w.push(signal_field(field, &satellites[sat], obs, lock_ms));
        }
    }

    debug!(
        msg_type,
        satellites = layout.satellites.len(),
        signals = layout.signals.len(),
        cells = cells.len(),
        bits = w.len(),
        "assembled MSM"
    );
    build_message(&w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;
    use crate::ephemeris::{GalileoEphemeris, GlonassEphemeris, GpsEphemeris};
    use crate::types::Signal;

    const HEADER_BITS: usize = 169;

    fn obs(signal: Signal, prn: u32, pr: f64) -> Observable {
        let mut o = Observable::new(signal, prn);
        o.pseudorange_m = pr;
        o.carrier_phase_rads = 2.0 * std::f64::consts::PI * (pr / o.wavelength_m() + 0.3);
        o.carrier_doppler_hz = -1200.0;
        o.cn0_db_hz = 44.5;
        o
    }

    fn snapshot(obs: Vec<Observable>) -> ObservationSnapshot {
        obs.into_iter().enumerate().map(|(i, o)| (i as i32, o)).collect()
    }

    fn sample() -> ObservationSnapshot {
        snapshot(vec![
            obs(Signal::GpsL1Ca, 17, 22_000_000.0),
            obs(Signal::GpsL1Ca, 3, 21_000_000.0),
            obs(Signal::GpsL2Cm, 3, 21_000_004.0),
            obs(Signal::GalE1, 3, 25_000_000.0),
        ])
    }

    #[test]
    fn test_variant_table() {
        let bits: Vec<(usize, usize)> = MSM_VARIANTS
            .iter()
            .map(|v| (v.satellite_bits(), v.cell_bits()))
            .collect();
        assert_eq!(
            bits,
            vec![(10, 15), (10, 27), (10, 42), (18, 48), (36, 63), (18, 65), (36, 80)]
        );
        assert_eq!(variant(7).unwrap().message_type(Constellation::Gps), 1077);
        assert_eq!(variant(4).unwrap().message_type(Constellation::Glonass), 1084);
        assert_eq!(variant(5).unwrap().message_type(Constellation::Galileo), 1095);
        assert!(variant(0).is_none());
        assert!(variant(8).is_none());
    }

    #[test]
    fn test_masks_are_consistent() {
        let snap = sample();
        let layout = cell_layout(&snap, Constellation::Gps);
        assert_eq!(layout.satellites, vec![3, 17]);
        assert_eq!(layout.signals, vec![2, 15]);
        assert_eq!(layout.cell_mask(), vec![true, true, true, false]);
        assert_eq!(layout.satellite_mask(), 1u64 << 61 | 1u64 << 47);
        assert_eq!(layout.signal_mask(), 1u64 << 30 | 1u64 << 17);
    }

    #[test]
    fn test_header_fields_on_the_wire() {
        let snap = sample();
        let mut table = LockTimeTable::new();
        let opts = MsmOptions {
            station_id: 99,
            more_messages: true,
            ..Default::default()
        };
        let msg = msm(&MSM_VARIANTS[3], Constellation::Gps, &mut table, &GpsEphemeris::default(), 1000.0, &snap, &opts);
        let mut r = BitReader::new(msg.body());
        assert_eq!(DF002.decode_uint(&mut r), Some(1074));
        assert_eq!(DF003.decode_uint(&mut r), Some(99));
        assert_eq!(DF004.decode_uint(&mut r), Some(1_000_000));
        assert_eq!(DF393.decode_bool(&mut r), Some(true));
        r.skip(3 + 7 + 2 + 2 + 1 + 3).unwrap();
        assert_eq!(DF394.decode_uint(&mut r), Some(1u64 << 61 | 1u64 << 47));
        assert_eq!(DF395.decode_uint(&mut r), Some(1u64 << 30 | 1u64 << 17));
        let cells: Vec<u64> = (0..4).map(|_| r.get_uint(1).unwrap()).collect();
        assert_eq!(cells, vec![1, 1, 1, 0]);
    }

    #[test]
    fn test_body_lengths() {
        let snap = sample();
        let mut table = LockTimeTable::new();
        let eph = GpsEphemeris::default();
        for v in &MSM_VARIANTS {
            let msg = msm(v, Constellation::Gps, &mut table, &eph, 0.0, &snap, &MsmOptions::default());
            let bits = HEADER_BITS + 4 + 2 * v.satellite_bits() + 3 * v.cell_bits();
            assert_eq!(msg.body().len(), bits.div_ceil(8), "MSM{}", v.number);
        }
    }

    #[test]
    fn test_msm7_reconstructs_pseudorange() {
        let snap = sample();
        let mut table = LockTimeTable::new();
        let msg = msm(&MSM_VARIANTS[6], Constellation::Gps, &mut table, &GpsEphemeris::default(), 0.0, &snap, &MsmOptions::default());
        let mut r = BitReader::at(msg.body(), HEADER_BITS + 4);
        let ms: Vec<u64> = (0..2).map(|_| DF397.decode_uint(&mut r).unwrap()).collect();
        let ext: Vec<u64> = (0..2).map(|_| MSM_EXTENDED_INFO.decode_uint(&mut r).unwrap()).collect();
        let modms: Vec<f64> = (0..2).map(|_| DF398.decode(&mut r).unwrap()).collect();
        let rates: Vec<f64> = (0..2).map(|_| DF399.decode(&mut r).unwrap()).collect();
        let fine: Vec<f64> = (0..3).map(|_| DF405.decode(&mut r).unwrap()).collect();
        assert_eq!(ext, vec![0, 0]);

        let rough_ms = ms[0] as f64 + modms[0];
        let pr_l1 = (rough_ms + fine[0]) * RANGE_MS;
        let pr_l2 = (rough_ms + fine[1]) * RANGE_MS;
        let pr_17 = (ms[1] as f64 + modms[1] + fine[2]) * RANGE_MS;
        assert!((pr_l1 - 21_000_000.0).abs() < 0.001, "{pr_l1}");
        assert!((pr_l2 - 21_000_004.0).abs() < 0.001, "{pr_l2}");
        assert!((pr_17 - 22_000_000.0).abs() < 0.001, "{pr_17}");

        let expected_rate = (1200.0 * Signal::GpsL1Ca.wavelength_m(0)).round();
        assert_eq!(rates[0], expected_rate);
    }

    #[test]
    fn test_msm3_carries_only_the_modulo_rough_range() {
        let snap = sample();
        let mut table = LockTimeTable::new();
        let msg = msm(&MSM_VARIANTS[2], Constellation::Gps, &mut table, &GpsEphemeris::default(), 0.0, &snap, &MsmOptions::default());
        assert_eq!(msg.message_type(), Some(1073));
        assert_eq!(msg.body().len(), (HEADER_BITS + 4 + 2 * 10 + 3 * 42).div_ceil(8));

        // DF398 per satellite, then DF400 per cell
        let mut r = BitReader::at(msg.body(), HEADER_BITS + 4);
        let modms: Vec<f64> = (0..2).map(|_| DF398.decode(&mut r).unwrap()).collect();
        let fine: Vec<f64> = (0..3).map(|_| DF400.decode(&mut r).unwrap()).collect();
        let within_ms = |pr: f64| pr.rem_euclid(RANGE_MS);
        let pr_l1 = (modms[0] + fine[0]) * RANGE_MS;
        let pr_l2 = (modms[0] + fine[1]) * RANGE_MS;
        let pr_17 = (modms[1] + fine[2]) * RANGE_MS;
        assert!((pr_l1 - within_ms(21_000_000.0)).abs() < 0.01, "{pr_l1}");
        assert!((pr_l2 - within_ms(21_000_004.0)).abs() < 0.01, "{pr_l2}");
        assert!((pr_17 - within_ms(22_000_000.0)).abs() < 0.01, "{pr_17}");
    }

    #[test]
    fn test_satellite_64_is_encoded() {
        let snap = snapshot(vec![obs(Signal::GpsL1Ca, 64, 21_000_000.0)]);
        let mut table = LockTimeTable::new();
        let eph = GpsEphemeris::default();
        let msg = msm(&MSM_VARIANTS[3], Constellation::Gps, &mut table, &eph, 10.0, &snap, &MsmOptions::default());
        assert_eq!(msg.body().len(), (HEADER_BITS + 1 + 18 + 48).div_ceil(8));

        let mut r = BitReader::at(msg.body(), 24 + 30 + 1 + 3 + 7 + 2 + 2 + 1 + 3);
        assert_eq!(DF394.decode_uint(&mut r), Some(1));
        assert!(table.lock_start(Signal::GpsL1Ca, 64).is_some());
    }

    #[test]
    fn test_invalid_pseudorange_uses_sentinels() {
        let mut o = obs(Signal::GalE1, 4, 24_000_000.0);
        o.valid_pseudorange = false;
        let snap = snapshot(vec![o]);
        let mut table = LockTimeTable::new();
        let msg = msm(&MSM_VARIANTS[3], Constellation::Galileo, &mut table, &GalileoEphemeris::default(), 0.0, &snap, &MsmOptions::default());
        let mut r = BitReader::at(msg.body(), HEADER_BITS + 1);
        assert_eq!(DF397.decode_uint(&mut r), Some(0xFF));
        assert_eq!(DF398.decode_uint(&mut r), Some(0));
        assert_eq!(DF400.decode_raw(&mut r), Some(DF400_INVALID));
        assert_eq!(DF401.decode_raw(&mut r), Some(DF401_INVALID));
    }

    #[test]
    fn test_glonass_epoch_and_channel() {
        let mut o = obs(Signal::GloL1Ca, 5, 20_000_000.0);
        o.glonass_fcn = -4;
        let snap = snapshot(vec![o]);
        let mut table = LockTimeTable::new();
        // GPS Monday 00:00:10 is GLONASS Monday 02:59:52
        let msg = msm(&MSM_VARIANTS[4], Constellation::Glonass, &mut table, &GlonassEphemeris::default(), 86_410.0, &snap, &MsmOptions::default());
        let mut r = BitReader::at(msg.body(), 24);
        assert_eq!(DF416.decode_uint(&mut r), Some(1));
        assert_eq!(DF034.decode_uint(&mut r), Some(10_792_000));
        let mut r = BitReader::at(msg.body(), HEADER_BITS + 1 + 8);
        assert_eq!(MSM_EXTENDED_INFO.decode_uint(&mut r), Some(3));
    }

    #[test]
    fn test_cell_limit_drops_highest_satellites() {
        let mut all = Vec::new();
        for prn in 1..=40 {
            all.push(obs(Signal::GpsL1Ca, prn, 20_000_000.0 + prn as f64));
            all.push(obs(Signal::GpsL2Cm, prn, 20_000_000.0 + prn as f64));
        }
        let snap = snapshot(all);
        let layout = cell_layout(&snap, Constellation::Gps);
        assert_eq!(layout.satellites.len(), 32);
        assert_eq!(layout.satellites.last(), Some(&32));
        assert_eq!(layout.cells.len(), 64);
    }

    #[test]
    fn test_empty_constellation_is_header_only() {
        let snap = sample();
        let mut table = LockTimeTable::new();
        let msg = msm(&MSM_VARIANTS[6], Constellation::Glonass, &mut table, &GlonassEphemeris::default(), 0.0, &snap, &MsmOptions::default());
        assert_eq!(msg.body().len(), HEADER_BITS.div_ceil(8));
    }

    #[test]
    fn test_lock_time_accumulates_between_epochs() {
        let snap = snapshot(vec![obs(Signal::GpsL1Ca, 8, 21_000_000.0)]);
        let mut table = LockTimeTable::new();
        let eph = GpsEphemeris::default();
        let v = &MSM_VARIANTS[6];
        msm(v, Constellation::Gps, &mut table, &eph, 100.0, &snap, &MsmOptions::default());
        let msg = msm(v, Constellation::Gps, &mut table, &eph, 101.0, &snap, &MsmOptions::default());
        let mut r = BitReader::at(msg.body(), HEADER_BITS + 1 + 36 + 20 + 24);
        assert_eq!(DF407.decode_uint(&mut r), Some(msm_extended_lock_time_indicator(1000) as u64));
    }
}
