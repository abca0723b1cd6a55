//! Data field library: every DFxxx (RTCM 10403) and IDFxxx (IGS SSR) field
//! used by the supported messages, as `FieldDef` constants.
//!
//! Resolutions are expressed in the units the codec carries internally:
//! metres, seconds, radians (angle fields are broadcast in semicircles, so
//! their resolution includes the GPS value of pi), and kilometres for the
//! GLONASS navigation fields.

use crate::bits::{to_bits, to_bits_int, to_bits_scaled, BitReader, BitWriter, Encoding, Field};
use crate::types::{GPS_PI, RANGE_MS};

/// Width, scale and representation of one data field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    pub id: &'static str,
    pub width: u32,
    pub resolution: f64,
    pub encoding: Encoding,
}

impl FieldDef {
    pub const fn unsigned(id: &'static str, width: u32, resolution: f64) -> Self {
        FieldDef {
            id,
            width,
            resolution,
            encoding: Encoding::Unsigned,
        }
    }

    pub const fn signed(id: &'static str, width: u32, resolution: f64) -> Self {
        FieldDef {
            id,
            width,
            resolution,
            encoding: Encoding::TwosComplement,
        }
    }

    pub const fn sign_magnitude(id: &'static str, width: u32, resolution: f64) -> Self {
        FieldDef {
            id,
            width,
            resolution,
            encoding: Encoding::SignMagnitude,
        }
    }

    /// Scaled physical value; saturates outside the representable range.
    pub fn encode(&self, value: f64) -> Field {
        to_bits_scaled(value, self.width, self.resolution, self.encoding)
    }

    /// Raw integer value (already in field units).
    pub fn encode_int(&self, value: i64) -> Field {
        to_bits_int(value, self.width, self.encoding)
    }

    pub fn encode_uint(&self, value: u64) -> Field {
        to_bits(value, self.width)
    }

    pub fn encode_bool(&self, flag: bool) -> Field {
        to_bits(u64::from(flag), self.width)
    }

    /// Scaled value, or the raw `sentinel` when `value` is not representable.
    pub fn encode_or(&self, value: f64, sentinel: i64) -> Field {
        let scaled = (value / self.resolution).round();
        if scaled.is_finite() && scaled >= self.min_raw() as f64 && scaled <= self.max_raw() as f64 {
            self.encode_int(scaled as i64)
        } else {
            self.encode_int(sentinel)
        }
    }

    /// Largest raw integer the field holds.
    pub fn max_raw(&self) -> i64 {
        match self.encoding {
            Encoding::Unsigned if self.width >= 63 => i64::MAX,
            Encoding::Unsigned => (1i64 << self.width) - 1,
            _ => (1i64 << (self.width - 1)) - 1,
        }
    }

    /// Smallest raw integer the field holds.
    pub fn min_raw(&self) -> i64 {
        match self.encoding {
            Encoding::Unsigned => 0,
            Encoding::TwosComplement => -(1i64 << (self.width - 1)),
            Encoding::SignMagnitude => -((1i64 << (self.width - 1)) - 1),
        }
    }

    pub fn push_to(&self, w: &mut BitWriter, value: f64) {
        w.push(self.encode(value));
    }

    pub fn decode_raw(&self, r: &mut BitReader) -> Option<i64> {
        r.get(self.width, self.encoding)
    }

    pub fn decode(&self, r: &mut BitReader) -> Option<f64> {
        self.decode_raw(r).map(|raw| raw as f64 * self.resolution)
    }

    pub fn decode_uint(&self, r: &mut BitReader) -> Option<u64> {
        r.get_uint(self.width)
    }

    pub fn decode_bool(&self, r: &mut BitReader) -> Option<bool> {
        r.get_uint(self.width).map(|v| v != 0)
    }
}

const fn p2(exp: i32) -> f64 {
    // exact powers of two for |exp| < 64
    if exp >= 0 {
        (1u64 << exp) as f64
    } else {
        1.0 / (1u64 << -exp) as f64
    }
}

/// Radians per LSB for an angle broadcast in units of 2^exp semicircles.
const fn sc(exp: i32) -> f64 {
    p2(exp) * GPS_PI
}

/// Legacy L1 pseudorange modulus for GPS (one light-millisecond).
pub const GPS_PSEUDORANGE_MODULUS: f64 = RANGE_MS;
/// Legacy L1 pseudorange modulus for GLONASS (two light-milliseconds).
pub const GLONASS_PSEUDORANGE_MODULUS: f64 = 599_584.916;

// ---------------------------------------------------------------------------
// Common header fields
// ---------------------------------------------------------------------------

pub const DF002: FieldDef = FieldDef::unsigned("DF002", 12, 1.0);
pub const DF003: FieldDef = FieldDef::unsigned("DF003", 12, 1.0);
/// GPS epoch time (ms of week). Use [`epoch_time_ms`] to wrap.
pub const DF004: FieldDef = FieldDef::unsigned("DF004", 30, 1.0);
pub const DF005: FieldDef = FieldDef::unsigned("DF005", 1, 1.0);
pub const DF006: FieldDef = FieldDef::unsigned("DF006", 5, 1.0);
pub const DF007: FieldDef = FieldDef::unsigned("DF007", 1, 1.0);
pub const DF008: FieldDef = FieldDef::unsigned("DF008", 3, 1.0);

// ---------------------------------------------------------------------------
// Legacy GPS observation fields (MT1001-1004)
// ---------------------------------------------------------------------------

pub const DF009: FieldDef = FieldDef::unsigned("DF009", 6, 1.0);
pub const DF010: FieldDef = FieldDef::unsigned("DF010", 1, 1.0);
pub const DF011: FieldDef = FieldDef::unsigned("DF011", 24, 0.02);
pub const DF012: FieldDef = FieldDef::signed("DF012", 20, 0.0005);
pub const DF013: FieldDef = FieldDef::unsigned("DF013", 7, 1.0);
pub const DF014: FieldDef = FieldDef::unsigned("DF014", 8, GPS_PSEUDORANGE_MODULUS);
pub const DF015: FieldDef = FieldDef::unsigned("DF015", 8, 0.25);
pub const DF016: FieldDef = FieldDef::unsigned("DF016", 2, 1.0);
pub const DF017: FieldDef = FieldDef::signed("DF017", 14, 0.02);
pub const DF018: FieldDef = FieldDef::signed("DF018", 20, 0.0005);
pub const DF019: FieldDef = FieldDef::unsigned("DF019", 7, 1.0);
pub const DF020: FieldDef = FieldDef::unsigned("DF020", 8, 0.25);

/// "Invalid" value of the 20-bit phaserange-minus-pseudorange fields.
pub const PHASERANGE_INVALID: i64 = -524_288;
/// "Invalid" value of the 14-bit L2-L1 pseudorange difference.
pub const PSEUDORANGE_DIFF_INVALID: i64 = -8_192;

// ---------------------------------------------------------------------------
// Station fields (MT1005/1006/1008/1029)
// ---------------------------------------------------------------------------

pub const DF021: FieldDef = FieldDef::unsigned("DF021", 6, 1.0);
pub const DF022: FieldDef = FieldDef::unsigned("DF022", 1, 1.0);
pub const DF023: FieldDef = FieldDef::unsigned("DF023", 1, 1.0);
pub const DF024: FieldDef = FieldDef::unsigned("DF024", 1, 1.0);
pub const DF025: FieldDef = FieldDef::signed("DF025", 38, 0.0001);
pub const DF026: FieldDef = FieldDef::signed("DF026", 38, 0.0001);
pub const DF027: FieldDef = FieldDef::signed("DF027", 38, 0.0001);
pub const DF028: FieldDef = FieldDef::unsigned("DF028", 16, 0.0001);
pub const DF029: FieldDef = FieldDef::unsigned("DF029", 8, 1.0);
pub const DF030: FieldDef = FieldDef::unsigned("DF030", 8, 1.0);
pub const DF031: FieldDef = FieldDef::unsigned("DF031", 8, 1.0);
pub const DF032: FieldDef = FieldDef::unsigned("DF032", 8, 1.0);
pub const DF033: FieldDef = FieldDef::unsigned("DF033", 8, 1.0);
pub const DF051: FieldDef = FieldDef::unsigned("DF051", 16, 1.0);
pub const DF052: FieldDef = FieldDef::unsigned("DF052", 17, 1.0);
pub const DF138: FieldDef = FieldDef::unsigned("DF138", 7, 1.0);
pub const DF139: FieldDef = FieldDef::unsigned("DF139", 8, 1.0);
pub const DF140: FieldDef = FieldDef::unsigned("DF140", 8, 1.0);
pub const DF141: FieldDef = FieldDef::unsigned("DF141", 1, 1.0);
pub const DF142: FieldDef = FieldDef::unsigned("DF142", 1, 1.0);
pub const DF364: FieldDef = FieldDef::unsigned("DF364", 2, 1.0);

// ---------------------------------------------------------------------------
// Legacy GLONASS observation fields (MT1009-1012)
// ---------------------------------------------------------------------------

/// GLONASS epoch time (ms of day). Use [`epoch_time_ms`] to wrap.
pub const DF034: FieldDef = FieldDef::unsigned("DF034", 27, 1.0);
pub const DF035: FieldDef = FieldDef::unsigned("DF035", 5, 1.0);
pub const DF036: FieldDef = FieldDef::unsigned("DF036", 1, 1.0);
pub const DF037: FieldDef = FieldDef::unsigned("DF037", 3, 1.0);
pub const DF038: FieldDef = FieldDef::unsigned("DF038", 6, 1.0);
pub const DF039: FieldDef = FieldDef::unsigned("DF039", 1, 1.0);
/// Frequency channel number, offset by 7.
pub const DF040: FieldDef = FieldDef::unsigned("DF040", 5, 1.0);
pub const DF041: FieldDef = FieldDef::unsigned("DF041", 25, 0.02);
pub const DF042: FieldDef = FieldDef::signed("DF042", 20, 0.0005);
pub const DF043: FieldDef = FieldDef::unsigned("DF043", 7, 1.0);
pub const DF044: FieldDef = FieldDef::unsigned("DF044", 7, GLONASS_PSEUDORANGE_MODULUS);
pub const DF045: FieldDef = FieldDef::unsigned("DF045", 8, 0.25);
pub const DF046: FieldDef = FieldDef::unsigned("DF046", 2, 1.0);
pub const DF047: FieldDef = FieldDef::signed("DF047", 14, 0.02);
pub const DF048: FieldDef = FieldDef::signed("DF048", 20, 0.0005);
pub const DF049: FieldDef = FieldDef::unsigned("DF049", 7, 1.0);
pub const DF050: FieldDef = FieldDef::unsigned("DF050", 8, 0.25);

// ---------------------------------------------------------------------------
// GPS ephemeris fields (MT1019)
// ---------------------------------------------------------------------------

pub const DF071: FieldDef = FieldDef::unsigned("DF071", 8, 1.0);
/// GPS week modulo 1024.
pub const DF076: FieldDef = FieldDef::unsigned("DF076", 10, 1.0);
pub const DF077: FieldDef = FieldDef::unsigned("DF077", 4, 1.0);
pub const DF078: FieldDef = FieldDef::unsigned("DF078", 2, 1.0);
pub const DF079: FieldDef = FieldDef::signed("DF079", 14, sc(-43));
pub const DF081: FieldDef = FieldDef::unsigned("DF081", 16, 16.0);
pub const DF082: FieldDef = FieldDef::signed("DF082", 8, p2(-55));
pub const DF083: FieldDef = FieldDef::signed("DF083", 16, p2(-43));
pub const DF084: FieldDef = FieldDef::signed("DF084", 22, p2(-31));
pub const DF085: FieldDef = FieldDef::unsigned("DF085", 10, 1.0);
pub const DF086: FieldDef = FieldDef::signed("DF086", 16, p2(-5));
pub const DF087: FieldDef = FieldDef::signed("DF087", 16, sc(-43));
pub const DF088: FieldDef = FieldDef::signed("DF088", 32, sc(-31));
pub const DF089: FieldDef = FieldDef::signed("DF089", 16, p2(-29));
pub const DF090: FieldDef = FieldDef::unsigned("DF090", 32, p2(-33));
pub const DF091: FieldDef = FieldDef::signed("DF091", 16, p2(-29));
pub const DF092: FieldDef = FieldDef::unsigned("DF092", 32, p2(-19));
pub const DF093: FieldDef = FieldDef::unsigned("DF093", 16, 16.0);
pub const DF094: FieldDef = FieldDef::signed("DF094", 16, p2(-29));
pub const DF095: FieldDef = FieldDef::signed("DF095", 32, sc(-31));
pub const DF096: FieldDef = FieldDef::signed("DF096", 16, p2(-29));
pub const DF097: FieldDef = FieldDef::signed("DF097", 32, sc(-31));
pub const DF098: FieldDef = FieldDef::signed("DF098", 16, p2(-5));
pub const DF099: FieldDef = FieldDef::signed("DF099", 32, sc(-31));
pub const DF100: FieldDef = FieldDef::signed("DF100", 24, sc(-43));
pub const DF101: FieldDef = FieldDef::signed("DF101", 8, p2(-31));
pub const DF102: FieldDef = FieldDef::unsigned("DF102", 6, 1.0);
pub const DF103: FieldDef = FieldDef::unsigned("DF103", 1, 1.0);
pub const DF137: FieldDef = FieldDef::unsigned("DF137", 1, 1.0);

// ---------------------------------------------------------------------------
// GLONASS ephemeris fields (MT1020)
// ---------------------------------------------------------------------------

pub const DF104: FieldDef = FieldDef::unsigned("DF104", 1, 1.0);
pub const DF105: FieldDef = FieldDef::unsigned("DF105", 1, 1.0);
pub const DF106: FieldDef = FieldDef::unsigned("DF106", 2, 1.0);
/// tk packed as hours(5) | minutes(6) | 30-second flag(1). See [`glonass_tk`].
pub const DF107: FieldDef = FieldDef::unsigned("DF107", 12, 1.0);
pub const DF108: FieldDef = FieldDef::unsigned("DF108", 1, 1.0);
pub const DF109: FieldDef = FieldDef::unsigned("DF109", 1, 1.0);
pub const DF110: FieldDef = FieldDef::unsigned("DF110", 7, 900.0);
pub const DF111: FieldDef = FieldDef::sign_magnitude("DF111", 24, p2(-20));
pub const DF112: FieldDef = FieldDef::sign_magnitude("DF112", 27, p2(-11));
pub const DF113: FieldDef = FieldDef::sign_magnitude("DF113", 5, p2(-30));
pub const DF114: FieldDef = FieldDef::sign_magnitude("DF114", 24, p2(-20));
pub const DF115: FieldDef = FieldDef::sign_magnitude("DF115", 27, p2(-11));
pub const DF116: FieldDef = FieldDef::sign_magnitude("DF116", 5, p2(-30));
pub const DF117: FieldDef = FieldDef::sign_magnitude("DF117", 24, p2(-20));
pub const DF118: FieldDef = FieldDef::sign_magnitude("DF118", 27, p2(-11));
pub const DF119: FieldDef = FieldDef::sign_magnitude("DF119", 5, p2(-30));
pub const DF120: FieldDef = FieldDef::unsigned("DF120", 1, 1.0);
pub const DF121: FieldDef = FieldDef::sign_magnitude("DF121", 11, p2(-40));
pub const DF122: FieldDef = FieldDef::unsigned("DF122", 2, 1.0);
pub const DF123: FieldDef = FieldDef::unsigned("DF123", 1, 1.0);
pub const DF124: FieldDef = FieldDef::sign_magnitude("DF124", 22, p2(-30));
pub const DF125: FieldDef = FieldDef::sign_magnitude("DF125", 5, p2(-30));
pub const DF126: FieldDef = FieldDef::unsigned("DF126", 5, 1.0);
pub const DF127: FieldDef = FieldDef::unsigned("DF127", 1, 1.0);
pub const DF128: FieldDef = FieldDef::unsigned("DF128", 4, 1.0);
pub const DF129: FieldDef = FieldDef::unsigned("DF129", 11, 1.0);
pub const DF130: FieldDef = FieldDef::unsigned("DF130", 2, 1.0);
pub const DF131: FieldDef = FieldDef::unsigned("DF131", 1, 1.0);
pub const DF132: FieldDef = FieldDef::unsigned("DF132", 11, 1.0);
pub const DF133: FieldDef = FieldDef::sign_magnitude("DF133", 32, p2(-31));
pub const DF134: FieldDef = FieldDef::unsigned("DF134", 5, 1.0);
pub const DF135: FieldDef = FieldDef::sign_magnitude("DF135", 22, p2(-30));
pub const DF136: FieldDef = FieldDef::unsigned("DF136", 1, 1.0);

// ---------------------------------------------------------------------------
// Galileo fields (MT1045, MSM epoch)
// ---------------------------------------------------------------------------

/// Galileo epoch time (ms of week). Use [`epoch_time_ms`] to wrap.
pub const DF248: FieldDef = FieldDef::unsigned("DF248", 30, 1.0);
pub const DF252: FieldDef = FieldDef::unsigned("DF252", 6, 1.0);
pub const DF289: FieldDef = FieldDef::unsigned("DF289", 12, 1.0);
pub const DF290: FieldDef = FieldDef::unsigned("DF290", 10, 1.0);
pub const DF291: FieldDef = FieldDef::unsigned("DF291", 8, 1.0);
pub const DF292: FieldDef = FieldDef::signed("DF292", 14, sc(-43));
pub const DF293: FieldDef = FieldDef::unsigned("DF293", 14, 60.0);
pub const DF294: FieldDef = FieldDef::signed("DF294", 6, p2(-59));
pub const DF295: FieldDef = FieldDef::signed("DF295", 21, p2(-46));
pub const DF296: FieldDef = FieldDef::signed("DF296", 31, p2(-34));
pub const DF297: FieldDef = FieldDef::signed("DF297", 16, p2(-5));
pub const DF298: FieldDef = FieldDef::signed("DF298", 16, sc(-43));
pub const DF299: FieldDef = FieldDef::signed("DF299", 32, sc(-31));
pub const DF300: FieldDef = FieldDef::signed("DF300", 16, p2(-29));
pub const DF301: FieldDef = FieldDef::unsigned("DF301", 32, p2(-33));
pub const DF302: FieldDef = FieldDef::signed("DF302", 16, p2(-29));
pub const DF303: FieldDef = FieldDef::unsigned("DF303", 32, p2(-19));
pub const DF304: FieldDef = FieldDef::unsigned("DF304", 14, 60.0);
pub const DF305: FieldDef = FieldDef::signed("DF305", 16, p2(-29));
pub const DF306: FieldDef = FieldDef::signed("DF306", 32, sc(-31));
pub const DF307: FieldDef = FieldDef::signed("DF307", 16, p2(-29));
pub const DF308: FieldDef = FieldDef::signed("DF308", 32, sc(-31));
pub const DF309: FieldDef = FieldDef::signed("DF309", 16, p2(-5));
pub const DF310: FieldDef = FieldDef::signed("DF310", 32, sc(-31));
pub const DF311: FieldDef = FieldDef::signed("DF311", 24, sc(-43));
pub const DF312: FieldDef = FieldDef::signed("DF312", 10, p2(-32));
pub const DF314: FieldDef = FieldDef::unsigned("DF314", 2, 1.0);
pub const DF315: FieldDef = FieldDef::unsigned("DF315", 1, 1.0);

// ---------------------------------------------------------------------------
// MSM fields
// ---------------------------------------------------------------------------

pub const DF393: FieldDef = FieldDef::unsigned("DF393", 1, 1.0);
pub const DF394: FieldDef = FieldDef::unsigned("DF394", 64, 1.0);
pub const DF395: FieldDef = FieldDef::unsigned("DF395", 32, 1.0);
/// Rough range, integer milliseconds.
pub const DF397: FieldDef = FieldDef::unsigned("DF397", 8, 1.0);
/// Rough range modulo 1 ms, 2^-10 ms.
pub const DF398: FieldDef = FieldDef::unsigned("DF398", 10, p2(-10));
/// Rough phase range rate (m/s).
pub const DF399: FieldDef = FieldDef::signed("DF399", 14, 1.0);
/// Fine pseudorange (ms).
pub const DF400: FieldDef = FieldDef::signed("DF400", 15, p2(-24));
/// Fine phase range (ms).
pub const DF401: FieldDef = FieldDef::signed("DF401", 22, p2(-29));
pub const DF402: FieldDef = FieldDef::unsigned("DF402", 4, 1.0);
pub const DF403: FieldDef = FieldDef::unsigned("DF403", 6, 1.0);
/// Fine phase range rate (m/s).
pub const DF404: FieldDef = FieldDef::signed("DF404", 15, 0.0001);
pub const DF405: FieldDef = FieldDef::signed("DF405", 20, p2(-29));
pub const DF406: FieldDef = FieldDef::signed("DF406", 24, p2(-31));
pub const DF407: FieldDef = FieldDef::unsigned("DF407", 10, 1.0);
pub const DF408: FieldDef = FieldDef::unsigned("DF408", 10, p2(-4));
pub const DF409: FieldDef = FieldDef::unsigned("DF409", 3, 1.0);
pub const DF411: FieldDef = FieldDef::unsigned("DF411", 2, 1.0);
pub const DF412: FieldDef = FieldDef::unsigned("DF412", 2, 1.0);
pub const DF416: FieldDef = FieldDef::unsigned("DF416", 3, 1.0);
pub const DF417: FieldDef = FieldDef::unsigned("DF417", 1, 1.0);
pub const DF418: FieldDef = FieldDef::unsigned("DF418", 3, 1.0);
pub const DF420: FieldDef = FieldDef::unsigned("DF420", 1, 1.0);
/// MSM5/7 extended satellite information (GLONASS: FCN + 7).
pub const MSM_EXTENDED_INFO: FieldDef = FieldDef::unsigned("MSM-EXT", 4, 1.0);

pub const DF397_INVALID: i64 = 0xFF;
pub const DF399_INVALID: i64 = -8_192;
pub const DF400_INVALID: i64 = -16_384;
pub const DF401_INVALID: i64 = -2_097_152;
pub const DF404_INVALID: i64 = -16_384;
pub const DF405_INVALID: i64 = -524_288;
pub const DF406_INVALID: i64 = -8_388_608;

// ---------------------------------------------------------------------------
// IGS SSR fields
// ---------------------------------------------------------------------------

pub const IDF001: FieldDef = FieldDef::unsigned("IDF001", 3, 1.0);
pub const IDF002: FieldDef = FieldDef::unsigned("IDF002", 8, 1.0);
pub const IDF003: FieldDef = FieldDef::unsigned("IDF003", 20, 1.0);
pub const IDF004: FieldDef = FieldDef::unsigned("IDF004", 4, 1.0);
pub const IDF005: FieldDef = FieldDef::unsigned("IDF005", 1, 1.0);
pub const IDF006: FieldDef = FieldDef::unsigned("IDF006", 1, 1.0);
pub const IDF007: FieldDef = FieldDef::unsigned("IDF007", 4, 1.0);
pub const IDF008: FieldDef = FieldDef::unsigned("IDF008", 16, 1.0);
pub const IDF009: FieldDef = FieldDef::unsigned("IDF009", 4, 1.0);
pub const IDF010: FieldDef = FieldDef::unsigned("IDF010", 6, 1.0);
pub const IDF011: FieldDef = FieldDef::unsigned("IDF011", 6, 1.0);
pub const IDF012: FieldDef = FieldDef::unsigned("IDF012", 8, 1.0);
pub const IDF013: FieldDef = FieldDef::signed("IDF013", 22, 0.0001);
pub const IDF014: FieldDef = FieldDef::signed("IDF014", 20, 0.0004);
pub const IDF015: FieldDef = FieldDef::signed("IDF015", 20, 0.0004);
pub const IDF016: FieldDef = FieldDef::signed("IDF016", 21, 0.000001);
pub const IDF017: FieldDef = FieldDef::signed("IDF017", 19, 0.000004);
pub const IDF018: FieldDef = FieldDef::signed("IDF018", 19, 0.000004);
pub const IDF019: FieldDef = FieldDef::signed("IDF019", 22, 0.0001);
pub const IDF020: FieldDef = FieldDef::signed("IDF020", 21, 0.000001);
pub const IDF021: FieldDef = FieldDef::signed("IDF021", 27, 0.00000002);
pub const IDF023: FieldDef = FieldDef::unsigned("IDF023", 5, 1.0);
pub const IDF024: FieldDef = FieldDef::unsigned("IDF024", 5, 1.0);
pub const IDF025: FieldDef = FieldDef::signed("IDF025", 14, 0.01);

// ---------------------------------------------------------------------------
// Special encodings
// ---------------------------------------------------------------------------

/// Epoch time in integer milliseconds, wrapped into `[0, period_ms)`.
pub fn epoch_time_ms(seconds: f64, period_ms: u64) -> u64 {
    let ms = (seconds * 1000.0).round();
    if !ms.is_finite() {
        return 0;
    }
    (ms as i64).rem_euclid(period_ms as i64) as u64
}

pub const WEEK_MS: u64 = 604_800_000;
pub const DAY_MS: u64 = 86_400_000;

/// DF107: seconds of day packed as hours, minutes and a 30-second flag.
pub fn glonass_tk(tk_seconds: f64) -> Field {
    let total = (tk_seconds.max(0.0) as u64) % 86_400;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let half = u64::from(total % 60 >= 30);
    DF107.encode_uint((hours << 7) | (minutes << 1) | half)
}

/// Inverse of [`glonass_tk`].
pub fn glonass_tk_seconds(raw: u64) -> f64 {
    let hours = (raw >> 7) & 0x1F;
    let minutes = (raw >> 1) & 0x3F;
    let half = raw & 1;
    (hours * 3600 + minutes * 60 + half * 30) as f64
}

/// DF008 / DF037 / DF418 smoothing interval code.
pub fn smoothing_interval_code(seconds: i32) -> u64 {
    match seconds {
        s if s < 0 => 7,
        0 => 0,
        s if s < 30 => 1,
        s if s <= 60 => 2,
        s if s <= 120 => 3,
        s if s <= 240 => 4,
        s if s <= 480 => 5,
        _ => 6,
    }
}

/// DF040 / MSM extended info: GLONASS frequency channel offset by 7.
pub fn glonass_fcn_code(fcn: i32) -> u64 {
    (fcn + 7).clamp(0, 13) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(def: &FieldDef, value: f64) -> f64 {
        let mut w = BitWriter::new();
        w.push(def.encode(value));
        assert_eq!(w.len(), def.width as usize);
        let bytes = w.into_bytes();
        def.decode(&mut BitReader::new(&bytes)).unwrap()
    }

    fn assert_roundtrip(def: &FieldDef, value: f64) {
        let back = roundtrip(def, value);
        assert!(
            (back - value).abs() <= def.resolution / 2.0 + 1e-12 * value.abs(),
            "{}: {value} came back as {back}",
            def.id
        );
    }

    #[test]
    fn test_extremes_roundtrip() {
        for def in [&DF025, &DF012, &DF084, &DF088, &DF111, &DF112, &DF133, &IDF021, &DF406] {
            assert_roundtrip(def, def.max_raw() as f64 * def.resolution);
            assert_roundtrip(def, def.min_raw() as f64 * def.resolution);
            assert_roundtrip(def, 0.0);
        }
        for def in [&DF011, &DF090, &DF092, &DF081, &DF028] {
            assert_roundtrip(def, def.max_raw() as f64 * def.resolution);
            assert_roundtrip(def, 0.0);
        }
    }

    #[test]
    fn test_physical_values_roundtrip() {
        assert_roundtrip(&DF025, 1_114_104.5999);
        assert_roundtrip(&DF026, -4_850_729.7108);
        assert_roundtrip(&DF092, 5153.6);
        assert_roundtrip(&DF090, 0.0123);
        assert_roundtrip(&DF088, -2.5);
        assert_roundtrip(&DF099, 3.1);
        assert_roundtrip(&DF100, -8.0e-9);
        assert_roundtrip(&DF112, -14_321.123);
        assert_roundtrip(&DF111, 2.718);
        assert_roundtrip(&DF124, -1.1e-4);
        assert_roundtrip(&DF296, 3.0e-4);
        assert_roundtrip(&IDF013, -0.2);
    }

    #[test]
    fn test_saturation() {
        let f = DF015.encode(1000.0);
        assert_eq!(f.value(), 255);
        let f = DF012.encode(1.0e6);
        assert_eq!(f.value(), 0x7FFFF);
        let f = DF113.encode(-1.0);
        assert_eq!(f.to_bin_string(), "11111");
    }

    #[test]
    fn test_sentinels() {
        let f = DF012.encode_or(300.0, PHASERANGE_INVALID);
        assert_eq!(f.value(), 0x80000);
        let f = DF017.encode_or(f64::NAN, PSEUDORANGE_DIFF_INVALID);
        assert_eq!(f.value(), 0x2000);
        let f = DF397.encode_or(300.0, DF397_INVALID);
        assert_eq!(f.value(), 0xFF);
        let f = DF400.encode_or(1.0, DF400_INVALID);
        assert_eq!(f.value(), 0x4000);
        let f = DF401.encode_or(1.0, DF401_INVALID);
        assert_eq!(f.value(), 0x200000);
        let f = DF406.encode_or(1.0, DF406_INVALID);
        assert_eq!(f.value(), 0x800000);
        // in-range values are encoded normally
        let f = DF012.encode_or(1.0, PHASERANGE_INVALID);
        assert_eq!(f.value(), 2000);
    }

    #[test]
    fn test_sign_magnitude_fields() {
        let f = DF124.encode(-p2(-30) * 5.0);
        assert_eq!(f.value(), (1 << 21) | 5);
        let f = DF121.encode(p2(-40) * 3.0);
        assert_eq!(f.value(), 3);
    }

    #[test]
    fn test_semicircle_resolution() {
        // one LSB of M0 is 2^-31 semicircles
        let f = DF088.encode(GPS_PI * p2(-31));
        assert_eq!(f.value(), 1);
        let f = DF088.encode(-GPS_PI);
        assert_eq!(f.value(), 0x8000_0000);
    }

    #[test]
    fn test_epoch_time_wraps() {
        assert_eq!(epoch_time_ms(604_800.0, WEEK_MS), 0);
        assert_eq!(epoch_time_ms(604_800.5, WEEK_MS), 500);
        assert_eq!(epoch_time_ms(-1.0, DAY_MS), DAY_MS - 1000);
        assert_eq!(epoch_time_ms(f64::NAN, DAY_MS), 0);
        assert_eq!(epoch_time_ms(1.25, WEEK_MS), 1250);
    }

    #[test]
    fn test_glonass_tk() {
        let f = glonass_tk(3600.0 * 13.0 + 60.0 * 27.0 + 30.0);
        assert_eq!(f.width(), 12);
        assert_eq!(f.value(), (13 << 7) | (27 << 1) | 1);
        assert_eq!(glonass_tk_seconds(f.value()), 48_450.0);
        assert_eq!(glonass_tk_seconds(glonass_tk(59.0).value()), 30.0);
    }

    #[test]
    fn test_smoothing_interval_code() {
        assert_eq!(smoothing_interval_code(0), 0);
        assert_eq!(smoothing_interval_code(10), 1);
        assert_eq!(smoothing_interval_code(30), 2);
        assert_eq!(smoothing_interval_code(90), 3);
        assert_eq!(smoothing_interval_code(200), 4);
        assert_eq!(smoothing_interval_code(400), 5);
        assert_eq!(smoothing_interval_code(900), 6);
        assert_eq!(smoothing_interval_code(-1), 7);
    }

    #[test]
    fn test_glonass_fcn_code() {
        assert_eq!(glonass_fcn_code(-7), 0);
        assert_eq!(glonass_fcn_code(6), 13);
        assert_eq!(glonass_fcn_code(0), 7);
    }
}
