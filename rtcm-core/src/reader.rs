//! Decode received frames back into typed records.
//!
//! Every reader validates the frame (preamble, length, CRC) and the message
//! number before touching the body. Malformed input is expected from network
//! peers, so failures are `Err` values and nothing is returned partially.

use serde::Serialize;
use tracing::debug;

use crate::bits::BitReader;
use crate::ephemeris::{GalileoEphemeris, GlonassEphemeris, GlonassUtcModel, GpsEphemeris};
use crate::fields::*;
use crate::frame::{parse_message, RtcmMessage, HEADER_LEN};
use crate::station::StationPosition;
use crate::types::{Constellation, Result, RtcmError};

/// Frame-validated message number of `data`.
pub fn message_type(data: &[u8]) -> Result<u16> {
    let msg = parse_message(data)?;
    msg.message_type().ok_or(RtcmError::Truncated(0))
}

fn open(data: &[u8], expected: u16) -> Result<RtcmMessage> {
    let msg = parse_message(data)?;
    let actual = msg.message_type().ok_or(RtcmError::Truncated(0))?;
    if actual != expected {
        return Err(RtcmError::UnexpectedType { expected, actual });
    }
    Ok(msg)
}

/// Body reader that turns running off the end into [`RtcmError::Truncated`].
struct Body<'a> {
    r: BitReader<'a>,
}

impl<'a> Body<'a> {
    /// Positioned after the 12-bit message number.
    fn new(msg: &'a RtcmMessage) -> Self {
        Body {
            r: BitReader::at(msg.body(), 12),
        }
    }

    fn truncated(&self) -> RtcmError {
        RtcmError::Truncated(self.r.position())
    }

    fn f64(&mut self, def: &FieldDef) -> Result<f64> {
        def.decode(&mut self.r).ok_or_else(|| self.truncated())
    }

    fn u64(&mut self, def: &FieldDef) -> Result<u64> {
        def.decode_uint(&mut self.r).ok_or_else(|| self.truncated())
    }

    fn u32(&mut self, def: &FieldDef) -> Result<u32> {
        self.u64(def).map(|v| v as u32)
    }

    fn bool(&mut self, def: &FieldDef) -> Result<bool> {
        def.decode_bool(&mut self.r).ok_or_else(|| self.truncated())
    }

    fn skip(&mut self, bits: usize) -> Result<()> {
        self.r.skip(bits).ok_or_else(|| self.truncated())
    }

    fn bytes(&mut self, def: &FieldDef, count: usize) -> Result<Vec<u8>> {
        (0..count).map(|_| self.u64(def).map(|b| b as u8)).collect()
    }
}

// ---------------------------------------------------------------------------
// Station messages
// ---------------------------------------------------------------------------

fn read_arp(b: &mut Body) -> Result<StationPosition> {
    let station_id = b.u64(&DF003)? as u16;
    let itrf_year = b.u64(&DF021)? as u8;
    let gps = b.bool(&DF022)?;
    let glonass = b.bool(&DF023)?;
    let galileo = b.bool(&DF024)?;
    let non_physical = b.bool(&DF141)?;
    let ecef_x = b.f64(&DF025)?;
    let single_oscillator = b.bool(&DF142)?;
    b.skip(1)?;
    let ecef_y = b.f64(&DF026)?;
    let quarter_cycle_indicator = b.u64(&DF364)? as u8;
    let ecef_z = b.f64(&DF027)?;
    Ok(StationPosition {
        station_id,
        itrf_year,
        gps,
        glonass,
        galileo,
        non_physical,
        single_oscillator,
        quarter_cycle_indicator,
        ecef_x,
        ecef_y,
        ecef_z,
        antenna_height: None,
    })
}

/// Decode MT1005 (stationary antenna reference point).
pub fn read_mt1005(data: &[u8]) -> Result<StationPosition> {
    let msg = open(data, 1005)?;
    read_arp(&mut Body::new(&msg))
}

/// Decode MT1006 (antenna reference point with height).
pub fn read_mt1006(data: &[u8]) -> Result<StationPosition> {
    let msg = open(data, 1006)?;
    let mut b = Body::new(&msg);
    let mut pos = read_arp(&mut b)?;
    pos.antenna_height = Some(b.f64(&DF028)?);
    Ok(pos)
}

/// Antenna descriptor of MT1008.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AntennaDescriptor {
    pub station_id: u16,
    pub descriptor: String,
    pub setup_id: u8,
    pub serial: String,
}

/// Decode MT1008 (antenna descriptor and serial number).
pub fn read_mt1008(data: &[u8]) -> Result<AntennaDescriptor> {
    let msg = open(data, 1008)?;
    let mut b = Body::new(&msg);
    let station_id = b.u64(&DF003)? as u16;
    let n = b.u64(&DF029)? as usize;
    let descriptor = b.bytes(&DF030, n)?;
    let setup_id = b.u64(&DF031)? as u8;
    let m = b.u64(&DF032)? as usize;
    let serial = b.bytes(&DF033, m)?;
    Ok(AntennaDescriptor {
        station_id,
        descriptor: String::from_utf8_lossy(&descriptor).into_owned(),
        setup_id,
        serial: String::from_utf8_lossy(&serial).into_owned(),
    })
}

/// Text message of MT1029.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    pub station_id: u16,
    /// UTC Modified Julian Date.
    pub mjd: u32,
    /// UTC seconds of day.
    pub second_of_day: u32,
    pub text: String,
}

/// Decode MT1029 (Unicode text string).
pub fn read_mt1029(data: &[u8]) -> Result<TextMessage> {
    let msg = open(data, 1029)?;
    let mut b = Body::new(&msg);
    let station_id = b.u64(&DF003)? as u16;
    let mjd = b.u32(&DF051)?;
    let second_of_day = b.u32(&DF052)?;
    let _chars = b.u64(&DF138)?;
    let n = b.u64(&DF139)? as usize;
    let text = b.bytes(&DF140, n)?;
    let text = String::from_utf8(text).map_err(|e| RtcmError::InvalidSymbols {
        kind: "UTF-8",
        input: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })?;
    Ok(TextMessage {
        station_id,
        mjd,
        second_of_day,
        text,
    })
}

// ---------------------------------------------------------------------------
// Ephemeris messages
// ---------------------------------------------------------------------------

/// Decode MT1019. The week is returned modulo 1024 as broadcast.
pub fn read_mt1019(data: &[u8]) -> Result<GpsEphemeris> {
    let msg = open(data, 1019)?;
    let mut b = Body::new(&msg);
    let eph = GpsEphemeris {
        prn: b.u32(&DF009)?,
        week: b.u32(&DF076)?,
        sv_accuracy: b.u32(&DF077)?,
        code_on_l2: b.u32(&DF078)?,
        idot: b.f64(&DF079)?,
        iode: b.u32(&DF071)?,
        toc: b.f64(&DF081)?,
        af2: b.f64(&DF082)?,
        af1: b.f64(&DF083)?,
        af0: b.f64(&DF084)?,
        iodc: b.u32(&DF085)?,
        crs: b.f64(&DF086)?,
        delta_n: b.f64(&DF087)?,
        m0: b.f64(&DF088)?,
        cuc: b.f64(&DF089)?,
        ecc: b.f64(&DF090)?,
        cus: b.f64(&DF091)?,
        sqrt_a: b.f64(&DF092)?,
        toe: b.f64(&DF093)?,
        cic: b.f64(&DF094)?,
        omega0: b.f64(&DF095)?,
        cis: b.f64(&DF096)?,
        i0: b.f64(&DF097)?,
        crc: b.f64(&DF098)?,
        omega: b.f64(&DF099)?,
        omega_dot: b.f64(&DF100)?,
        tgd: b.f64(&DF101)?,
        sv_health: b.u32(&DF102)?,
        l2_p_data_flag: b.bool(&DF103)?,
        fit_interval_flag: b.bool(&DF137)?,
    };
    debug!(prn = eph.prn, iode = eph.iode, "decoded MT1019");
    Ok(eph)
}

/// Decode MT1020 into the ephemeris and the GLONASS time parameters.
pub fn read_mt1020(data: &[u8]) -> Result<(GlonassEphemeris, GlonassUtcModel)> {
    let msg = open(data, 1020)?;
    let mut b = Body::new(&msg);
    let slot = b.u32(&DF038)?;
    let fcn = b.u64(&DF040)? as i32 - 7;
    let almanac_health = b.bool(&DF104)?;
    let almanac_health_available = b.bool(&DF105)?;
    let p1 = b.u32(&DF106)?;
    let tk = glonass_tk_seconds(b.u64(&DF107)?);
    let eph = GlonassEphemeris {
        slot,
        fcn,
        almanac_health,
        almanac_health_available,
        p1,
        tk,
        bn_msb: b.bool(&DF108)?,
        p2: b.bool(&DF109)?,
        tb: b.f64(&DF110)?,
        xn_dot: b.f64(&DF111)?,
        xn: b.f64(&DF112)?,
        xn_ddot: b.f64(&DF113)?,
        yn_dot: b.f64(&DF114)?,
        yn: b.f64(&DF115)?,
        yn_ddot: b.f64(&DF116)?,
        zn_dot: b.f64(&DF117)?,
        zn: b.f64(&DF118)?,
        zn_ddot: b.f64(&DF119)?,
        p3: b.bool(&DF120)?,
        gamma_n: b.f64(&DF121)?,
        p: b.u32(&DF122)?,
        ln_third: b.bool(&DF123)?,
        tau_n: b.f64(&DF124)?,
        delta_tau_n: b.f64(&DF125)?,
        en: b.u32(&DF126)?,
        p4: b.bool(&DF127)?,
        ft: b.u32(&DF128)?,
        nt: b.u32(&DF129)?,
        m: b.u32(&DF130)?,
        additional_data: b.bool(&DF131)?,
        ln_fifth: false,
    };
    let utc = GlonassUtcModel {
        na: b.u32(&DF132)?,
        tau_c: b.f64(&DF133)?,
        n4: b.u32(&DF134)?,
        tau_gps: b.f64(&DF135)?,
    };
    let eph = GlonassEphemeris {
        ln_fifth: b.bool(&DF136)?,
        ..eph
    };
    debug!(slot = eph.slot, fcn = eph.fcn, "decoded MT1020");
    Ok((eph, utc))
}

/// Decode MT1045. The week is returned modulo 4096 as broadcast.
pub fn read_mt1045(data: &[u8]) -> Result<GalileoEphemeris> {
    let msg = open(data, 1045)?;
    let mut b = Body::new(&msg);
    let eph = GalileoEphemeris {
        prn: b.u32(&DF252)?,
        week: b.u32(&DF289)?,
        iod_nav: b.u32(&DF290)?,
        sisa: b.u32(&DF291)?,
        idot: b.f64(&DF292)?,
        toc: b.f64(&DF293)?,
        af2: b.f64(&DF294)?,
        af1: b.f64(&DF295)?,
        af0: b.f64(&DF296)?,
        crs: b.f64(&DF297)?,
        delta_n: b.f64(&DF298)?,
        m0: b.f64(&DF299)?,
        cuc: b.f64(&DF300)?,
        ecc: b.f64(&DF301)?,
        cus: b.f64(&DF302)?,
        sqrt_a: b.f64(&DF303)?,
        toe: b.f64(&DF304)?,
        cic: b.f64(&DF305)?,
        omega0: b.f64(&DF306)?,
        cis: b.f64(&DF307)?,
        i0: b.f64(&DF308)?,
        crc: b.f64(&DF309)?,
        omega: b.f64(&DF310)?,
        omega_dot: b.f64(&DF311)?,
        bgd_e1e5a: b.f64(&DF312)?,
        e5a_hs: b.u32(&DF314)?,
        e5a_dvs: b.bool(&DF315)?,
    };
    debug!(prn = eph.prn, iod_nav = eph.iod_nav, "decoded MT1045");
    Ok(eph)
}

// ---------------------------------------------------------------------------
// MSM header
// ---------------------------------------------------------------------------

/// Header of a received MSM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsmHeader {
    pub message_type: u16,
    pub constellation: Constellation,
    /// MSM variant 1..=7.
    pub variant: u8,
    pub station_id: u16,
    /// Milliseconds of week (GPS, Galileo) or of day (GLONASS).
    pub epoch_ms: u64,
    /// GLONASS day of week.
    pub day_of_week: Option<u8>,
    pub more_messages: bool,
    pub satellites: Vec<u32>,
    pub signals: Vec<u32>,
    /// Number of set cell mask bits.
    pub cells: usize,
}

/// Constellation and variant of an MSM message number.
pub fn msm_kind(message_type: u16) -> Option<(Constellation, u8)> {
    [Constellation::Gps, Constellation::Glonass, Constellation::Galileo]
        .into_iter()
        .find_map(|c| {
            let n = message_type.checked_sub(c.msm_base())?;
            (1..=7).contains(&n).then_some((c, n as u8))
        })
}

/// Decode the header and masks of any MSM1-7 message.
pub fn read_msm_header(data: &[u8]) -> Result<MsmHeader> {
    let msg = parse_message(data)?;
    let message_type = msg.message_type().ok_or(RtcmError::Truncated(0))?;
    let (constellation, variant) = msm_kind(message_type).ok_or(RtcmError::UnexpectedType {
        expected: 1077,
        actual: message_type,
    })?;

    let mut b = Body::new(&msg);
    let station_id = b.u64(&DF003)? as u16;
    let (day_of_week, epoch_ms) = match constellation {
        Constellation::Glonass => (Some(b.u64(&DF416)? as u8), b.u64(&DF034)?),
        Constellation::Gps => (None, b.u64(&DF004)?),
        Constellation::Galileo => (None, b.u64(&DF248)?),
    };
    let more_messages = b.bool(&DF393)?;
    b.skip(3 + 7 + 2 + 2 + 1 + 3)?;
    let sat_mask = b.u64(&DF394)?;
    let sig_mask = b.u64(&DF395)?;

    let satellites: Vec<u32> = (1..=64).filter(|id| sat_mask >> (64 - id) & 1 == 1).collect();
    let signals: Vec<u32> = (1..=32).filter(|id| sig_mask >> (32 - id) & 1 == 1).collect();
    let ncell = satellites.len() * signals.len();
    if ncell > 64 {
        return Err(RtcmError::InvalidLength {
            declared: ncell,
            actual: 64,
        });
    }
    let mut cells = 0;
    for _ in 0..ncell {
        if b.r.get_bool().ok_or_else(|| b.truncated())? {
            cells += 1;
        }
    }

    Ok(MsmHeader {
        message_type,
        constellation,
        variant,
        station_id,
        epoch_ms,
        day_of_week,
        more_messages,
        satellites,
        signals,
        cells,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Any message this crate knows how to decode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Decoded {
    Station(StationPosition),
    Antenna(AntennaDescriptor),
    Text(TextMessage),
    GpsEphemeris(GpsEphemeris),
    GlonassEphemeris {
        ephemeris: GlonassEphemeris,
        utc: GlonassUtcModel,
    },
    GalileoEphemeris(GalileoEphemeris),
    Msm(MsmHeader),
}

/// Decode a validated frame. Returns `None` for message types without a
/// decoder and for bodies that fail to decode.
pub fn decode(msg: &RtcmMessage) -> Option<Decoded> {
    let data = msg.as_bytes();
    let mt = msg.message_type()?;
    let decoded = match mt {
        1005 => read_mt1005(data).map(Decoded::Station),
        1006 => read_mt1006(data).map(Decoded::Station),
        1008 => read_mt1008(data).map(Decoded::Antenna),
        1029 => read_mt1029(data).map(Decoded::Text),
        1019 => read_mt1019(data).map(Decoded::GpsEphemeris),
        1020 => read_mt1020(data).map(|(ephemeris, utc)| Decoded::GlonassEphemeris { ephemeris, utc }),
        1045 => read_mt1045(data).map(Decoded::GalileoEphemeris),
        _ if msm_kind(mt).is_some() => read_msm_header(data).map(Decoded::Msm),
        _ => return None,
    };
    match decoded {
        Ok(d) => Some(d),
        Err(e) => {
            debug!(msg_type = mt, len = data.len() - HEADER_LEN, "decode failed: {e}");
            None
        }
    }
}
