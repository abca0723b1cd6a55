//! Ephemeris messages: MT1019 (GPS), MT1020 (GLONASS), MT1045 (Galileo F/NAV).
//!
//! Each is a fixed single-satellite field sequence.

use crate::bits::{reserved, BitWriter};
use crate::ephemeris::{GalileoEphemeris, GlonassEphemeris, GlonassUtcModel, GpsEphemeris};
use crate::fields::*;
use crate::frame::{build_message, RtcmMessage};

pub const MT1019_BITS: usize = 488;
pub const MT1020_BITS: usize = 360;
pub const MT1045_BITS: usize = 496;

/// MT1019 GPS ephemeris.
pub fn mt1019(eph: &GpsEphemeris) -> RtcmMessage {
    let mut w = BitWriter::new();
    w.push(DF002.encode_uint(1019))
        .push(DF009.encode_uint(eph.prn as u64))
        .push(DF076.encode_uint((eph.week % 1024) as u64))
        .push(DF077.encode_uint(eph.sv_accuracy as u64))
        .push(DF078.encode_uint(eph.code_on_l2 as u64))
        .push(DF079.encode(eph.idot))
        .push(DF071.encode_uint(eph.iode as u64))
        .push(DF081.encode(eph.toc))
        .push(DF082.encode(eph.af2))
        .push(DF083.encode(eph.af1))
        .push(DF084.encode(eph.af0))
        .push(DF085.encode_uint(eph.iodc as u64))
        .push(DF086.encode(eph.crs))
        .push(DF087.encode(eph.delta_n))
        .push(DF088.encode(eph.m0))
        .push(DF089.encode(eph.cuc))
        .push(DF090.encode(eph.ecc))
        .push(DF091.encode(eph.cus))
        .push(DF092.encode(eph.sqrt_a))
        .push(DF093.encode(eph.toe))
        .push(DF094.encode(eph.cic))
        .push(DF095.encode(eph.omega0))
        .push(DF096.encode(eph.cis))
        .push(DF097.encode(eph.i0))
        .push(DF098.encode(eph.crc))
        .push(DF099.encode(eph.omega))
        .push(DF100.encode(eph.omega_dot))
        .push(DF101.encode(eph.tgd))
        .push(DF102.encode_uint(eph.sv_health as u64))
        .push(DF103.encode_bool(eph.l2_p_data_flag))
        .push(DF137.encode_bool(eph.fit_interval_flag));
    debug_assert_eq!(w.len(), MT1019_BITS);
    build_message(&w)
}

/// MT1020 GLONASS ephemeris with the GLONASS-UTC/GPS time parameters.
pub fn mt1020(eph: &GlonassEphemeris, utc: &GlonassUtcModel) -> RtcmMessage {
    let mut w = BitWriter::new();
    w.push(DF002.encode_uint(1020))
        .push(DF038.encode_uint(eph.slot as u64))
        .push(DF040.encode_uint(glonass_fcn_code(eph.fcn)))
        .push(DF104.encode_bool(eph.almanac_health))
        .push(DF105.encode_bool(eph.almanac_health_available))
        .push(DF106.encode_uint(eph.p1 as u64))
        .push(glonass_tk(eph.tk))
        .push(DF108.encode_bool(eph.bn_msb))
        .push(DF109.encode_bool(eph.p2))
        .push(DF110.encode(eph.tb))
        .push(DF111.encode(eph.xn_dot))
        .push(DF112.encode(eph.xn))
        .push(DF113.encode(eph.xn_ddot))
        .push(DF114.encode(eph.yn_dot))
        .push(DF115.encode(eph.yn))
        .push(DF116.encode(eph.yn_ddot))
        .push(DF117.encode(eph.zn_dot))
        .push(DF118.encode(eph.zn))
        .push(DF119.encode(eph.zn_ddot))
        .push(DF120.encode_bool(eph.p3))
        .push(DF121.encode(eph.gamma_n))
        .push(DF122.encode_uint(eph.p as u64))
        .push(DF123.encode_bool(eph.ln_third))
        .push(DF124.encode(eph.tau_n))
        .push(DF125.encode(eph.delta_tau_n))
        .push(DF126.encode_uint(eph.en as u64))
        .push(DF127.encode_bool(eph.p4))
        .push(DF128.encode_uint(eph.ft as u64))
        .push(DF129.encode_uint(eph.nt as u64))
        .push(DF130.encode_uint(eph.m as u64))
        .push(DF131.encode_bool(eph.additional_data))
        .push(DF132.encode_uint(utc.na as u64))
        .push(DF133.encode(utc.tau_c))
        .push(DF134.encode_uint(utc.n4 as u64))
        .push(DF135.encode(utc.tau_gps))
        .push(DF136.encode_bool(eph.ln_fifth))
        .push(reserved(7));
    debug_assert_eq!(w.len(), MT1020_BITS);
    build_message(&w)
}

/// MT1045 Galileo F/NAV ephemeris.
pub fn mt1045(eph: &GalileoEphemeris) -> RtcmMessage {
    let mut w = BitWriter::new();
    w.push(DF002.encode_uint(1045))
        .push(DF252.encode_uint(eph.prn as u64))
        .push(DF289.encode_uint((eph.week % 4096) as u64))
        .push(DF290.encode_uint(eph.iod_nav as u64))
        .push(DF291.encode_uint(eph.sisa as u64))
        .push(DF292.encode(eph.idot))
        .push(DF293.encode(eph.toc))
        .push(DF294.encode(eph.af2))
        .push(DF295.encode(eph.af1))
        .push(DF296.encode(eph.af0))
        .push(DF297.encode(eph.crs))
        .push(DF298.encode(eph.delta_n))
        .push(DF299.encode(eph.m0))
        .push(DF300.encode(eph.cuc))
        .push(DF301.encode(eph.ecc))
        .push(DF302.encode(eph.cus))
        .push(DF303.encode(eph.sqrt_a))
        .push(DF304.encode(eph.toe))
        .push(DF305.encode(eph.cic))
        .push(DF306.encode(eph.omega0))
        .push(DF307.encode(eph.cis))
        .push(DF308.encode(eph.i0))
        .push(DF309.encode(eph.crc))
        .push(DF310.encode(eph.omega))
        .push(DF311.encode(eph.omega_dot))
        .push(DF312.encode(eph.bgd_e1e5a))
        .push(DF314.encode_uint(eph.e5a_hs as u64))
        .push(DF315.encode_bool(eph.e5a_dvs))
        .push(reserved(7));
    debug_assert_eq!(w.len(), MT1045_BITS);
    build_message(&w)
}
