//! Fixed-width bit fields and the conversions around them.
//!
//! Encoders are total: out-of-range values saturate to the nearest
//! representable value. Decoders over symbol strings validate their input and
//! report `RtcmError::InvalidSymbols` rather than panicking.

use crate::types::{RtcmError, Result};

/// Integer representation of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unsigned,
    TwosComplement,
    /// Leading sign bit followed by the magnitude (GLONASS navigation fields).
    SignMagnitude,
}

/// An encoded field: `width` bits of `value`, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    value: u64,
    width: u32,
}

impl Field {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn to_bin_string(&self) -> String {
        format!("{:0w$b}", self.value, w = self.width as usize)
    }
}

fn check_width(width: u32) {
    assert!(
        (1..=64).contains(&width),
        "field width must be within 1..=64, got {width}"
    );
}

fn max_unsigned(width: u32) -> u64 {
    if width == 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn signed_range(width: u32) -> (i64, i64) {
    if width == 64 {
        (i64::MIN, i64::MAX)
    } else {
        (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1)
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

/// Unsigned field; saturates at `2^width - 1`.
pub fn to_bits(value: u64, width: u32) -> Field {
    check_width(width);
    Field {
        value: value.min(max_unsigned(width)),
        width,
    }
}

/// Two's complement field; saturates to `[-2^(w-1), 2^(w-1) - 1]`.
pub fn to_bits_signed(value: i64, width: u32) -> Field {
    check_width(width);
    let (min, max) = signed_range(width);
    Field {
        value: (value.clamp(min, max) as u64) & max_unsigned(width),
        width,
    }
}

/// Sign-magnitude field; the magnitude saturates at `2^(w-1) - 1`.
pub fn to_bits_sign_magnitude(value: i64, width: u32) -> Field {
    check_width(width);
    assert!(width >= 2, "sign-magnitude field needs at least 2 bits");
    let magnitude = value.unsigned_abs().min(max_unsigned(width - 1));
    let sign = u64::from(value < 0 && magnitude != 0);
    Field {
        value: (sign << (width - 1)) | magnitude,
        width,
    }
}

/// Integer encoding of `value` in the given representation.
pub fn to_bits_int(value: i64, width: u32, encoding: Encoding) -> Field {
    match encoding {
        Encoding::Unsigned => to_bits(value.max(0) as u64, width),
        Encoding::TwosComplement => to_bits_signed(value, width),
        Encoding::SignMagnitude => to_bits_sign_magnitude(value, width),
    }
}

/// Scaled encoding: `value / resolution` rounded to nearest, ties away from zero.
pub fn to_bits_scaled(value: f64, width: u32, resolution: f64, encoding: Encoding) -> Field {
    let scaled = (value / resolution).round();
    match encoding {
        // `as` saturates and maps NaN to zero
        Encoding::Unsigned => to_bits(scaled as u64, width),
        _ => to_bits_int(scaled as i64, width, encoding),
    }
}

/// `width` zero bits.
pub fn reserved(width: u32) -> Field {
    to_bits(0, width)
}

// ---------------------------------------------------------------------------
// Raw integer helpers
// ---------------------------------------------------------------------------

/// Interpret the low `width` bits of `raw` as two's complement.
pub fn sign_extend(raw: u64, width: u32) -> i64 {
    check_width(width);
    let shift = 64 - width;
    ((raw << shift) as i64) >> shift
}

/// Interpret the low `width` bits of `raw` as sign-magnitude.
pub fn sign_magnitude(raw: u64, width: u32) -> i64 {
    check_width(width);
    let magnitude = (raw & max_unsigned(width - 1)) as i64;
    if width > 1 && (raw >> (width - 1)) & 1 == 1 {
        -magnitude
    } else {
        magnitude
    }
}

// ---------------------------------------------------------------------------
// Binary-digit strings
// ---------------------------------------------------------------------------

fn invalid(kind: &'static str, input: &str) -> RtcmError {
    RtcmError::InvalidSymbols {
        kind,
        input: input.to_string(),
    }
}

fn parse_binary(bits: &str) -> Result<(u64, u32)> {
    if bits.is_empty() || bits.len() > 64 || !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid("binary", bits));
    }
    let value = u64::from_str_radix(bits, 2).map_err(|_| invalid("binary", bits))?;
    Ok((value, bits.len() as u32))
}

pub fn bits_to_uint(bits: &str) -> Result<u64> {
    parse_binary(bits).map(|(value, _)| value)
}

/// Two's complement interpretation.
pub fn bits_to_int(bits: &str) -> Result<i64> {
    parse_binary(bits).map(|(value, width)| sign_extend(value, width))
}

/// Sign-magnitude interpretation.
pub fn bits_to_sint(bits: &str) -> Result<i64> {
    parse_binary(bits).map(|(value, width)| sign_magnitude(value, width))
}

/// Two's complement value times `resolution`.
pub fn bits_to_double(bits: &str, resolution: f64) -> Result<f64> {
    Ok(bits_to_int(bits)? as f64 * resolution)
}

/// Uppercase hex of a binary-digit string. A length that is not a multiple of
/// four is left-padded with zeros.
pub fn bin_to_hex(bits: &str) -> Result<String> {
    if !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid("binary", bits));
    }
    let pad = (4 - bits.len() % 4) % 4;
    let padded = format!("{}{}", "0".repeat(pad), bits);
    let mut out = String::with_capacity(padded.len() / 4);
    for chunk in padded.as_bytes().chunks(4) {
        let nibble = chunk.iter().fold(0u32, |acc, &b| (acc << 1) | u32::from(b == b'1'));
        // nibble < 16
        out.push(char::from_digit(nibble, 16).unwrap_or('0').to_ascii_uppercase());
    }
    Ok(out)
}

pub fn hex_to_bin(hex: &str) -> Result<String> {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = c.to_digit(16).ok_or_else(|| invalid("hex", hex))?;
        out.push_str(&format!("{nibble:04b}"));
    }
    Ok(out)
}

/// Pack a binary-digit string 8 bits per byte, MSB first. A length that is
/// not a multiple of eight is left-padded with zeros.
pub fn bin_to_binary_data(bits: &str) -> Result<Vec<u8>> {
    if !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid("binary", bits));
    }
    let pad = (8 - bits.len() % 8) % 8;
    let padded = format!("{}{}", "0".repeat(pad), bits);
    Ok(padded
        .as_bytes()
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b == b'1')))
        .collect())
}

pub fn binary_data_to_bin(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:08b}")).collect()
}

pub fn hex_to_uint(hex: &str) -> Result<u64> {
    if hex.is_empty() || hex.len() > 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid("hex", hex));
    }
    u64::from_str_radix(hex, 16).map_err(|_| invalid("hex", hex))
}

/// Two's complement over the `4 * len` bits the string spans.
pub fn hex_to_int(hex: &str) -> Result<i64> {
    let raw = hex_to_uint(hex)?;
    Ok(sign_extend(raw, hex.len() as u32 * 4))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Accumulates fields MSB first into a byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: Field) -> &mut Self {
        for i in (0..field.width).rev() {
            self.push_bit((field.value >> i) & 1 == 1);
        }
        self
    }

    pub fn push_bit(&mut self, bit: bool) -> &mut Self {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
        self
    }

    pub fn append(&mut self, other: &BitWriter) -> &mut Self {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
            return self;
        }
        for i in 0..other.len {
            self.push_bit(other.bytes[i / 8] & (0x80 >> (i % 8)) != 0);
        }
        self
    }

    /// Number of bits written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes needed to hold the bits, trailing bits zero.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn to_bin_string(&self) -> String {
        let mut s = binary_data_to_bin(&self.bytes);
        s.truncate(self.len);
        s
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read `width` bits at bit offset `pos`, MSB first.
pub fn get_bits(data: &[u8], pos: usize, width: u32) -> Option<u64> {
    check_width(width);
    let end = pos.checked_add(width as usize)?;
    if end > data.len() * 8 {
        return None;
    }
    let mut value = 0u64;
    for i in pos..end {
        value = (value << 1) | u64::from(data[i / 8] >> (7 - i % 8) & 1);
    }
    Some(value)
}

/// Sequential, bounds-checked reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        BitReader { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    pub fn skip(&mut self, width: usize) -> Option<()> {
        if width > self.remaining() {
            return None;
        }
        self.pos += width;
        Some(())
    }

    pub fn get_uint(&mut self, width: u32) -> Option<u64> {
        let value = get_bits(self.data, self.pos, width)?;
        self.pos += width as usize;
        Some(value)
    }

    pub fn get_int(&mut self, width: u32) -> Option<i64> {
        self.get_uint(width).map(|raw| sign_extend(raw, width))
    }

    pub fn get_sign_magnitude(&mut self, width: u32) -> Option<i64> {
        self.get_uint(width).map(|raw| sign_magnitude(raw, width))
    }

    pub fn get_bool(&mut self) -> Option<bool> {
        self.get_uint(1).map(|b| b == 1)
    }

    pub fn get(&mut self, width: u32, encoding: Encoding) -> Option<i64> {
        match encoding {
            Encoding::Unsigned => self.get_uint(width).map(|v| v as i64),
            Encoding::TwosComplement => self.get_int(width),
            Encoding::SignMagnitude => self.get_sign_magnitude(width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bits_unsigned() {
        assert_eq!(to_bits(5, 4).to_bin_string(), "0101");
        assert_eq!(to_bits(1005, 12).value(), 1005);
    }

    #[test]
    fn test_to_bits_saturates() {
        assert_eq!(to_bits(300, 8).value(), 255);
        assert_eq!(to_bits_signed(200, 8).value(), 0x7F);
        assert_eq!(to_bits_signed(-200, 8).value(), 0x80);
        assert_eq!(to_bits_sign_magnitude(-1000, 5).to_bin_string(), "11111");
        assert_eq!(to_bits_scaled(-1.0, 8, 0.25, Encoding::Unsigned).value(), 0);
    }

    #[test]
    fn test_full_width_fields() {
        assert_eq!(to_bits(u64::MAX, 64).value(), u64::MAX);
        assert_eq!(sign_extend(to_bits_signed(-1, 64).value(), 64), -1);
    }

    #[test]
    #[should_panic(expected = "field width")]
    fn test_zero_width_rejected() {
        to_bits(0, 0);
    }

    #[test]
    fn test_twos_complement() {
        let f = to_bits_signed(-3, 6);
        assert_eq!(f.to_bin_string(), "111101");
        assert_eq!(bits_to_int("111101").unwrap(), -3);
    }

    #[test]
    fn test_sign_magnitude() {
        let f = to_bits_sign_magnitude(-3, 6);
        assert_eq!(f.to_bin_string(), "100011");
        assert_eq!(bits_to_sint("100011").unwrap(), -3);
        // negative zero reads back as zero
        assert_eq!(bits_to_sint("100000").unwrap(), 0);
        assert_eq!(to_bits_sign_magnitude(0, 6).to_bin_string(), "000000");
    }

    #[test]
    fn test_rounding_ties_away_from_zero() {
        assert_eq!(to_bits_scaled(2.5, 8, 1.0, Encoding::TwosComplement).value(), 3);
        let neg = to_bits_scaled(-2.5, 8, 1.0, Encoding::TwosComplement);
        assert_eq!(sign_extend(neg.value(), 8), -3);
        let sm = to_bits_scaled(-0.5, 8, 1.0, Encoding::SignMagnitude);
        assert_eq!(sign_magnitude(sm.value(), 8), -1);
    }

    #[test]
    fn test_bits_to_double() {
        assert_eq!(bits_to_double("1111", 0.5).unwrap(), -0.5);
        assert_eq!(bits_to_double("0110", 0.25).unwrap(), 1.5);
    }

    #[test]
    fn test_invalid_symbols() {
        assert!(matches!(bits_to_uint("0120"), Err(RtcmError::InvalidSymbols { .. })));
        assert!(bits_to_uint("").is_err());
        assert!(bits_to_uint(&"1".repeat(65)).is_err());
        assert!(hex_to_bin("D3G0").is_err());
        assert!(bin_to_hex("10a1").is_err());
        assert!(bin_to_binary_data("2").is_err());
    }

    #[test]
    fn test_hex_and_binary_strings() {
        assert_eq!(hex_to_bin("D3").unwrap(), "11010011");
        assert_eq!(bin_to_hex("11010011").unwrap(), "D3");
        assert_eq!(bin_to_hex("111").unwrap(), "7");
        assert_eq!(bin_to_hex("100000000").unwrap(), "100");
        assert_eq!(hex_to_uint("3ED").unwrap(), 1005);
        assert_eq!(hex_to_int("FFFE").unwrap(), -2);
        assert_eq!(hex_to_int("7F").unwrap(), 127);
    }

    #[test]
    fn test_binary_data_packing() {
        assert_eq!(bin_to_binary_data("1101001100000000").unwrap(), vec![0xD3, 0x00]);
        assert_eq!(bin_to_binary_data("1").unwrap(), vec![0x01]);
        assert_eq!(binary_data_to_bin(&[0xD3, 0x01]), "1101001100000001");
    }

    #[test]
    fn test_writer_packs_msb_first() {
        let mut w = BitWriter::new();
        w.push(to_bits(0xD3, 8)).push(to_bits(0, 6)).push(to_bits(19, 10));
        assert_eq!(w.len(), 24);
        assert_eq!(w.as_bytes(), &[0xD3, 0x00, 0x13]);
    }

    #[test]
    fn test_writer_pads_with_zeros() {
        let mut w = BitWriter::new();
        w.push(to_bits(0b101, 3));
        assert_eq!(w.byte_len(), 1);
        assert_eq!(w.to_bin_string(), "101");
        assert_eq!(w.into_bytes(), vec![0b1010_0000]);
    }

    #[test]
    fn test_writer_append_unaligned() {
        let mut a = BitWriter::new();
        a.push(to_bits(1, 1));
        let mut b = BitWriter::new();
        b.push(to_bits(0xFF, 8)).push(to_bits(0, 2));
        a.append(&b);
        assert_eq!(a.to_bin_string(), "11111111100");
    }

    #[test]
    fn test_reader_sequence() {
        let data = [0b1011_0011, 0b1000_0001];
        let mut r = BitReader::new(&data);
        assert_eq!(r.get_uint(3), Some(0b101));
        assert_eq!(r.get_int(4), Some(-7));
        assert_eq!(r.get_sign_magnitude(3), Some(-2));
        assert_eq!(r.get_bool(), Some(false));
        assert_eq!(r.remaining(), 5);
        assert_eq!(r.get_uint(6), None);
        assert_eq!(r.get_uint(5), Some(1));
    }

    #[test]
    fn test_get_bits_bounds() {
        assert_eq!(get_bits(&[0xFF], 0, 8), Some(0xFF));
        assert_eq!(get_bits(&[0xFF], 1, 8), None);
        assert_eq!(get_bits(&[], 0, 1), None);
    }
}
