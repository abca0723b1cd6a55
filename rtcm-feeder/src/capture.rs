//! Capture and file I/O for RTCM streams.
//!
//! Input modes:
//! - `FrameReader`: hex-encoded frames, one per line
//! - `pump`:        raw bytes from any `Read` (capture file, TCP socket),
//!                  framed with `FrameScanner`

use std::fs;
use std::io::{self, Read};

use tracing::debug;

use rtcm_core::frame::{parse_hex, RtcmMessage, CRC_LEN, HEADER_LEN, MAX_BODY_LEN};
use rtcm_core::stream::FrameScanner;

/// Bytes read per `read` call.
pub const CHUNK_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Hex Frame Reader
// ---------------------------------------------------------------------------

/// Read hex-encoded RTCM frames from a text file.
pub struct FrameReader {
    path: String,
}

impl FrameReader {
    pub fn new(path: &str) -> Self {
        FrameReader {
            path: path.to_string(),
        }
    }

    /// Read every line that holds a CRC-valid frame. Returns the frames and
    /// the number of rejected lines.
    pub fn read_all(&self) -> io::Result<(Vec<RtcmMessage>, u64)> {
        let content = fs::read_to_string(&self.path)?;
        let mut frames = Vec::new();
        let mut rejected = 0u64;

        for (i, line) in content.lines().enumerate() {
            let Some(hex) = clean_hex_line(line) else {
                continue;
            };
            match parse_hex(&hex) {
                Ok(msg) => frames.push(msg),
                Err(e) => {
                    debug!(line = i + 1, "rejected frame: {e}");
                    rejected += 1;
                }
            }
        }

        Ok((frames, rejected))
    }
}

/// Extract an RTCM hex frame from a line.
///
/// Handles plain hex, an optional `0x` prefix, spaces between bytes, and
/// surrounding whitespace.
pub fn clean_hex_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line
        .strip_prefix("0x")
        .or_else(|| line.strip_prefix("0X"))
        .unwrap_or(line);
    let hex: String = line.chars().filter(|c| !c.is_whitespace()).collect();

    if is_valid_hex(&hex) {
        return Some(hex.to_ascii_uppercase());
    }
    None
}

fn is_valid_hex(s: &str) -> bool {
    let min = 2 * (HEADER_LEN + CRC_LEN);
    let max = 2 * (HEADER_LEN + MAX_BODY_LEN + CRC_LEN);
    s.len() % 2 == 0
        && (min..=max).contains(&s.len())
        && s[..2].eq_ignore_ascii_case("D3")
        && s.chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Binary streams
// ---------------------------------------------------------------------------

/// Totals of one pumped stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub bytes: u64,
    pub frames: u64,
    pub discarded: u64,
    pub crc_failures: u64,
}

/// Read `src` to EOF in chunks, handing each complete frame to `on_frame`.
pub fn pump<R: Read>(mut src: R, mut on_frame: impl FnMut(RtcmMessage)) -> io::Result<StreamStats> {
    let mut scanner = FrameScanner::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes = 0u64;

    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        bytes += n as u64;
        for msg in scanner.feed(&buf[..n]) {
            on_frame(msg);
        }
    }

    if scanner.buffered() > 0 {
        debug!(bytes = scanner.buffered(), "incomplete frame at end of stream");
    }
    Ok(StreamStats {
        bytes,
        frames: scanner.frames(),
        discarded: scanner.discarded(),
        crc_failures: scanner.crc_failures(),
    })
}

/// Frame a binary capture file.
pub fn read_binary(path: &str) -> io::Result<(Vec<RtcmMessage>, StreamStats)> {
    let file = fs::File::open(path)?;
    let mut frames = Vec::new();
    let stats = pump(io::BufReader::new(file), |msg| frames.push(msg))?;
    Ok((frames, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
