//! Incremental frame scanner for raw RTCM byte streams.
//!
//! Bytes arrive in arbitrary chunks (serial reads, TCP segments, file
//! blocks). The scanner hunts for the 0xD3 preamble, waits until the
//! declared frame is complete, and only yields frames whose CRC checks out.
//! On a bad candidate it skips one byte and hunts again.

use tracing::{debug, warn};

use crate::crc::verify;
use crate::frame::{body_length, parse_message, RtcmMessage, CRC_LEN, HEADER_LEN, PREAMBLE};

#[derive(Debug, Default)]
pub struct FrameScanner {
    buf: Vec<u8>,
    frames: u64,
    discarded: u64,
    crc_failures: u64,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete, CRC-valid frame in the buffer.
    pub fn next_frame(&mut self) -> Option<RtcmMessage> {
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == PREAMBLE) else {
                self.discard(self.buf.len());
                return None;
            };
            self.discard(start);

            if self.buf.len() < HEADER_LEN {
                return None;
            }
            // the 6 bits after the preamble are reserved and always zero
            if self.buf[1] & 0xFC != 0 {
                self.discard(1);
                continue;
            }
            let total = HEADER_LEN + body_length(&self.buf)? + CRC_LEN;
            if self.buf.len() < total {
                return None;
            }
            if verify(&self.buf[..total]) {
                if let Ok(msg) = parse_message(&self.buf[..total]) {
                    self.buf.drain(..total);
                    self.frames += 1;
                    return Some(msg);
                }
            }
            self.crc_failures += 1;
            warn!(candidate_len = total, "CRC failure in stream, resynchronising");
            self.discard(1);
        }
    }

    /// Push `data` and collect every frame it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<RtcmMessage> {
        self.push(data);
        std::iter::from_fn(|| self.next_frame()).collect()
    }

    fn discard(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug!(bytes = n, "discarding bytes outside frames");
        self.buf.drain(..n);
        self.discarded += n as u64;
    }

    /// Frames yielded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes dropped while hunting for a preamble.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn crc_failures(&self) -> u64 {
        self.crc_failures
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::{mt1005, mt1029, StationPosition};

    fn frame_a() -> Vec<u8> {
        mt1005(&StationPosition::new(1, 100.0, 200.0, 300.0)).into_bytes()
    }

    fn frame_b() -> Vec<u8> {
        mt1029(2, 2100, 1000.0, "hello").into_bytes()
    }

    #[test]
    fn test_frames_between_garbage() {
        let mut data = vec![0x00, 0x12, 0xD3, 0xFF];
        data.extend(frame_a());
        data.extend([0x55, 0x66]);
        data.extend(frame_b());

        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&data);
        let types: Vec<u16> = frames.iter().filter_map(|f| f.message_type()).collect();
        assert_eq!(types, vec![1005, 1029]);
        assert_eq!(scanner.discarded(), 6);
        assert_eq!(scanner.buffered(), 0);
        assert_eq!(scanner.frames(), 2);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let data = frame_a();
        let mut scanner = FrameScanner::new();
        assert!(scanner.feed(&data[..2]).is_empty());
        assert!(scanner.feed(&data[2..10]).is_empty());
        assert_eq!(scanner.buffered(), 10);
        let frames = scanner.feed(&data[10..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &data[..]);
    }

    #[test]
    fn test_corrupt_frame_is_skipped() {
        let mut bad = frame_a();
        let n = bad.len();
        bad[n - 1] ^= 0xFF;
        let mut data = bad;
        data.extend(frame_b());

        let mut scanner = FrameScanner::new();
        let frames = scanner.feed(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_type(), Some(1029));
        assert_eq!(scanner.crc_failures(), 1);
    }

    #[test]
    fn test_empty_input() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.feed(&[]).is_empty());
        assert!(scanner.next_frame().is_none());
    }
}
