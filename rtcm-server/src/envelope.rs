//! The 6-byte "GS" transport envelope.
//!
//! ```text
//! 'G' 'S' d d d d | body (dddd bytes, 1..=1029)
//! ```
//!
//! The envelope wraps payloads (normally one framed RTCM message) between the
//! internal client and the server. It sits outside the RTCM framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Result, ServerError};

pub const HEADER_LEN: usize = 6;
/// Largest body: one maximum-size RTCM frame (3 + 1023 + 3 bytes).
pub const MAX_BODY_LEN: usize = 1029;
const TAG: &[u8; 2] = b"GS";

/// Header bytes announcing a body of `len` bytes.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_LEN]> {
    if len == 0 || len > MAX_BODY_LEN {
        return Err(ServerError::Envelope(format!("body length {len} outside 1..={MAX_BODY_LEN}")));
    }
    let mut header = [0u8; HEADER_LEN];
    header[..2].copy_from_slice(TAG);
    header[2..].copy_from_slice(format!("{len:04}").as_bytes());
    Ok(header)
}

/// Body length announced by a header.
pub fn decode_header(header: &[u8]) -> Result<usize> {
    if header.len() != HEADER_LEN {
        return Err(ServerError::Envelope(format!("header is {} bytes", header.len())));
    }
    if &header[..2] != TAG {
        return Err(ServerError::Envelope("missing GS tag".into()));
    }
    let digits = &header[2..];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(ServerError::Envelope("length is not numeric".into()));
    }
    let len = digits.iter().fold(0usize, |acc, d| acc * 10 + (d - b'0') as usize);
    if len == 0 || len > MAX_BODY_LEN {
        return Err(ServerError::Envelope(format!("body length {len} outside 1..={MAX_BODY_LEN}")));
    }
    Ok(len)
}

/// What a peer sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A well-formed envelope body.
    Body(Bytes),
    /// Six bytes that were not a valid header, passed on as text.
    Chatter(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec {
    /// Body length of a header already consumed.
    pending: Option<usize>,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Inbound;
    type Error = ServerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>> {
        let len = match self.pending {
            Some(len) => len,
            None => {
                if src.len() < HEADER_LEN {
                    return Ok(None);
                }
                match decode_header(&src[..HEADER_LEN]) {
                    Ok(len) => {
                        src.advance(HEADER_LEN);
                        self.pending = Some(len);
                        len
                    }
                    Err(_) => {
                        let raw = src.split_to(HEADER_LEN);
                        return Ok(Some(Inbound::Chatter(String::from_utf8_lossy(&raw).into_owned())));
                    }
                }
            }
        };

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }
        self.pending = None;
        Ok(Some(Inbound::Body(src.split_to(len).freeze())))
    }
}

impl Encoder<Bytes> for EnvelopeCodec {
    type Error = ServerError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        let header = encode_header(body.len())?;
        dst.reserve(HEADER_LEN + body.len());
        dst.put_slice(&header);
        dst.put_slice(&body);
        Ok(())
    }
}
