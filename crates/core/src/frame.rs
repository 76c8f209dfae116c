// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Binary framing for the live capture protocol.
//!
//! Each frame is a fixed 14-byte little-endian header followed by its payload:
//!
//! ```text
//! +------+--------+------------------+-------------+-----------------+
//! | type | stream | pts_us (i64 LE)  | len (u32 LE)| payload (len B) |
//! +------+--------+------------------+-------------+-----------------+
//! ```

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;

const HEADER_LEN: usize = 14;

/// Message type of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Audio,
    Screenshot,
    Start,
    Stop,
}

impl FrameType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Audio),
            2 => Some(Self::Screenshot),
            3 => Some(Self::Start),
            4 => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Which capture stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    System,
    Mic,
}

impl StreamId {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::System),
            1 => Some(Self::Mic),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Mic => "mic",
        }
    }
}

/// One parsed protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub stream: StreamId,
    pub pts_us: i64,
    pub payload: Bytes,
}

/// Errors specific to parsing the framed protocol.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended cleanly (possibly mid-header or mid-payload) because the
    /// producer closed its end. Callers treat this identically to an orderly
    /// `STOP`; it is never reported as an `error` event.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// An unrecognised frame-type or stream-id byte: a genuine protocol fault.
    #[error("invalid frame header: {0}")]
    InvalidHeader(String),
    /// A real I/O failure distinct from end-of-stream.
    #[error("I/O error reading frame: {0}")]
    Io(#[from] io::Error),
}

/// Fills `buf` from `reader`, returning the number of bytes actually read
/// before either filling `buf` or hitting EOF. `read_exact` alone can't
/// distinguish a clean stream end from a short read partway through `buf`:
/// it reports `UnexpectedEof` either way.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, io::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before any bytes of a new
/// frame are read. A partial header or payload (the producer closed mid-frame)
/// surfaces as `Err(FrameError::UnexpectedEnd)`; callers must treat that the
/// same as `Ok(None)` (see [`FrameError::UnexpectedEnd`]), while any other
/// `Err` is a fatal protocol error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Frame>, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    match fill_or_eof(reader, &mut header) {
        Ok(n) if n == HEADER_LEN => {}
        Ok(0) => return Ok(None),
        Ok(_) => return Err(FrameError::UnexpectedEnd),
        Err(e) => return Err(FrameError::Io(e)),
    }

    let mut cursor = &header[..];
    let type_byte = cursor.read_u8().map_err(FrameError::Io)?;
    let stream_byte = cursor.read_u8().map_err(FrameError::Io)?;
    let pts_us = cursor.read_i64::<LittleEndian>().map_err(FrameError::Io)?;
    let payload_len = cursor.read_u32::<LittleEndian>().map_err(FrameError::Io)?;

    let frame_type = FrameType::from_byte(type_byte)
        .ok_or_else(|| FrameError::InvalidHeader(format!("unknown frame type {type_byte}")))?;
    let stream = StreamId::from_byte(stream_byte)
        .ok_or_else(|| FrameError::InvalidHeader(format!("unknown stream id {stream_byte}")))?;

    let mut payload = vec![0u8; payload_len as usize];
    match fill_or_eof(reader, &mut payload) {
        Ok(n) if n == payload.len() => {}
        Ok(_) => return Err(FrameError::UnexpectedEnd),
        Err(e) => return Err(FrameError::Io(e)),
    }

    Ok(Some(Frame { frame_type, stream, pts_us, payload: Bytes::from(payload) }))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(frame_type: u8, stream: u8, pts_us: i64, payload: &[u8]) -> Vec<u8> {
        use byteorder::WriteBytesExt;
        let mut buf = Vec::new();
        buf.write_u8(frame_type).unwrap();
        buf.write_u8(stream).unwrap();
        buf.write_i64::<LittleEndian>(pts_us).unwrap();
        buf.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn reads_a_well_formed_frame() {
        let bytes = encode(1, 0, 42_000, b"hello");
        let mut cursor = Cursor::new(bytes);
        let frame = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(frame.frame_type, FrameType::Audio);
        assert_eq!(frame.stream, StreamId::System);
        assert_eq!(frame.pts_us, 42_000);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[test]
    fn clean_eof_before_any_bytes_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn partial_header_is_unexpected_end() {
        let mut cursor = Cursor::new(vec![1u8, 0u8, 3u8]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEnd));
    }

    #[test]
    fn partial_payload_is_unexpected_end() {
        let mut bytes = encode(1, 1, 0, b"0123456789");
        bytes.truncate(bytes.len() - 3);
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEnd));
    }

    #[test]
    fn unknown_frame_type_is_invalid_header() {
        let bytes = encode(9, 0, 0, b"");
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, FrameError::InvalidHeader(_)));
    }

    #[test]
    fn reads_back_to_back_frames() {
        let mut bytes = encode(3, 0, 0, b"{}");
        bytes.extend(encode(1, 0, 1000, b"abcd"));
        let mut cursor = Cursor::new(bytes);
        let f1 = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(f1.frame_type, FrameType::Start);
        let f2 = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(f2.frame_type, FrameType::Audio);
        assert_eq!(f2.pts_us, 1000);
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }
}
