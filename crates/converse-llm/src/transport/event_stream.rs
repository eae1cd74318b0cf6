//! Decoder for the `application/vnd.amazon.eventstream` framing used by streaming
//! Bedrock responses.
//!
//! Each frame is laid out as (all integers big endian):
//!
//! ```text
//! | total_len u32 | headers_len u32 | prelude_crc u32 | headers ... | payload ... | message_crc u32 |
//! ```
//!
//! `prelude_crc` covers the first 8 bytes, `message_crc` everything before it. Both are CRC-32
//! (IEEE).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{LlmError, Result};

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_FRAME_LEN: usize = PRELUDE_LEN + CRC_LEN;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Typed header value (wire type ids 0 through 9)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Bytes(Bytes),
    String(String),
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn type_id(&self) -> u8 {
        match self {
            Self::Bool(true) => 0,
            Self::Bool(false) => 1,
            Self::Byte(_) => 2,
            Self::Short(_) => 3,
            Self::Int(_) => 4,
            Self::Long(_) => 5,
            Self::Bytes(_) => 6,
            Self::String(_) => 7,
            Self::Timestamp(_) => 8,
            Self::Uuid(_) => 9,
        }
    }
}

/// One decoded event-stream message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Bytes,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }

    /// `event`, `exception` or `error`
    pub fn message_type(&self) -> Option<&str> {
        self.header_str(":message-type")
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header_str(":event-type")
    }

    pub fn exception_type(&self) -> Option<&str> {
        self.header_str(":exception-type")
    }
}

/// Incremental frame decoder: feed it arbitrary byte chunks, pull out whole frames
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: BytesMut,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Extract the next complete frame.
    ///
    /// Returns `None` until a whole frame is buffered. A corrupt frame yields an error and
    /// discards the buffer, since framing cannot be recovered after it.
    pub fn next_frame(&mut self) -> Option<Result<Frame>> {
        if self.buffer.len() < PRELUDE_LEN {
            return None;
        }

        let total_len = read_u32(&self.buffer[0..4]) as usize;
        let headers_len = read_u32(&self.buffer[4..8]) as usize;
        let prelude_crc = read_u32(&self.buffer[8..12]);

        if crc32(&self.buffer[..8]) != prelude_crc {
            return Some(Err(self.fail("prelude checksum mismatch".to_string())));
        }
        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&total_len) {
            return Some(Err(self.fail(format!("invalid frame length {total_len}"))));
        }
        if headers_len > total_len - MIN_FRAME_LEN {
            return Some(Err(self.fail(format!(
                "headers length {headers_len} exceeds frame length {total_len}"
            ))));
        }

        if self.buffer.len() < total_len {
            return None;
        }

        let frame = self.buffer.split_to(total_len).freeze();
        let crc_offset = total_len - CRC_LEN;
        if crc32(&frame[..crc_offset]) != read_u32(&frame[crc_offset..]) {
            return Some(Err(self.fail("message checksum mismatch".to_string())));
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = match parse_headers(&frame[PRELUDE_LEN..headers_end]) {
            Ok(headers) => headers,
            Err(e) => return Some(Err(self.fail(e))),
        };

        Some(Ok(Frame {
            headers,
            payload: frame.slice(headers_end..crc_offset),
        }))
    }

    /// Bytes buffered but not yet decoded
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn fail(&mut self, reason: String) -> LlmError {
        self.buffer.clear();
        LlmError::Decode(format!("event stream: {reason}"))
    }
}

/// Encode a frame. Used for tests and local fakes of the streaming endpoint.
///
/// Header names are limited to 255 bytes and string/bytes values to 65535 bytes.
pub fn encode_frame(headers: &[(&str, HeaderValue)], payload: &[u8]) -> Result<Bytes> {
    let mut header_bytes = BytesMut::new();
    for (name, value) in headers {
        let name_len = u8::try_from(name.len())
            .map_err(|_| LlmError::Encode(format!("header name `{name}` exceeds 255 bytes")))?;
        header_bytes.put_u8(name_len);
        header_bytes.put_slice(name.as_bytes());
        header_bytes.put_u8(value.type_id());
        match value {
            HeaderValue::Bool(_) => {}
            HeaderValue::Byte(v) => header_bytes.put_i8(*v),
            HeaderValue::Short(v) => header_bytes.put_i16(*v),
            HeaderValue::Int(v) => header_bytes.put_i32(*v),
            HeaderValue::Long(v) | HeaderValue::Timestamp(v) => header_bytes.put_i64(*v),
            HeaderValue::Bytes(v) => {
                header_bytes.put_u16(value_len(name, v.len())?);
                header_bytes.put_slice(v);
            }
            HeaderValue::String(v) => {
                header_bytes.put_u16(value_len(name, v.len())?);
                header_bytes.put_slice(v.as_bytes());
            }
            HeaderValue::Uuid(v) => header_bytes.put_slice(v),
        }
    }

    let total_len = MIN_FRAME_LEN + header_bytes.len() + payload.len();
    if total_len > MAX_FRAME_LEN {
        return Err(LlmError::Encode(format!(
            "frame of {total_len} bytes exceeds {MAX_FRAME_LEN}"
        )));
    }
    let mut out = BytesMut::with_capacity(total_len);
    out.put_u32(total_len as u32);
    out.put_u32(header_bytes.len() as u32);
    let prelude_crc = crc32(&out[..8]);
    out.put_u32(prelude_crc);
    out.put_slice(&header_bytes);
    out.put_slice(payload);
    let message_crc = crc32(&out);
    out.put_u32(message_crc);
    Ok(out.freeze())
}

fn value_len(name: &str, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        LlmError::Encode(format!("value of header `{name}` exceeds 65535 bytes"))
    })
}

fn parse_headers(mut buf: &[u8]) -> std::result::Result<Vec<(String, HeaderValue)>, String> {
    let mut headers = Vec::new();

    while !buf.is_empty() {
        let name_len = take(&mut buf, 1)?[0] as usize;
        let name = std::str::from_utf8(take(&mut buf, name_len)?)
            .map_err(|e| format!("header name is not UTF-8: {e}"))?
            .to_string();

        let value = match take(&mut buf, 1)?[0] {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(take(&mut buf, 1)?[0] as i8),
            3 => HeaderValue::Short(i16::from_be_bytes(take_array(&mut buf)?)),
            4 => HeaderValue::Int(i32::from_be_bytes(take_array(&mut buf)?)),
            5 => HeaderValue::Long(i64::from_be_bytes(take_array(&mut buf)?)),
            6 => {
                let len = u16::from_be_bytes(take_array(&mut buf)?) as usize;
                HeaderValue::Bytes(Bytes::copy_from_slice(take(&mut buf, len)?))
            }
            7 => {
                let len = u16::from_be_bytes(take_array(&mut buf)?) as usize;
                let s = std::str::from_utf8(take(&mut buf, len)?)
                    .map_err(|e| format!("header `{name}` is not UTF-8: {e}"))?;
                HeaderValue::String(s.to_string())
            }
            8 => HeaderValue::Timestamp(i64::from_be_bytes(take_array(&mut buf)?)),
            9 => HeaderValue::Uuid(take_array(&mut buf)?),
            other => return Err(format!("header `{name}` has unknown value type {other}")),
        };

        headers.push((name, value));
    }

    Ok(headers)
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> std::result::Result<&'a [u8], String> {
    if buf.len() < n {
        return Err("truncated header block".to_string());
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn take_array<const N: usize>(buf: &mut &[u8]) -> std::result::Result<[u8; N], String> {
    let mut out = [0u8; N];
    out.copy_from_slice(take(buf, N)?);
    Ok(out)
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_frame(payload: &[u8]) -> Bytes {
        encode_frame(
            &[
                (":message-type", HeaderValue::String("event".to_string())),
                (":event-type", HeaderValue::String("chunk".to_string())),
                (":content-type", HeaderValue::String("application/json".to_string())),
            ],
            payload,
        )
        .unwrap()
    }

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_decode_single_frame() {
        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&chunk_frame(br#"{"bytes":"e30="}"#));

        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.message_type(), Some("event"));
        assert_eq!(frame.event_type(), Some("chunk"));
        assert_eq!(&frame.payload[..], br#"{"bytes":"e30="}"#);
        assert!(decoder.next_frame().is_none());
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let encoded = chunk_frame(b"payload");
        let (first, second) = encoded.split_at(encoded.len() / 2);

        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&first[..5]);
        assert!(decoder.next_frame().is_none());
        decoder.extend(&first[5..]);
        assert!(decoder.next_frame().is_none());
        decoder.extend(second);

        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(&frame.payload[..], b"payload");
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&chunk_frame(b"one"));
        decoder.extend(&chunk_frame(b"two"));

        assert_eq!(&decoder.next_frame().unwrap().unwrap().payload[..], b"one");
        assert_eq!(&decoder.next_frame().unwrap().unwrap().payload[..], b"two");
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn test_corrupt_payload_fails_checksum() {
        let mut encoded = BytesMut::from(&chunk_frame(b"payload")[..]);
        let idx = encoded.len() - CRC_LEN - 1;
        encoded[idx] ^= 0xFF;

        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&encoded);

        let err = decoder.next_frame().unwrap().unwrap_err();
        assert!(matches!(err, LlmError::Decode(ref m) if m.contains("message checksum")));
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_corrupt_prelude_fails_early() {
        let mut encoded = BytesMut::from(&chunk_frame(b"payload")[..]);
        encoded[0] ^= 0x01;

        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&encoded[..PRELUDE_LEN]);

        let err = decoder.next_frame().unwrap().unwrap_err();
        assert!(matches!(err, LlmError::Decode(ref m) if m.contains("prelude")));
    }

    #[test]
    fn test_encode_rejects_oversized_headers() {
        let long_name = "n".repeat(256);
        let err = encode_frame(&[(long_name.as_str(), HeaderValue::Bool(true))], b"").unwrap_err();
        assert!(matches!(err, LlmError::Encode(ref m) if m.contains("255")));

        let long_value = HeaderValue::String("v".repeat(70_000));
        let err = encode_frame(&[("big", long_value)], b"").unwrap_err();
        assert!(matches!(err, LlmError::Encode(ref m) if m.contains("`big`")));

        let max_name = "n".repeat(255);
        assert!(encode_frame(&[(max_name.as_str(), HeaderValue::Byte(1))], b"").is_ok());
    }

    #[test]
    fn test_all_header_types() {
        let headers = [
            ("t", HeaderValue::Bool(true)),
            ("f", HeaderValue::Bool(false)),
            ("b", HeaderValue::Byte(-3)),
            ("s", HeaderValue::Short(-300)),
            ("i", HeaderValue::Int(70_000)),
            ("l", HeaderValue::Long(-5_000_000_000)),
            ("by", HeaderValue::Bytes(Bytes::from_static(b"\x00\x01"))),
            ("str", HeaderValue::String("hello".to_string())),
            ("ts", HeaderValue::Timestamp(1_700_000_000_000)),
            ("u", HeaderValue::Uuid([7u8; 16])),
        ];

        let mut decoder = EventStreamDecoder::new();
        decoder.extend(&encode_frame(&headers, b"").unwrap());
        let frame = decoder.next_frame().unwrap().unwrap();

        assert_eq!(frame.headers.len(), headers.len());
        for (name, value) in &headers {
            assert_eq!(frame.header(name), Some(value));
        }
        assert!(frame.payload.is_empty());
    }
}
