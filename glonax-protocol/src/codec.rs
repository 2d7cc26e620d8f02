//! Bounded reader and writer for message payloads.
//!
//! Every message codec reads through [`PayloadReader`], which never reads
//! past the end of the payload slice and reports a short payload as
//! [`CodecError::Truncated`].

use crate::error::CodecError;
use bytes::{BufMut, Bytes, BytesMut};

/// Maximum byte length of a length-prefixed string.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Cursor over a payload slice.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consumes exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consumes all remaining bytes.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    /// Reads a strict 0/1 boolean byte.
    pub fn bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidEnumValue { field, value }),
        }
    }

    /// Reads a u16 BE length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String, CodecError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        utf8(bytes)
    }
}

/// Decodes a UTF-8 byte slice into an owned string.
pub fn utf8(bytes: &[u8]) -> Result<String, CodecError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8)
}

/// Growable payload buffer with big-endian helpers.
#[derive(Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16(value);
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64(value);
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf.put_f32(value);
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64(value);
        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_slice(value);
        self
    }

    /// Writes a u16 BE length prefix followed by the UTF-8 bytes.
    pub fn string(&mut self, value: &str) -> Result<&mut Self, CodecError> {
        let len = value.len();
        if len > MAX_STRING_LEN {
            return Err(CodecError::FieldTooLarge {
                len,
                max: MAX_STRING_LEN,
            });
        }
        self.buf.put_u16(len as u16);
        self.buf.put_slice(value.as_bytes());
        Ok(self)
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_truncated() {
        let mut reader = PayloadReader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.u16().unwrap(), 0x0102);
        assert_eq!(
            reader.u16(),
            Err(CodecError::Truncated {
                needed: 4,
                available: 3
            })
        );
        // A failed read consumes nothing
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.u8().unwrap(), 0x03);
    }

    #[test]
    fn test_string_prefix_longer_than_payload() {
        // Prefix claims 10 bytes, only 3 follow
        let mut reader = PayloadReader::new(&[0x00, 0x0A, b'a', b'b', b'c']);
        assert!(matches!(
            reader.string(),
            Err(CodecError::Truncated { needed: 12, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = PayloadReader::new(&[0x00, 0x02, 0xC3, 0x28]);
        assert_eq!(reader.string(), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_strict_bool() {
        let mut reader = PayloadReader::new(&[0x00, 0x01, 0x02]);
        assert!(!reader.bool("flag").unwrap());
        assert!(reader.bool("flag").unwrap());
        assert_eq!(
            reader.bool("flag"),
            Err(CodecError::InvalidEnumValue {
                field: "flag",
                value: 0x02
            })
        );
    }

    #[test]
    fn test_writer_string_limits() {
        let mut writer = PayloadWriter::default();
        assert!(writer.string(&"x".repeat(MAX_STRING_LEN)).is_ok());

        let mut writer = PayloadWriter::default();
        assert_eq!(
            writer.string(&"x".repeat(MAX_STRING_LEN + 1)).err(),
            Some(CodecError::FieldTooLarge {
                len: MAX_STRING_LEN + 1,
                max: MAX_STRING_LEN
            })
        );
    }

    #[test]
    fn test_writer_big_endian() {
        let mut writer = PayloadWriter::default();
        writer.u8(0x01).u16(0x0203).f32(1.0);
        assert_eq!(
            writer.finish().as_ref(),
            &[0x01, 0x02, 0x03, 0x3F, 0x80, 0x00, 0x00]
        );
    }
}
