//! Big-endian primitive reader and writer for the database stream.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, StructDbError};

/// Cursor over an in-memory database image.
pub struct DataReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> DataReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            len: buf.len(),
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(StructDbError::MalformedRecord(format!(
                "unexpected end of data at offset {} (needed {} bytes, {} left)",
                self.position(),
                needed,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    /// Reads a table or child count, rejecting negative values and counts
    /// that could not possibly fit in the remaining bytes.
    pub fn read_count(&mut self, what: &str, min_item_size: usize) -> Result<usize> {
        let offset = self.position();
        let count = self.read_i32()?;
        let count = usize::try_from(count).map_err(|_| {
            StructDbError::MalformedRecord(format!(
                "negative {} count {} at offset {}",
                what, count, offset
            ))
        })?;
        if count.saturating_mul(min_item_size) > self.remaining() {
            return Err(StructDbError::MalformedRecord(format!(
                "{} count {} at offset {} exceeds remaining data",
                what, count, offset
            )));
        }
        Ok(count)
    }

    /// Reads a null-terminated UTF-8 string.
    pub fn read_cstring(&mut self) -> Result<String> {
        let offset = self.position();
        let len = self.buf.iter().position(|&b| b == 0).ok_or_else(|| {
            StructDbError::MalformedRecord(format!("unterminated string at offset {}", offset))
        })?;
        let value = std::str::from_utf8(&self.buf[..len])
            .map_err(|e| {
                StructDbError::MalformedRecord(format!("invalid UTF-8 at offset {}: {}", offset, e))
            })?
            .to_string();
        self.buf.advance(len + 1);
        Ok(value)
    }
}

/// Append-only writer producing the database image.
#[derive(Debug, Default)]
pub struct DataWriter {
    buf: BytesMut,
}

impl DataWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Writes a collection length as `i32`.
    pub fn write_count(&mut self, what: &str, count: usize) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| {
            StructDbError::MalformedRecord(format!("{} count {} does not fit the format", what, count))
        })?;
        self.buf.put_i32(count);
        Ok(())
    }

    /// Writes a null-terminated string. A value containing NUL cannot be stored.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(StructDbError::MalformedRecord(format!(
                "string {:?} contains a NUL byte",
                value
            )));
        }
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    /// Consumes the writer and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
