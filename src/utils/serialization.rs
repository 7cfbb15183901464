// Low-level pieces of the canonical wire format: little-endian integers,
// compact-size length prefixes and fixed-length hashes.
use crate::error::{ClientError, Result};
use crate::utils::HASH_LEN;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Append-only writer for the canonical encoding
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> WireWriter {
        WireWriter { buf: Vec::new() }
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_var_int(&mut self, value: u64) {
        match value {
            0..=0xfc => self.buf.push(value as u8),
            0xfd..=0xffff => {
                self.buf.push(0xfd);
                self.write_u16(value as u16);
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(0xfe);
                self.write_u32(value as u32);
            }
            _ => {
                self.buf.push(0xff);
                self.write_u64(value);
            }
        }
    }

    pub fn write_hash(&mut self, hash: &[u8; HASH_LEN]) {
        self.buf.extend_from_slice(hash);
    }

    /// Length-prefixed byte string
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_var_int(data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked reader over a borrowed buffer
pub struct WireReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> WireReader<'a> {
        WireReader {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    pub fn read_u8(&mut self, what: &str) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| truncated(what))
    }

    pub fn read_u16(&mut self, what: &str) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| truncated(what))
    }

    pub fn read_u32(&mut self, what: &str) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated(what))
    }

    pub fn read_u64(&mut self, what: &str) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| truncated(what))
    }

    /// Compact-size integer; non-minimal encodings are rejected so that
    /// every value has exactly one rendering.
    pub fn read_var_int(&mut self, what: &str) -> Result<u64> {
        let (value, min) = match self.read_u8(what)? {
            0xfd => (self.read_u16(what)? as u64, 0xfd),
            0xfe => (self.read_u32(what)? as u64, 0x1_0000),
            0xff => (self.read_u64(what)?, 0x1_0000_0000),
            n => (n as u64, 0),
        };
        if value < min {
            return Err(ClientError::decode(format!(
                "Non-canonical length prefix for {what}"
            )));
        }
        Ok(value)
    }

    /// Reads a length prefix and checks it against the bytes actually left.
    pub fn read_len(&mut self, what: &str) -> Result<usize> {
        let len = self.read_var_int(what)?;
        if len > self.remaining() as u64 {
            return Err(ClientError::decode(format!(
                "Length prefix for {what} ({len}) exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(len as usize)
    }

    /// Reads an element count. Every element takes at least `min_size` bytes,
    /// so counts that cannot fit are rejected before allocating.
    pub fn read_count(&mut self, what: &str, min_size: usize) -> Result<usize> {
        let count = self.read_var_int(what)?;
        if count.saturating_mul(min_size as u64) > self.remaining() as u64 {
            return Err(ClientError::decode(format!(
                "Count for {what} ({count}) exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(count as usize)
    }

    pub fn read_exact(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(truncated(what));
        }
        let start = self.cursor.position() as usize;
        let bytes = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&bytes[start..start + len])
    }

    pub fn read_hash(&mut self, what: &str) -> Result<[u8; HASH_LEN]> {
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(self.read_exact(HASH_LEN, what)?);
        Ok(hash)
    }

    pub fn read_bytes(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_len(what)?;
        self.read_exact(len, what)
    }

    pub fn finish(self, what: &str) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ClientError::decode(format!(
                "{n} trailing bytes after {what}"
            ))),
        }
    }
}

fn truncated(what: &str) -> ClientError {
    ClientError::decode(format!("Buffer truncated while reading {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_int_boundaries() {
        for value in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000] {
            let mut writer = WireWriter::new();
            writer.write_var_int(value);
            let bytes = writer.into_bytes();
            let mut reader = WireReader::new(&bytes);
            assert_eq!(reader.read_var_int("value").unwrap(), value);
            reader.finish("value").unwrap();
        }
    }

    #[test]
    fn test_integers_are_little_endian() {
        let mut writer = WireWriter::new();
        writer.write_u16(0x0102);
        writer.write_u32(0x0304_0506);
        writer.write_u64(0x0708_090a_0b0c_0d0e);
        writer.write_var_int(0xfd);
        let bytes = writer.into_bytes();
        assert_eq!(
            bytes,
            [
                0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09, 0x08,
                0x07, 0xfd, 0xfd, 0x00,
            ]
        );

        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_u16("a").unwrap(), 0x0102);
        assert_eq!(reader.read_u32("b").unwrap(), 0x0304_0506);
        assert_eq!(reader.read_u64("c").unwrap(), 0x0708_090a_0b0c_0d0e);
        assert_eq!(reader.read_var_int("d").unwrap(), 0xfd);
        reader.finish("entity").unwrap();
    }

    #[test]
    fn test_non_minimal_var_int_rejected() {
        let bytes = [0xfd, 0x05, 0x00];
        let mut reader = WireReader::new(&bytes);
        assert!(reader.read_var_int("count").is_err());
    }

    #[test]
    fn test_length_prefix_beyond_buffer_rejected() {
        let bytes = [0x05, 0x01, 0x02];
        let mut reader = WireReader::new(&bytes);
        let err = reader.read_bytes("script").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_truncated_integer_rejected() {
        let bytes = [0x01, 0x00];
        let mut reader = WireReader::new(&bytes);
        assert!(reader.read_u32("version").is_err());
    }

    #[test]
    fn test_trailing_bytes_detected() {
        let bytes = [0x00, 0x01];
        let mut reader = WireReader::new(&bytes);
        reader.read_u8("flag").unwrap();
        assert!(reader.finish("entity").is_err());
    }
}
