//! Byte-order aware binary streams over in-memory buffers.
//!
//! Codecs read a whole file into memory and decode it through
//! [`BinaryReader`]; they encode into a [`BinaryWriter`] and write the buffer
//! in one go. Integers are little-endian for both VAX and IEEE little-endian
//! files; floats of VAX files use the DEC F-floating layout and are converted
//! to and from IEEE 754 here.

use crate::error::Result;
use crate::types::ByteOrder;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// IEEE 754 little-endian bytes from DEC F-floating bytes
fn vax_to_ieee(b: [u8; 4]) -> [u8; 4] {
    let high = if b[1] == 0 { 0 } else { b[1].wrapping_sub(1) };
    [b[2], b[3], b[0], high]
}

/// DEC F-floating bytes from IEEE 754 little-endian bytes
fn ieee_to_vax(b: [u8; 4]) -> [u8; 4] {
    let high = if b[3] == 0 { 0 } else { b[3].wrapping_add(1) };
    [b[2], high, b[0], b[1]]
}

/// Reader over a byte slice.
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    order: ByteOrder,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: &'a [u8], order: ByteOrder) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Move to an absolute position. Reading past the end fails later.
    pub fn seek(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    /// Move relative to the current position
    pub fn skip(&mut self, offset: i64) -> Result<()> {
        self.cursor.seek(SeekFrom::Current(offset))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.cursor.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(match self.order {
            ByteOrder::IeeeBigEndian => self.cursor.read_u16::<BigEndian>()?,
            _ => self.cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(match self.order {
            ByteOrder::IeeeBigEndian => self.cursor.read_i16::<BigEndian>()?,
            _ => self.cursor.read_i16::<LittleEndian>()?,
        })
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(match self.order {
            ByteOrder::IeeeLittleEndian => self.cursor.read_f32::<LittleEndian>()?,
            ByteOrder::IeeeBigEndian => self.cursor.read_f32::<BigEndian>()?,
            ByteOrder::VaxLittleEndian => {
                let mut raw = [0u8; 4];
                self.cursor.read_exact(&mut raw)?;
                f32::from_le_bytes(vax_to_ieee(raw))
            }
        })
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Fixed-width text; bytes are taken as Latin-1 characters
    pub fn read_string(&mut self, width: usize) -> Result<String> {
        Ok(self.read_bytes(width)?.into_iter().map(char::from).collect())
    }

    pub fn read_i8s(&mut self, count: usize) -> Result<Vec<i8>> {
        (0..count).map(|_| self.read_i8()).collect()
    }

    pub fn read_i16s(&mut self, count: usize) -> Result<Vec<i16>> {
        (0..count).map(|_| self.read_i16()).collect()
    }

    pub fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        (0..count).map(|_| self.read_f32()).collect()
    }
}

/// Growable output buffer.
///
/// Writes into a `Vec<u8>` cannot fail, so the methods return nothing.
pub struct BinaryWriter {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl BinaryWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buf: Vec::new(),
            order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        // Vec<u8> writes are infallible.
        let _ = match self.order {
            ByteOrder::IeeeBigEndian => self.buf.write_u16::<BigEndian>(value),
            _ => self.buf.write_u16::<LittleEndian>(value),
        };
    }

    pub fn write_i16(&mut self, value: i16) {
        let _ = match self.order {
            ByteOrder::IeeeBigEndian => self.buf.write_i16::<BigEndian>(value),
            _ => self.buf.write_i16::<LittleEndian>(value),
        };
    }

    pub fn write_f32(&mut self, value: f32) {
        let _ = match self.order {
            ByteOrder::IeeeLittleEndian => self.buf.write_f32::<LittleEndian>(value),
            ByteOrder::IeeeBigEndian => self.buf.write_f32::<BigEndian>(value),
            ByteOrder::VaxLittleEndian => {
                self.buf.extend_from_slice(&ieee_to_vax(value.to_le_bytes()));
                Ok(())
            }
        };
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Text padded with spaces (or truncated) to `width` bytes
    pub fn write_string(&mut self, text: &str, width: usize) {
        let mut bytes: Vec<u8> = text
            .chars()
            .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
            .take(width)
            .collect();
        bytes.resize(width, b' ');
        self.buf.extend_from_slice(&bytes);
    }

    /// Zero fill up to the absolute position `pos`
    pub fn pad_to(&mut self, pos: usize) {
        if pos > self.buf.len() {
            self.buf.resize(pos, 0);
        }
    }

    /// Overwrite a byte already written
    pub fn patch_u8(&mut self, pos: usize, value: u8) {
        if let Some(slot) = self.buf.get_mut(pos) {
            *slot = value;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
