//! Bounds-checked little-endian access into a raw model buffer

use byteorder::{ByteOrder, LittleEndian};
use memchr::memchr;

use crate::error::{ModelError, Result};

/// Little-endian view over a model file held in memory.
///
/// Every read is bounds-checked. A read past the end of the buffer surfaces as
/// [`ModelError::Corrupt`] carrying the model name instead of panicking.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
    name: &'a str,
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8], name: &'a str) -> Self {
        Self { data, name }
    }

    /// Name of the model this buffer belongs to, used in diagnostics
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                ModelError::corrupt(
                    self.name,
                    format!(
                        "read of {len} bytes at offset {offset} exceeds buffer of {} bytes",
                        self.data.len()
                    ),
                )
            })
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.bytes(offset, 2)?))
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(offset, 2)?))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes(offset, 4)?))
    }

    /// Read three consecutive little-endian floats
    pub fn read_vec3(&self, offset: usize) -> Result<[f32; 3]> {
        let raw = self.bytes(offset, 12)?;
        let mut out = [0.0; 3];
        LittleEndian::read_f32_into(raw, &mut out);
        Ok(out)
    }

    /// Read a fixed-size, NUL-padded name field
    pub fn read_name(&self, offset: usize, len: usize) -> Result<String> {
        Ok(fixed_name(self.bytes(offset, len)?))
    }
}

/// Decode a fixed-size name field, stopping at the first NUL
fn fixed_name(field: &[u8]) -> String {
    let end = memchr(0, field).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Convert a signed header count into `usize`, rejecting negative values
pub(crate) fn to_count(name: &str, field: &str, value: i32) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| ModelError::corrupt(name, format!("negative {field}: {value}")))
}
