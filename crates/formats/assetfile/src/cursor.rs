use crate::error::{Error, Result};

/// Byte order of multi-byte values.
///
/// The file header is always big-endian; metadata and object data follow the
/// endianness flag stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Read cursor over a byte slice.
#[derive(Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether the cursor is at or past the end.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Switch byte order for subsequent reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Jump to an absolute offset.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Advance to the next multiple of `n` (absolute position).
    pub fn align(&mut self, n: usize) -> Result<()> {
        let pad = (n - self.pos % n) % n;
        self.skip(pad)
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.read_array::<2>()?;
        Ok(match self.endian {
            Endian::Little => i16::from_le_bytes(b),
            Endian::Big => i16::from_be_bytes(b),
        })
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_array::<2>()?;
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_array::<4>()?;
        Ok(match self.endian {
            Endian::Little => i32::from_le_bytes(b),
            Endian::Big => i32::from_be_bytes(b),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_array::<4>()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.read_array::<8>()?;
        Ok(match self.endian {
            Endian::Little => i64::from_le_bytes(b),
            Endian::Big => i64::from_be_bytes(b),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_array::<8>()?;
        Ok(match self.endian {
            Endian::Little => u64::from_le_bytes(b),
            Endian::Big => u64::from_be_bytes(b),
        })
    }

    /// Read a non-negative i32 count or length.
    pub fn read_len(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| Error::NegativeLength { offset, len })
    }

    /// Read a null-terminated string.
    pub fn read_cstring(&mut self) -> Result<String> {
        let offset = self.pos;
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(nul) = rest.iter().position(|&b| b == 0) else {
            return Err(Error::UnexpectedEof {
                offset,
                need: rest.len() + 1,
                have: rest.len(),
            });
        };
        let bytes = self.read_bytes(nul)?;
        self.skip(1)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::InvalidString { offset, source: e })
    }

    /// Read a Unity aligned byte array: i32 length + bytes, then pad to 4.
    pub fn read_aligned_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        self.align(4)?;
        Ok(bytes)
    }

    /// Read a Unity aligned string (see [`Cursor::read_aligned_bytes`]).
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let bytes = self.read_aligned_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::InvalidString { offset, source: e })
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos + n > self.data.len() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Writer that builds a byte buffer.
pub struct Writer {
    buf: Vec<u8>,
    endian: Endian,
}

impl Writer {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub fn with_capacity(cap: usize, endian: Endian) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub fn write_u16(&mut self, v: u16) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub fn write_i32(&mut self, v: i32) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub fn write_u32(&mut self, v: u32) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub fn write_i64(&mut self, v: i64) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endian::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    /// Write a null-terminated string.
    pub fn write_cstring(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Write a Unity aligned byte array: i32 length + bytes, then pad to 4.
    ///
    /// Lengths beyond `i32::MAX` cannot be represented; callers check first.
    pub fn write_aligned_bytes(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.buf.extend_from_slice(bytes);
        self.align(4);
    }

    /// Overwrite a u32 at a specific position (for backpatching sizes).
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        let bytes = match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        self.buf[pos..pos + 4].copy_from_slice(&bytes);
    }

    /// Overwrite a u64 at a specific position.
    pub fn patch_u64(&mut self, pos: usize, v: u64) {
        let bytes = match self.endian {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        self.buf[pos..pos + 8].copy_from_slice(&bytes);
    }

    /// Pad with zeros to an `n`-byte boundary.
    pub fn align(&mut self, n: usize) {
        while self.buf.len() % n != 0 {
            self.buf.push(0);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
