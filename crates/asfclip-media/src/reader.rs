//! Bounds-checked little-endian reader over a byte slice.

use asfclip_common::{Error, Result};
use bytes::Buf;
use uuid::Uuid;

/// Cursor over a borrowed buffer that reports truncation as a format error
/// instead of panicking.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    /// Create a reader; `what` names the structure in error messages.
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, what }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(Error::truncated(self.what, n, self.buf.len()));
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    /// Read a GUID stored in the mixed-endian Windows layout.
    pub fn guid(&mut self) -> Result<Uuid> {
        let raw = self.bytes(16)?;
        let mut le = [0u8; 16];
        le.copy_from_slice(raw);
        Ok(Uuid::from_bytes_le(le))
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.bytes(n).map(|_| ())
    }

    /// Read a variable-width field encoded by a 2-bit length type
    /// (0 = absent, 1 = byte, 2 = word, 3 = dword).
    pub fn var(&mut self, length_type: u8) -> Result<u32> {
        match length_type & 0x03 {
            0 => Ok(0),
            1 => self.u8().map(u32::from),
            2 => self.u16().map(u32::from),
            _ => self.u32(),
        }
    }
}

/// Decode a UTF-16LE string, dropping trailing NULs.
pub(crate) fn utf16_string(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}
