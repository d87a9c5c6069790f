// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-level I/O over an in-memory OBU byte span.
//!
//! IAMF streams are always delivered as byte spans (this runtime does not
//! demux a container, see Non-goals); consequently there is only one
//! reader, [`BufReader`], rather than the `Reader`/`Stream` split a
//! file-backed format library needs.

mod buf_reader;

pub use buf_reader::BufReader;

use crate::errors::{Error, Result};

/// `ReadBytes` provides methods to read bytes and interpret them as
/// little- or big-endian unsigned integers, plus the leb128 variable-length
/// integer used throughout OBU framing.
pub trait ReadBytes {
    /// Reads a single byte from the stream.
    fn read_byte(&mut self) -> Result<u8>;

    /// Reads `buf.len()` bytes, filling `buf` exactly or returning
    /// [`Error::Truncated`].
    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Number of bytes left in the span.
    fn bytes_remaining(&self) -> usize;

    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        self.read_byte()
    }

    #[inline]
    fn read_be_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_buf_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    #[inline]
    fn read_be_i16(&mut self) -> Result<i16> {
        Ok(self.read_be_u16()? as i16)
    }

    #[inline]
    fn read_be_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    #[inline]
    fn read_le_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_buf_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    #[inline]
    fn read_le_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a null-terminated UTF-8 label string. [`Error::Malformed`] if
    /// the span runs out before a nul byte is found, or the bytes are not
    /// valid UTF-8.
    fn read_null_terminated_str(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_byte().map_err(|_| Error::Malformed("unterminated label string"))?;
            if b == 0 {
                break;
            }
            bytes.push(b);
        }
        String::from_utf8(bytes).map_err(|_| Error::Malformed("label string is not valid UTF-8"))
    }

    /// Reads a leb128-encoded variable-length unsigned integer: each byte
    /// contributes 7 bits, little-endian, with the high bit as a
    /// continuation flag. At most 8 bytes are consumed; a longer chain, or
    /// one that overflows a `u64`, is [`Error::Malformed`].
    fn read_leb128(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for i in 0..8 {
            let byte = self.read_byte()?;
            let payload = u64::from(byte & 0x7f);
            let shift = i * 7;
            if shift >= 64 || (payload << shift) >> shift != payload {
                return Err(Error::Malformed("leb128 overflow"));
            }
            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::Malformed("leb128 continuation chain exceeds 8 bytes"))
    }

    /// Like [`ReadBytes::read_leb128`] but also returns the number of bytes
    /// the encoding occupied (some callers, e.g. signed EBML-style vints in
    /// other formats, need the width; here it is used to size the
    /// remaining payload after trim fields).
    fn read_leb128_sized(&mut self) -> Result<(u64, usize)> {
        let mut value: u64 = 0;
        for i in 0..8 {
            let byte = self.read_byte()?;
            let payload = u64::from(byte & 0x7f);
            let shift = i * 7;
            if shift >= 64 || (payload << shift) >> shift != payload {
                return Err(Error::Malformed("leb128 overflow"));
            }
            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok((value, i + 1));
            }
        }
        Err(Error::Malformed("leb128 continuation chain exceeds 8 bytes"))
    }
}
