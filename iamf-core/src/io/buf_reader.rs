// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{Error, Result};
use crate::io::ReadBytes;

/// A `BufReader` reads bytes from a borrowed byte slice, tracking a cursor.
/// It never copies the underlying data; OBU payload spans handed to
/// descriptor parsers are themselves `BufReader`s over a sub-slice of the
/// original input.
pub struct BufReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufReader<'a> {
    /// Instantiates a new `BufReader` over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        BufReader { buf, pos: 0 }
    }

    /// Current absolute position into the original slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying slice.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Advances `self`'s cursor by `len` bytes and returns a reader scoped
    /// to exactly that sub-span. Used to hand a descriptor parser only its
    /// own OBU payload.
    pub fn split_at(&mut self, len: usize) -> Result<BufReader<'a>> {
        if self.pos + len > self.buf.len() {
            return Err(Error::Truncated);
        }
        let sub = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(BufReader::new(sub))
    }

    /// Returns the unread remainder as a slice without consuming it.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.buf.len() {
            return Err(Error::Truncated);
        }
        self.pos += n;
        Ok(())
    }
}

impl<'a> ReadBytes for BufReader<'a> {
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(Error::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.pos + buf.len() > self.buf.len() {
            return Err(Error::Truncated);
        }
        buf.copy_from_slice(&self.buf[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn bytes_remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
