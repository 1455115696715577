use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use memchr::memchr;

use crate::error::{DumpError, Result};

/// The 3-byte prefix shared by every start code.
pub const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// Default size of the first start-code search window.
pub const DEFAULT_PEEK_SIZE: usize = 1024;

/// A sequential, peekable reader over a byte stream.
///
/// Bytes pulled from the underlying reader but not yet consumed live in a
/// lookahead buffer. The lookahead only grows when a caller peeks further
/// ahead and shrinks as bytes are consumed, so the logical position is always
/// the true position minus the lookahead length.
pub struct ByteSource<R> {
    inner: R,
    position: u64,
    lookahead: BytesMut,
    eof: bool,
    initial_peek_size: usize,
}

impl<R: Read> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            lookahead: BytesMut::new(),
            eof: false,
            initial_peek_size: DEFAULT_PEEK_SIZE,
        }
    }

    /// Sets the size of the first window used by start-code searches.
    pub fn with_peek_size(mut self, size: usize) -> Self {
        self.initial_peek_size = size.max(4);
        self
    }

    /// Offset of the next byte [`read`](Self::read) would return.
    pub fn logical_position(&self) -> u64 {
        self.position - self.lookahead.len() as u64
    }

    /// Number of bytes currently held in the lookahead buffer.
    pub fn buffered(&self) -> usize {
        self.lookahead.len()
    }

    /// Pulls bytes from the reader until `n` are buffered or input ends.
    fn fill(&mut self, n: usize) -> Result<()> {
        let start = self.lookahead.len();
        if start >= n || self.eof {
            return Ok(());
        }

        self.lookahead.resize(n, 0);
        let mut filled = start;
        while filled < n {
            match self.inner.read(&mut self.lookahead[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(got) => filled += got,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.lookahead.truncate(filled);
                    return Err(e.into());
                }
            }
        }
        self.lookahead.truncate(filled);
        self.position += (filled - start) as u64;
        Ok(())
    }

    /// Returns up to `n` upcoming bytes without consuming them.
    ///
    /// The result is shorter than `n` only at the end of input.
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        self.fill(n)?;
        let len = n.min(self.lookahead.len());
        Ok(&self.lookahead[..len])
    }

    /// Consumes and returns up to `n` bytes, lookahead first.
    ///
    /// The result is shorter than `n` only at the end of input.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        self.fill(n)?;
        let len = n.min(self.lookahead.len());
        Ok(self.lookahead.split_to(len).freeze())
    }

    /// Consumes exactly `n` bytes or fails with `InsufficientData`.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        self.fill(n)?;
        if self.lookahead.len() < n {
            return Err(DumpError::InsufficientData {
                needed: n * 8,
                available: self.lookahead.len() * 8,
            });
        }
        Ok(self.lookahead.split_to(n).freeze())
    }

    /// Discards up to `n` bytes, returning how many were skipped.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        Ok(self.read(n)?.len())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.peek(1)?.is_empty())
    }

    /// Finds the next `00 00 01` prefix at or after `start_offset` bytes past
    /// the logical position, returning its offset from the logical position.
    ///
    /// The search window starts at the configured peek size and doubles until
    /// a match is found or the input runs out. Nothing is consumed.
    ///
    /// With `skip_escapes`, a prefix immediately preceded by a zero byte
    /// (`00 00 00 01`, i.e. stuffing) is passed over.
    pub fn find_next_start_code(
        &mut self,
        start_offset: usize,
        skip_escapes: bool,
    ) -> Result<Option<usize>> {
        let mut peek_size = self.initial_peek_size;
        while peek_size < start_offset + 3 {
            peek_size *= 2;
        }

        loop {
            let window = self.peek(peek_size)?;
            let found = find_start_code(window, start_offset, skip_escapes);
            if found.is_some() || window.len() < peek_size {
                return Ok(found);
            }
            peek_size *= 2;
        }
    }
}

/// Searches `haystack` for a start-code prefix at or after `from`.
pub fn find_start_code(haystack: &[u8], from: usize, skip_escapes: bool) -> Option<usize> {
    let mut pos = from;
    while pos + START_CODE_PREFIX.len() <= haystack.len() {
        // Scan for a zero byte, then check the rest of the prefix
        let index = pos + memchr(0x00, &haystack[pos..])?;
        if !haystack[index..].starts_with(&START_CODE_PREFIX) {
            pos = index + 1;
            continue;
        }
        if skip_escapes && index > 0 && haystack[index - 1] == 0x00 {
            pos = index + START_CODE_PREFIX.len();
            continue;
        }
        return Some(index);
    }
    None
}
