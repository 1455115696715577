use bitvec::prelude::*;

use crate::error::{DumpError, Result};

/// Largest read the single-chunk primitive handles.
const MAX_CHUNK_BITS: usize = 32;

/// A growable bit-level reader for parsing packed binary headers.
///
/// Bits are consumed most-significant first, and multi-bit reads are
/// accumulated high-to-low, so `get_bits(n)` returns the consumed bits as a
/// big-endian unsigned integer. The buffer can grow while it is read
/// ([`append`](Self::append)) and shed consumed bytes ([`pop`](Self::pop)).
///
/// Reads past the buffered data do not return a made-up value: they fail with
/// [`DumpError::InsufficientData`], leaving it to the caller to decide whether
/// that means "buffer more bytes" or "the structure ended early".
///
/// Example:
/// ```
/// use mpegdump::utils::BitReader;
///
/// let mut reader = BitReader::new(&[0b1011_0011]);
///
/// assert_eq!(reader.get_bits(1).unwrap(), 1);
/// assert_eq!(reader.get_bits(3).unwrap(), 0b011);
/// assert_eq!(reader.remaining_bits(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitReader {
    data: Vec<u8>,
    /// Index of the first live byte in `data`.
    pos: usize,
    /// Bit offset relative to `pos`.
    bit_offset: usize,
}

impl BitReader {
    /// Creates a reader over a copy of `data`.
    pub fn new(data: &[u8]) -> Self {
        Self::with_offset(data, 0)
    }

    /// Creates a reader that starts `starting_byte_offset` bytes into `data`.
    pub fn with_offset(data: &[u8], starting_byte_offset: usize) -> Self {
        BitReader {
            data: data.to_vec(),
            pos: starting_byte_offset.min(data.len()),
            bit_offset: 0,
        }
    }

    /// Total number of bits readable from the start of the live region.
    pub fn total_bits(&self) -> usize {
        (self.data.len() - self.pos) * 8
    }

    /// Current bit position within the live region.
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    /// Returns number of bits available to read.
    pub fn remaining_bits(&self) -> usize {
        self.total_bits().saturating_sub(self.bit_offset)
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset % 8 == 0
    }

    fn bits(&self) -> &BitSlice<u8, Msb0> {
        self.data[self.pos..].view_bits::<Msb0>()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        let available = self.remaining_bits();
        if n > available {
            return Err(DumpError::InsufficientData {
                needed: n,
                available,
            });
        }
        Ok(())
    }

    /// Reads up to 32 bits without advancing the cursor.
    pub fn peek_bits(&self, n: usize) -> Result<u32> {
        if n > MAX_CHUNK_BITS {
            return Err(DumpError::InvalidData(format!(
                "cannot peek {} bits, limit is {}",
                n, MAX_CHUNK_BITS
            )));
        }
        self.ensure(n)?;
        let start = self.bit_offset;
        let value = self.bits()[start..start + n]
            .iter()
            .by_vals()
            .fold(0u32, |acc, bit| (acc << 1) | bit as u32);
        Ok(value)
    }

    /// Reads `n` bits (up to 64) as a big-endian unsigned integer.
    ///
    /// Wide reads are split into 32-bit chunks; the result is the same as a
    /// sequence of narrower reads concatenated.
    pub fn get_bits(&mut self, n: usize) -> Result<u64> {
        if n > 64 {
            return Err(DumpError::InvalidData(format!(
                "cannot read {} bits into a u64",
                n
            )));
        }
        self.ensure(n)?;

        let mut value = 0u64;
        let mut left = n;
        while left > 0 {
            let chunk = left.min(MAX_CHUNK_BITS);
            value = (value << chunk) | self.peek_bits(chunk)? as u64;
            self.bit_offset += chunk;
            left -= chunk;
        }
        Ok(value)
    }

    /// Reads a single bit as a flag.
    pub fn get_flag(&mut self) -> Result<bool> {
        Ok(self.get_bits(1)? == 1)
    }

    /// Skips `n` bits.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.bit_offset += n;
        Ok(())
    }

    /// Appends more bytes to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Drops fully consumed leading bytes, keeping the sub-byte offset.
    pub fn pop(&mut self) {
        let consumed = self.bit_offset / 8;
        self.pos += consumed;
        self.bit_offset %= 8;

        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Reads `size` whole bytes starting at the current byte.
    ///
    /// An unaligned cursor is tolerated: the read starts at the byte holding
    /// the cursor and a warning is logged. The returned slice is shorter than
    /// `size` if the buffer ends first.
    pub fn read_bytes(&mut self, size: usize) -> &[u8] {
        if !self.is_byte_aligned() {
            log::warn!(
                "reading bytes at non-aligned bitstream offset {}",
                self.bit_offset
            );
        }
        let start = self.pos + self.bit_offset / 8;
        let end = (start + size).min(self.data.len());
        self.bit_offset = (self.bit_offset + size * 8).min(self.total_bits());
        &self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_get_bits() {
        // Simple pattern within a byte
        let mut reader = BitReader::new(&[0b10110011]);
        assert_eq!(reader.get_bits(3).unwrap(), 0b101);
        assert_eq!(reader.get_bits(5).unwrap(), 0b10011);

        // Cross-byte boundary
        let mut reader = BitReader::new(&[0b10110011, 0b01011010]);
        assert_eq!(reader.get_bits(3).unwrap(), 0b101);
        assert_eq!(reader.get_bits(8).unwrap(), 0b10011010);

        // Zero bits
        let mut reader = BitReader::new(&[0b10101010]);
        assert_eq!(reader.get_bits(0).unwrap(), 0);

        // Cross multiple byte boundaries
        let mut reader = BitReader::new(&[0b10110011, 0b11001100, 0b10101010]);
        assert_eq!(reader.get_bits(20).unwrap(), 0b10110011110011001010);
    }

    #[test]
    fn test_wide_reads_use_chunks() {
        // 33-bit PCR base followed by 6 reserved and 9 extension bits
        let data = [0x00, 0x00, 0x01, 0xF4, 0x7E, 0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.get_bits(33).unwrap(), 1000);
        assert_eq!(reader.get_bits(6).unwrap(), 0x3F);
        assert_eq!(reader.get_bits(9).unwrap(), 0);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_under_read_is_signalled() {
        let mut reader = BitReader::new(&[0xFF]);
        reader.get_bits(6).unwrap();
        let err = reader.get_bits(8).unwrap_err();
        assert!(err.is_insufficient_data());
        // A failed read leaves the cursor in place
        assert_eq!(reader.get_bits(2).unwrap(), 0b11);

        let reader = BitReader::new(&[0xFF; 8]);
        assert!(reader.peek_bits(33).is_err());
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut reader = BitReader::new(&[0b1000_0000]);
        assert_eq!(reader.peek_bits(1).unwrap(), 1);
        assert_eq!(reader.peek_bits(1).unwrap(), 1);
        assert_eq!(reader.get_bits(1).unwrap(), 1);
        assert_eq!(reader.peek_bits(1).unwrap(), 0);
    }

    #[test]
    fn test_append_and_pop() {
        let mut reader = BitReader::new(&[0xAB]);
        reader.get_bits(4).unwrap();
        assert_eq!(reader.remaining_bits(), 4);
        assert!(reader.get_bits(8).is_err());

        reader.append(&[0xCD]);
        assert_eq!(reader.get_bits(8).unwrap(), 0xBC);
        assert_eq!(reader.remaining_bits(), 4);

        reader.pop();
        assert_eq!(reader.total_bits(), 8);
        assert_eq!(reader.bit_offset(), 4);
        assert_eq!(reader.get_bits(4).unwrap(), 0xD);
    }

    #[test]
    fn test_read_bytes() {
        let mut reader = BitReader::new(&[0x47, 0x01, 0x02, 0x03]);
        assert_eq!(reader.get_bits(8).unwrap(), 0x47);
        assert_eq!(reader.read_bytes(2), &[0x01, 0x02]);
        // Short read at the end of the buffer
        assert_eq!(reader.read_bytes(10), &[0x03]);
        assert_eq!(reader.remaining_bits(), 0);
    }

    #[test]
    fn test_starting_offset() {
        let mut reader = BitReader::with_offset(&[0x00, 0x00, 0x7F], 2);
        assert_eq!(reader.total_bits(), 8);
        assert_eq!(reader.get_bits(8).unwrap(), 0x7F);
    }

    #[quickcheck]
    fn prop_split_reads_match_joined_read(data: Vec<u8>, n: u8, m: u8) -> bool {
        let n = (n % 33) as usize;
        let m = (m % 32) as usize;
        if n + m > data.len() * 8 {
            return true;
        }

        let mut split = BitReader::new(&data);
        let high = split.get_bits(n).unwrap();
        let low = split.get_bits(m).unwrap();

        let mut joined = BitReader::new(&data);
        let whole = joined.get_bits(n + m).unwrap();

        (high << m) | low == whole
    }

    #[quickcheck]
    fn prop_get_bits_matches_manual(data: Vec<u8>, n: u8) -> bool {
        let n = (n % 33) as usize;
        if n > data.len() * 8 {
            return true;
        }

        let mut reader = BitReader::new(&data);
        let result = reader.get_bits(n).unwrap();

        let mut expected = 0u64;
        for i in 0..n {
            let bit = (data[i / 8] >> (7 - (i % 8))) & 1;
            expected = (expected << 1) | bit as u64;
        }
        result == expected
    }
}
