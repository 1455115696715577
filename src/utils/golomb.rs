use super::bits::BitReader;
use crate::error::{DumpError, Result};

/// Codes with this many leading zeros no longer fit in a `u64`.
const MAX_LEADING_ZEROS: usize = 64;

/// Exponential-Golomb decoding (`ue(v)` / `se(v)`) on top of a [`BitReader`].
pub trait ExpGolomb {
    /// Reads an unsigned Exp-Golomb code.
    ///
    /// Format:
    /// 1. k leading zeros followed by a 1
    /// 2. k more INFO bits
    /// 3. Value = 2^k - 1 + INFO
    ///
    /// Example: "00110" (k=2, INFO=10)
    /// - Value = 2^2 - 1 + 2 = 5
    ///
    /// Counting stops at the end of data; the INFO read then reports
    /// `InsufficientData`. A prefix of 64 or more zeros is `InvalidData`.
    fn ue_v(&mut self) -> Result<u64>;

    /// Reads a signed Exp-Golomb code, mapping k = 0,1,2,3,4,... to
    /// 0,1,-1,2,-2,...
    fn se_v(&mut self) -> Result<i64>;
}

impl ExpGolomb for BitReader {
    fn ue_v(&mut self) -> Result<u64> {
        let mut leading_zeros = 0usize;
        while self.remaining_bits() > 0 && !self.get_flag()? {
            leading_zeros += 1;
            if leading_zeros >= MAX_LEADING_ZEROS {
                return Err(DumpError::InvalidData(format!(
                    "Exp-Golomb prefix of {} or more zeros",
                    MAX_LEADING_ZEROS
                )));
            }
        }

        let additional = self.get_bits(leading_zeros)?;
        ((1u64 << leading_zeros) - 1)
            .checked_add(additional)
            .ok_or_else(|| DumpError::InvalidData("Exp-Golomb value overflows u64".to_string()))
    }

    fn se_v(&mut self) -> Result<i64> {
        let k = self.ue_v()?;
        // At most i64::MAX since k <= u64::MAX - 1
        let magnitude = (k / 2 + (k & 1)) as i64;
        Ok(if k & 1 == 1 { magnitude } else { -magnitude })
    }
}
