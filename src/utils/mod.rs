//! # Utility Functions and Types
//!
//! Readers shared by the program stream decoders and the transport stream
//! demuxer:
//!
//! - Bit-level reading of packed header fields
//! - Exp-Golomb variable length codes
//! - A peekable byte source with start-code scanning
//!
//! ## Bit Operations
//!
//! ```rust
//! use mpegdump::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data);
//!
//! // Read specific number of bits
//! let value = reader.get_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```
//!
//! ## Start Codes
//!
//! ```rust
//! use mpegdump::utils::ByteSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = [0xFF, 0x00, 0x00, 0x01, 0xBA];
//! let mut source = ByteSource::new(&data[..]);
//! assert_eq!(source.find_next_start_code(0, false)?, Some(1));
//! # Ok(())
//! # }
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// Exp-Golomb decoding
pub mod golomb;

/// Peekable byte source and start-code scanning
pub mod source;

// Re-export commonly used types
pub use bits::*;
pub use golomb::ExpGolomb;
pub use source::{find_start_code, ByteSource, DEFAULT_PEEK_SIZE, START_CODE_PREFIX};
