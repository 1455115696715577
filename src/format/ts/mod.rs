//! # MPEG Transport Stream (TS) Analysis
//!
//! Transport stream input is handled in two passes:
//!
//! - **Demuxing**: fixed 188-byte packets are split by PID into per-PID
//!   payload buffers, with unit-start and PCR events recorded at their
//!   offsets in each buffer
//! - **PES Reassembly**: each buffer is scanned for PES units, including
//!   units whose length is not declared, and their optional headers are
//!   decoded for PTS/DTS/ESCR/ES rate
//!
//! ## Example Usage
//!
//! ```rust
//! use mpegdump::config::AnalyzerConfig;
//! use mpegdump::format::report::Report;
//! use mpegdump::format::ts::{
//!     analyze_program_streams, analyze_segment, DemuxState, TS_PACKET_SIZE,
//! };
//! use mpegdump::utils::ByteSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One packet on PID 0x100 carrying a padding PES unit
//! let mut packet = vec![0x47, 0x41, 0x00, 0x10];
//! packet.extend_from_slice(&[0x00, 0x00, 0x01, 0xBE, 0x00, 0xB2]);
//! packet.resize(TS_PACKET_SIZE, 0xFF);
//!
//! let config = AnalyzerConfig::default();
//! let mut state = DemuxState::new();
//! let mut report = Report::new();
//!
//! analyze_segment(&mut ByteSource::new(&packet[..]), &mut state, &config, &mut report)?;
//! analyze_program_streams(&mut state, &config, &mut report)?;
//!
//! assert_eq!(report.len(), 1);
//! assert_eq!(state.timeline().events(0x100).len(), 1);
//! # Ok(())
//! # }
//! ```

/// Per-PID demultiplexing of transport packets
pub mod demuxer;

/// Low-level TS packet parsing utilities
pub mod parser;

/// PES header decoding
pub mod pes;

/// PES unit reconstruction from per-PID buffers
pub mod reassembler;

/// Core TS types and constants
pub mod types;

// Re-export commonly used types and constants
pub use demuxer::{analyze_segment, DemuxState, PidStream};
pub use parser::TsPacketParser;
pub use pes::{PesHeader, PesTiming, PesUnit, StreamKind};
pub use reassembler::analyze_program_streams;
pub use types::{ClockReference, TsHeader, TsPacket, PID_NULL, TS_PACKET_SIZE};
