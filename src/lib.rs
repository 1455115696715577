#![doc(html_root_url = "https://docs.rs/mpegdump/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # mpegdump - MPEG-2 Container Diagnostics
//!
//! `mpegdump` is a demuxer and diagnostic decoder for MPEG-2 Transport
//! Streams (TS) and Program Streams (PS). It scans a finite input, rebuilds
//! per-stream payload and timing metadata and reports the structural units
//! and timestamps it finds, each tied to a byte offset.
//!
//! ## Features
//!
//! ### Transport Streams
//! - 188-byte packet parsing, demultiplexed by PID
//! - PCR/OPCR extraction from adaptation fields
//! - PES reassembly, including units with an undeclared length
//! - PTS/DTS/ESCR/ES rate decoding
//! - Continuity counter checks
//!
//! ### Program Streams
//! - Pack and system headers
//! - Sequence, extension, GOP and picture headers
//! - DVD navigation packets (private stream 2)
//!
//! ### Playlists
//! - HLS playlists whose segments form one logical transport stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpegdump::config::AnalyzerConfig;
//! use mpegdump::playlist::analyze_playlist;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::load()?;
//!     let analysis = analyze_playlist("stream/index.m3u8", &config).await?;
//!
//!     print!("{}", analysis.report);
//!     print!("{}", analysis.timeline);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `format`: Container analysis
//!   - `ts`: packet demuxing and PES reassembly
//!   - `ps`: program stream scanning and header decoders
//!   - `report` and `timeline`: analysis output
//!
//! - `playlist`: Segment iteration for HLS playlists
//!
//! - `config`: Analyzer tunables and their sources
//!
//! - `error`: Error handling types and utilities
//!
//! - `utils`: Bitstream reading, Exp-Golomb codes and start-code scanning
//!
/// Analyzer configuration
pub mod config;

/// Error types and utilities
pub mod error;

/// Container format analysis (TS, PS)
pub mod format;

/// HLS playlist driver
pub mod playlist;

/// Common utilities and helper functions
pub mod utils;

pub use error::{DumpError, Result};
