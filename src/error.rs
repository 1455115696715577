use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal for the segment being analyzed; the caller moves on to the next one.
    #[error("malformed segment: {0}")]
    MalformedSegment(String),

    /// Not a failure: fewer bits are buffered than a read asked for.
    #[error("insufficient buffered data: needed {needed} bits, {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("oversized unit on pid {pid}: {pending} bytes pending, limit is {limit}")]
    OversizedUnit {
        pid: u16,
        pending: usize,
        limit: usize,
    },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("playlist error: {0}")]
    Playlist(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl DumpError {
    /// True for the "wait for more data / end of structure" signal.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, DumpError::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;
