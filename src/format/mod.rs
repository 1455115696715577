/// Program stream scanning and structural header decoders
pub mod ps;

/// Structured records produced by an analysis
pub mod report;

/// Per-PID event timelines
pub mod timeline;

/// Transport stream demuxing and PES reassembly
pub mod ts;

pub use self::report::{Diagnostic, Location, Record, RecordBody, Report};
pub use self::timeline::{EventKind, PidEvent, Timeline};

/// Container format of an input, decided from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    TransportStream,
    ProgramStream,
}

impl InputFormat {
    /// Transport streams start with the sync byte; anything else is scanned
    /// as a program stream.
    pub fn detect(first_bytes: &[u8]) -> Self {
        match first_bytes.first() {
            Some(&ts::types::SYNC_BYTE) => InputFormat::TransportStream,
            _ => InputFormat::ProgramStream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(InputFormat::detect(&[0x47, 0x40]), InputFormat::TransportStream);
        assert_eq!(
            InputFormat::detect(&[0x00, 0x00, 0x01, 0xBA]),
            InputFormat::ProgramStream
        );
        assert_eq!(InputFormat::detect(&[]), InputFormat::ProgramStream);
    }
}
