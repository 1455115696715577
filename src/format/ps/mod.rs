//! # MPEG Program Stream (PS) Analysis
//!
//! A program stream has no fixed unit size: it is scanned for `00 00 01 XX`
//! start codes and each unit is decoded according to its `XX` byte.
//!
//! - Pack and system headers
//! - Video sequence, extension, GOP and picture headers
//! - DVD navigation (private stream 2)
//! - PES headers for audio and video streams
//!
//! ```rust
//! use mpegdump::config::AnalyzerConfig;
//! use mpegdump::format::ps::analyze_program_stream;
//! use mpegdump::format::report::{RecordBody, Report};
//! use mpegdump::utils::ByteSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Sequence end code
//! let data = [0x00, 0x00, 0x01, 0xB7];
//! let mut source = ByteSource::new(&data[..]);
//! let mut report = Report::new();
//!
//! analyze_program_stream(&mut source, &AnalyzerConfig::default(), &mut report)?;
//! assert!(matches!(report.records()[0].body, RecordBody::StartCode(_)));
//! # Ok(())
//! # }
//! ```

/// Decoders for the structural units of a program stream
pub mod headers;

/// Program stream record types and code tables
pub mod types;

use std::io::Read;

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::format::report::{Diagnostic, Location, RecordBody, Report};
use crate::utils::ByteSource;
use headers::*;
use types::{Extension, StartCodeKind};

pub use types::{
    AspectRatio, FrameRate, FrameType, GopHeader, PackHeader, PictureHeader, PrivateStream2,
    SequenceHeader, SystemHeader,
};

/// Scans a program stream to its end, pushing one record per unit.
///
/// A unit whose fields run past its end, or past the end of the input, is
/// reported as truncated and the scan resumes at the next start code. I/O
/// errors are returned.
pub fn analyze_program_stream<R: Read>(
    source: &mut ByteSource<R>,
    config: &AnalyzerConfig,
    report: &mut Report,
) -> Result<()> {
    loop {
        let index = match source.find_next_start_code(0, config.skip_escapes)? {
            Some(index) => index,
            None => {
                let mut remaining = 0;
                while !source.is_eof()? {
                    remaining += source.skip(config.initial_peek_size)?;
                }
                log::trace!("{} trailing bytes without a start code", remaining);
                return Ok(());
            }
        };
        if index > 0 {
            log::trace!("skipping {} bytes of unit payload", index);
            source.skip(index)?;
        }

        let loc = Location::new(source.logical_position(), None);
        let code = source.peek(4)?;
        if code.len() < 4 {
            let remaining = code.len();
            source.skip(remaining)?;
            report.diagnostic(
                loc,
                Diagnostic::TruncatedUnit {
                    unit: "start code".to_string(),
                },
            );
            return Ok(());
        }
        let kind = StartCodeKind::from_code(code[3]);
        source.skip(4)?;

        match decode_unit(source, kind, report, loc) {
            Ok(()) => {}
            Err(e) if e.is_insufficient_data() => {
                report.diagnostic(
                    loc,
                    Diagnostic::TruncatedUnit {
                        unit: kind.to_string(),
                    },
                );
                log::trace!("{} truncated: {}", kind, e);
            }
            Err(e) => return Err(e),
        }
    }
}

fn decode_unit<R: Read>(
    source: &mut ByteSource<R>,
    kind: StartCodeKind,
    report: &mut Report,
    loc: Location,
) -> Result<()> {
    let body = match kind {
        StartCodeKind::Picture => RecordBody::Picture(decode_picture_header(source)?),
        StartCodeKind::SequenceHeader => {
            RecordBody::Sequence(decode_sequence_header(source, report, loc)?)
        }
        StartCodeKind::Extension => match decode_extension(source, report, loc)? {
            Extension::Unknown(kind) => {
                report.diagnostic(loc, Diagnostic::UnknownExtension { kind });
                return Ok(());
            }
            ext => RecordBody::Extension(ext),
        },
        StartCodeKind::GroupOfPictures => RecordBody::Gop(decode_gop_header(source, report, loc)?),
        StartCodeKind::PackHeader => RecordBody::Pack(decode_pack_header(source, report, loc)?),
        StartCodeKind::SystemHeader => {
            RecordBody::System(decode_system_header(source, report, loc)?)
        }
        StartCodeKind::PrivateStream2 => {
            RecordBody::PrivateStream2(decode_private_stream_2(source)?)
        }
        StartCodeKind::Audio(_) | StartCodeKind::Video(_) => {
            RecordBody::Pes(decode_ps_pes(source, kind.code(), report, loc)?)
        }
        StartCodeKind::Unknown(code) => {
            report.diagnostic(loc, Diagnostic::UnknownUnitType { code });
            if kind.is_length_prefixed() {
                skip_length_prefixed(source)?;
            }
            return Ok(());
        }
        other => {
            report.push(loc, RecordBody::StartCode(other));
            if other.is_length_prefixed() {
                let skipped = skip_length_prefixed(source)?;
                log::debug!("skipped {} bytes of {}", skipped, other);
            }
            return Ok(());
        }
    };
    report.push(loc, body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyze(data: &[u8]) -> Report {
        let mut source = ByteSource::new(data);
        let mut report = Report::new();
        analyze_program_stream(&mut source, &AnalyzerConfig::default(), &mut report).unwrap();
        report
    }

    #[test]
    fn test_known_but_unhandled_codes() {
        let data = [
            0x00, 0x00, 0x01, 0xB2, 0x55, // user data
            0x00, 0x00, 0x01, 0xBE, 0x00, 0x02, 0x00, 0x00, // padding, skipped
            0x00, 0x00, 0x01, 0xB9, // program end
        ];
        let report = analyze(&data);
        let kinds: Vec<_> = report.records().iter().map(|r| r.body.clone()).collect();

        assert_eq!(
            kinds,
            vec![
                RecordBody::StartCode(StartCodeKind::UserData),
                RecordBody::StartCode(StartCodeKind::Padding),
                RecordBody::StartCode(StartCodeKind::ProgramEnd),
            ]
        );
        assert_eq!(report.records()[2].location.offset, 13);
    }

    #[test]
    fn test_unknown_code_and_extension() {
        let data = [
            0x00, 0x00, 0x01, 0xF3, 0x00, 0x01, 0xFF, // unknown, length prefixed
            0x00, 0x00, 0x01, 0xB5, 0x50, // extension kind 5
        ];
        let report = analyze(&data);
        assert_eq!(
            report.diagnostics().cloned().collect::<Vec<_>>(),
            vec![
                Diagnostic::UnknownUnitType { code: 0xF3 },
                Diagnostic::UnknownExtension { kind: 5 },
            ]
        );
    }

    #[test]
    fn test_truncated_unit_at_end_of_input() {
        let data = [0x00, 0x00, 0x01, 0xB3, 0x2D, 0x02];
        let report = analyze(&data);
        assert_eq!(
            report.diagnostics().cloned().collect::<Vec<_>>(),
            vec![Diagnostic::TruncatedUnit {
                unit: "Sequence Header".to_string()
            }]
        );
    }

    #[test]
    fn test_ps_pes_consumes_header_only() {
        let mut data = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x10];
        data.extend_from_slice(&crate::format::ts::pes::test_utils::optional_header(90_000, None));
        // Payload carries a picture header that must still be found
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x0F, 0xFF, 0xF8]);

        let report = analyze(&data);
        let records = report.records();
        assert_eq!(records.len(), 2);
        match &records[0].body {
            RecordBody::Pes(pes) => {
                assert_eq!(pes.stream_id, 0xE0);
                assert_eq!(pes.length, 16);
                assert_eq!(pes.timing().and_then(|t| t.pts_seconds()), Some(1.0));
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(matches!(records[1].body, RecordBody::Picture(_)));
        assert_eq!(records[1].location.offset, 14);
    }

    #[test]
    fn test_scan_resumes_after_truncated_unit() {
        let data = [
            0x00, 0x00, 0x01, 0xBB, 0x00, 0x02, 0x80, 0x9D, // system header, too short
            0x00, 0x00, 0x01, 0xB8, 0x04, 0x28, 0x62, 0x40, // GOP
            0x00, 0x00, 0x01, 0xB9, // program end
        ];
        let report = analyze(&data);

        assert_eq!(
            report.diagnostics().cloned().collect::<Vec<_>>(),
            vec![Diagnostic::TruncatedUnit {
                unit: "System Header".to_string()
            }]
        );
        let summary: Vec<(u64, &str)> = report
            .records()
            .iter()
            .map(|r| (r.location.offset, r.body.kind()))
            .collect();
        assert_eq!(summary, vec![(8, "gop"), (16, "start-code")]);
    }

    #[test]
    fn test_start_code_cut_by_end_of_input() {
        let data = [0x00, 0x00, 0x01, 0xB7, 0xAA, 0x00, 0x00, 0x01];
        let report = analyze(&data);

        assert_eq!(
            report.records()[0].body,
            RecordBody::StartCode(StartCodeKind::SequenceEnd)
        );
        assert_eq!(report.records().len(), 1);
        let diagnostics: Vec<_> = report.diagnostics().cloned().collect();
        assert_eq!(
            diagnostics,
            vec![Diagnostic::TruncatedUnit {
                unit: "start code".to_string()
            }]
        );
    }

    #[test]
    fn test_ps_pes_short_header_keeps_scanning() {
        // PTS flagged with a zero header data length
        let data = [
            0x00, 0x00, 0x01, 0xE0, 0x00, 0x03, 0x80, 0x80, 0x00, //
            0x00, 0x00, 0x01, 0xB8, 0x04, 0x28, 0x62, 0x40,
        ];
        let report = analyze(&data);

        let records = report.records();
        assert_eq!(records.len(), 2);
        match &records[0].body {
            RecordBody::Pes(pes) => {
                let header = pes.header.as_ref().unwrap();
                assert!(header.truncated);
                assert_eq!(header.timing.pts, None);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert_eq!((records[1].location.offset, records[1].body.kind()), (9, "gop"));
        assert_eq!(
            report.diagnostics().cloned().collect::<Vec<_>>(),
            vec![Diagnostic::TruncatedUnit {
                unit: "PES header".to_string()
            }]
        );
    }
}
