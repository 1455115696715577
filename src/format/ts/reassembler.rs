use bytes::Buf;

use super::demuxer::{DemuxState, PidStream};
use super::pes::{decode_pes_header, PesUnit, StreamKind, PES_FIXED_HEADER_SIZE};
use crate::config::AnalyzerConfig;
use crate::error::{DumpError, Result};
use crate::format::report::{Diagnostic, Location, RecordBody, Report};
use crate::format::timeline::{EventKind, PidEvent};
use crate::utils::ByteSource;

/// Extracts every complete PES unit buffered for each PID.
///
/// Units still missing bytes stay buffered, so this can run after every
/// segment of a stream. A PID that exceeds `max_pending_bytes` is reported
/// and its pending bytes dropped; other PIDs are unaffected.
pub fn analyze_program_streams(
    state: &mut DemuxState,
    config: &AnalyzerConfig,
    report: &mut Report,
) -> Result<()> {
    for (&pid, stream) in state.streams.iter_mut() {
        log::debug!("Analyzing program stream {}...", pid);
        match reassemble(pid, stream, config, report) {
            Ok(()) => {}
            Err(DumpError::OversizedUnit {
                pid,
                pending,
                limit,
            }) => {
                report.diagnostic(
                    Location::new(stream.origin, Some(pid)),
                    Diagnostic::OversizedUnit { pending, limit },
                );
                stream.origin += stream.payload.len() as u64;
                stream.payload.clear();
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn reassemble(
    pid: u16,
    stream: &mut PidStream,
    config: &AnalyzerConfig,
    report: &mut Report,
) -> Result<()> {
    let PidStream {
        payload,
        origin,
        events,
        stalled_at,
        ..
    } = stream;

    let mut source = ByteSource::new(&payload[..]).with_peek_size(config.initial_peek_size);
    while let Some(index) = source.find_next_start_code(0, false)? {
        // Wait until the fixed header is buffered
        if source.peek(index + PES_FIXED_HEADER_SIZE)?.len() < index + PES_FIXED_HEADER_SIZE {
            break;
        }
        if index > 0 {
            let at = *origin + source.logical_position();
            report.diagnostic(Location::new(at, Some(pid)), Diagnostic::Discarded { bytes: index });
            source.skip(index)?;
        }

        let unit_offset = *origin + source.logical_position();
        let loc = Location::new(unit_offset, Some(pid));
        let head = source.peek(PES_FIXED_HEADER_SIZE)?;
        let stream_id = head[3];
        let declared = u16::from_be_bytes([head[4], head[5]]) as usize;

        let (length, inferred) = if declared == 0 {
            match infer_length(&mut source, events, unit_offset)? {
                Some(length) => {
                    log::debug!("Determined packet length to be {}", length);
                    (length, true)
                }
                None => {
                    if *stalled_at != Some(unit_offset) {
                        report.diagnostic(loc, Diagnostic::UndeterminedPesLength { stream_id });
                        *stalled_at = Some(unit_offset);
                    }
                    break;
                }
            }
        } else {
            (declared, false)
        };

        let total = length + PES_FIXED_HEADER_SIZE;
        if source.peek(total)?.len() < total {
            break;
        }
        let unit = source.read_exact(total)?;

        let kind = StreamKind::from_stream_id(stream_id);
        let header = if kind.has_optional_header() {
            match decode_pes_header(&unit[PES_FIXED_HEADER_SIZE..], report, loc) {
                Ok(header) => Some(header),
                // Too short for even the fixed part of the optional header
                Err(e) if e.is_insufficient_data() => {
                    report.diagnostic(
                        loc,
                        Diagnostic::TruncatedUnit {
                            unit: "PES header".to_string(),
                        },
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        if let Some(timing) = header.as_ref().map(|h| h.timing) {
            if !timing.is_empty() {
                events.push(PidEvent::new(unit_offset, EventKind::PesTiming(timing)));
            }
        }
        report.push(
            loc,
            RecordBody::Pes(PesUnit {
                stream_id,
                kind,
                length,
                inferred,
                header,
            }),
        );
    }

    let consumed = source.logical_position();
    payload.advance(consumed as usize);
    *origin += consumed;

    match config.max_pending_bytes {
        Some(limit) if payload.len() > limit => Err(DumpError::OversizedUnit {
            pid,
            pending: payload.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// Infers the length of a zero-length unit at `unit_offset` from the first
/// start code at or after the next unit-start event.
fn infer_length(
    source: &mut ByteSource<&[u8]>,
    events: &[PidEvent],
    unit_offset: u64,
) -> Result<Option<usize>> {
    let next = events
        .iter()
        .find(|e| e.is_unit_start() && e.offset > unit_offset);
    let Some(next) = next else {
        return Ok(None);
    };

    let from = (next.offset - unit_offset) as usize;
    Ok(source
        .find_next_start_code(from, false)?
        .and_then(|index| index.checked_sub(PES_FIXED_HEADER_SIZE)))
}
