use std::collections::BTreeMap;
use std::io::Read;

use bytes::BytesMut;

use super::parser::TsPacketParser;
use super::types::*;
use crate::config::AnalyzerConfig;
use crate::error::{DumpError, Result};
use crate::format::report::{Diagnostic, Location, RecordBody, Report};
use crate::format::timeline::{EventKind, PidEvent, Timeline};
use crate::utils::ByteSource;

/// Accumulated state for one PID.
///
/// Offsets in `events` are absolute within the PID's payload byte stream.
/// `payload` holds the bytes from `origin` on that have not been consumed by
/// PES reassembly yet.
#[derive(Debug, Clone, Default)]
pub struct PidStream {
    pub(crate) payload: BytesMut,
    pub(crate) origin: u64,
    pub(crate) events: Vec<PidEvent>,
    pub(crate) last_cc: Option<u8>,
    /// Offset of a unit whose length could not be determined, so it is
    /// reported once rather than on every pass.
    pub(crate) stalled_at: Option<u64>,
}

impl PidStream {
    /// Bytes appended but not yet consumed by reassembly.
    pub fn pending(&self) -> &[u8] {
        &self.payload
    }

    /// Absolute offset of the first pending byte.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Absolute offset one past the last appended byte.
    pub fn end_offset(&self) -> u64 {
        self.origin + self.payload.len() as u64
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> &[PidEvent] {
        &self.events
    }

    fn push_event(&mut self, kind: EventKind) {
        let offset = self.end_offset();
        self.events.push(PidEvent::new(offset, kind));
    }

    /// Checks the continuity counter against the previous packet, returning
    /// `(expected, found)` on a gap.
    ///
    /// The counter only advances on packets with payload. One duplicate of a
    /// payload packet is allowed, and a signalled discontinuity resets the
    /// check.
    fn check_continuity(&mut self, header: &TsHeader, discontinuity: bool) -> Option<(u8, u8)> {
        let found = header.continuity_counter;
        let gap = match self.last_cc {
            Some(last) if !discontinuity && header.pid != PID_NULL => {
                let expected = if header.contains_payload {
                    (last + 1) & 0x0F
                } else {
                    last
                };
                let duplicate = header.contains_payload && found == last;
                (found != expected && !duplicate).then_some((expected, found))
            }
            _ => None,
        };
        self.last_cc = Some(found);
        gap
    }
}

/// Per-PID state for one logical stream, threaded through every segment of
/// it and drained by PES reassembly.
#[derive(Debug, Clone, Default)]
pub struct DemuxState {
    pub(crate) streams: BTreeMap<u16, PidStream>,
}

impl DemuxState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream(&self, pid: u16) -> Option<&PidStream> {
        self.streams.get(&pid)
    }

    pub fn pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.streams.keys().copied()
    }

    /// Per-PID events sorted by offset.
    pub fn timeline(&self) -> Timeline {
        Timeline::from_events(
            self.streams
                .iter()
                .map(|(&pid, stream)| (pid, stream.events.as_slice())),
        )
    }

    /// Files one parsed packet under its PID.
    pub fn push_packet(
        &mut self,
        packet: &TsPacket,
        config: &AnalyzerConfig,
        report: &mut Report,
    ) {
        let header = &packet.header;
        if header.transport_error {
            log::debug!("transport error indicator set on PID {}", header.pid);
        }

        let stream = self.streams.entry(header.pid).or_default();
        let loc = Location::new(stream.end_offset(), Some(header.pid));

        let discontinuity = packet
            .adaptation
            .as_ref()
            .map_or(false, |af| af.discontinuity);
        let gap = stream.check_continuity(header, discontinuity);
        if let (Some((expected, found)), true) = (gap, config.check_continuity) {
            report.diagnostic(loc, Diagnostic::ContinuityGap { expected, found });
        }

        if header.payload_unit_start {
            stream.push_event(EventKind::UnitStart);
        }

        if let Some(af) = &packet.adaptation {
            if let Some(pcr) = af.pcr {
                log::debug!("PID {} PCR: {} = {}", header.pid, pcr.base, pcr);
                stream.push_event(EventKind::Pcr(pcr));
            }
            if let Some(opcr) = af.opcr {
                report.push(loc, RecordBody::Opcr(opcr));
            }
        }

        if header.contains_payload {
            log::trace!(
                "adding {} bytes to PID {} stream",
                packet.payload.len(),
                header.pid
            );
            stream.payload.extend_from_slice(&packet.payload);
        }
    }
}

/// Demultiplexes one transport stream segment into `state`.
///
/// The segment must start with a sync byte. A packet with a bad sync byte
/// ends the segment with `MalformedSegment`; packets before it stay in
/// `state`. A trailing partial packet is reported and ignored.
pub fn analyze_segment<R: Read>(
    source: &mut ByteSource<R>,
    state: &mut DemuxState,
    config: &AnalyzerConfig,
    report: &mut Report,
) -> Result<()> {
    match source.peek(1)?.first() {
        Some(&SYNC_BYTE) => {}
        Some(&byte) => {
            return Err(DumpError::MalformedSegment(format!(
                "not a transport stream: first byte is 0x{:02x}",
                byte
            )))
        }
        None => return Err(DumpError::MalformedSegment("empty segment".to_string())),
    }

    let parser = TsPacketParser::new();
    let mut packets = 0usize;
    loop {
        let offset = source.logical_position();
        let data = source.read(TS_PACKET_SIZE)?;
        if data.is_empty() {
            break;
        }
        if data.len() < TS_PACKET_SIZE {
            report.diagnostic(
                Location::new(offset, None),
                Diagnostic::TruncatedPacket { bytes: data.len() },
            );
            break;
        }

        let packet = parser.parse_packet(&data).map_err(|e| match e {
            DumpError::MalformedSegment(msg) => {
                DumpError::MalformedSegment(format!("{} at offset {}", msg, offset))
            }
            e => e,
        })?;
        state.push_packet(&packet, config, report);
        packets += 1;
    }

    log::debug!("demuxed {} packets", packets);
    Ok(())
}
