use std::fmt;
use std::io::Write;

use crate::error::Result;
use crate::format::ps::types::{
    Extension, GopHeader, PackHeader, PictureHeader, PrivateStream2, SequenceHeader,
    StartCodeKind, SystemHeader,
};
use crate::format::ts::pes::PesUnit;
use crate::format::ts::types::ClockReference;
use crate::utils::BitReader;

/// Where a record was found: a byte offset and, for TS input, the PID whose
/// elementary byte stream the offset refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub offset: u64,
    pub pid: Option<u16>,
}

impl Location {
    pub fn new(offset: u64, pid: Option<u16>) -> Self {
        Self { offset, pid }
    }
}

/// Non-fatal conditions found while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Start code with no known meaning, payload skipped.
    UnknownUnitType { code: u8 },
    /// Sequence extension kind that is not decoded.
    UnknownExtension { kind: u8 },
    MarkerMismatch {
        field: &'static str,
        expected: &'static str,
        found: u64,
    },
    /// Bytes skipped while looking for the next start code.
    Discarded { bytes: usize },
    /// Zero-length PES unit with no later boundary to infer its length from.
    UndeterminedPesLength { stream_id: u8 },
    /// System header stream id below 0xBC that is not 0xB8 or 0xB9.
    BadSystemStreamId { stream_id: u8 },
    ContinuityGap { expected: u8, found: u8 },
    /// Trailing bytes shorter than a transport packet.
    TruncatedPacket { bytes: usize },
    /// A unit whose span ran past the end of the input.
    TruncatedUnit { unit: String },
    OversizedUnit { pending: usize, limit: usize },
    /// A segment that was abandoned after a fatal error.
    SegmentFailed { reason: String },
}

impl Diagnostic {
    pub fn name(&self) -> &'static str {
        match self {
            Diagnostic::UnknownUnitType { .. } => "unknown-unit-type",
            Diagnostic::UnknownExtension { .. } => "unknown-extension",
            Diagnostic::MarkerMismatch { .. } => "marker-mismatch",
            Diagnostic::Discarded { .. } => "discarded",
            Diagnostic::UndeterminedPesLength { .. } => "undetermined-pes-length",
            Diagnostic::BadSystemStreamId { .. } => "bad-system-stream-id",
            Diagnostic::ContinuityGap { .. } => "continuity-gap",
            Diagnostic::TruncatedPacket { .. } => "truncated-packet",
            Diagnostic::TruncatedUnit { .. } => "truncated-unit",
            Diagnostic::OversizedUnit { .. } => "oversized-unit",
            Diagnostic::SegmentFailed { .. } => "segment-failed",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::UnknownUnitType { code } => {
                write!(f, "Unknown start code 0x000001{:02X}", code)
            }
            Diagnostic::UnknownExtension { kind } => write!(f, "Unknown extension kind {}", kind),
            Diagnostic::MarkerMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "Invalid {} marker: expected {}, found {}",
                field, expected, found
            ),
            Diagnostic::Discarded { bytes } => write!(f, "Discarded {} bytes", bytes),
            Diagnostic::UndeterminedPesLength { stream_id } => write!(
                f,
                "Unable to determine length of PES packet (stream 0x{:02X})",
                stream_id
            ),
            Diagnostic::BadSystemStreamId { stream_id } => {
                write!(f, "Bad stream id 0x{:02X} in system header", stream_id)
            }
            Diagnostic::ContinuityGap { expected, found } => write!(
                f,
                "Continuity counter gap: expected {}, found {}",
                expected, found
            ),
            Diagnostic::TruncatedPacket { bytes } => {
                write!(f, "Truncated transport packet of {} bytes", bytes)
            }
            Diagnostic::TruncatedUnit { unit } => write!(f, "Truncated {}", unit),
            Diagnostic::OversizedUnit { pending, limit } => write!(
                f,
                "Oversized unit: {} bytes pending, limit is {}",
                pending, limit
            ),
            Diagnostic::SegmentFailed { reason } => write!(f, "Segment failed: {}", reason),
        }
    }
}

/// The decoded content of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Pack(PackHeader),
    System(SystemHeader),
    Sequence(SequenceHeader),
    Extension(Extension),
    Gop(GopHeader),
    Picture(PictureHeader),
    PrivateStream2(PrivateStream2),
    Pes(PesUnit),
    Opcr(ClockReference),
    /// A recognized start code whose payload is not decoded.
    StartCode(StartCodeKind),
    Diagnostic(Diagnostic),
}

impl RecordBody {
    /// Short kind name, used as the first column of the tabular export.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordBody::Pack(_) => "pack",
            RecordBody::System(_) => "system",
            RecordBody::Sequence(_) => "sequence",
            RecordBody::Extension(_) => "extension",
            RecordBody::Gop(_) => "gop",
            RecordBody::Picture(_) => "picture",
            RecordBody::PrivateStream2(_) => "private-stream-2",
            RecordBody::Pes(_) => "pes",
            RecordBody::Opcr(_) => "opcr",
            RecordBody::StartCode(_) => "start-code",
            RecordBody::Diagnostic(d) => d.name(),
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, RecordBody::Diagnostic(_))
    }
}

impl fmt::Display for RecordBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordBody::Pack(h) => h.fmt(f),
            RecordBody::System(h) => h.fmt(f),
            RecordBody::Sequence(h) => h.fmt(f),
            RecordBody::Extension(h) => h.fmt(f),
            RecordBody::Gop(h) => h.fmt(f),
            RecordBody::Picture(h) => h.fmt(f),
            RecordBody::PrivateStream2(h) => h.fmt(f),
            RecordBody::Pes(p) => p.fmt(f),
            RecordBody::Opcr(c) => write!(f, "OPCR: {}", c),
            RecordBody::StartCode(kind) => {
                write!(f, "Found 0x000001{:02X} = {}", kind.code(), kind)
            }
            RecordBody::Diagnostic(d) => d.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub location: Location,
    pub body: RecordBody,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.location.pid {
            Some(pid) => write!(
                f,
                "Offset: {:8} [PID 0x{:04X}] - {}",
                self.location.offset, pid, self.body
            ),
            None => write!(f, "Offset: {:8} - {}", self.location.offset, self.body),
        }
    }
}

/// Ordered list of everything decoded or diagnosed during an analysis.
///
/// Records are kept in the order they were found. Each push is also logged:
/// diagnostics at `warn`, decoded units at `info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    records: Vec<Record>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, location: Location, body: RecordBody) {
        let record = Record { location, body };
        if record.body.is_diagnostic() {
            log::warn!("{}", record);
        } else {
            log::info!("{}", record);
        }
        self.records.push(record);
    }

    pub fn diagnostic(&mut self, location: Location, diagnostic: Diagnostic) {
        self.push(location, RecordBody::Diagnostic(diagnostic));
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter_map(|r| match &r.body {
            RecordBody::Diagnostic(d) => Some(d),
            _ => None,
        })
    }

    /// Moves all records of `other` to the end of this report.
    pub fn extend(&mut self, other: Report) {
        self.records.extend(other.records);
    }

    /// Writes the records as tab-separated `offset pid kind summary` rows.
    pub fn write_tsv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "offset\tpid\tkind\tsummary")?;
        for record in &self.records {
            let pid = record
                .location
                .pid
                .map(|pid| pid.to_string())
                .unwrap_or_default();
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                record.location.offset,
                pid,
                record.body.kind(),
                record.body
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record)?;
        }
        Ok(())
    }
}

/// Reads one marker bit, reporting a mismatch when it is not set.
///
/// Decoding always carries on from the bit after the marker.
pub(crate) fn check_marker_bit(
    reader: &mut BitReader,
    field: &'static str,
    report: &mut Report,
    location: Location,
) -> Result<()> {
    let bit = reader.get_bits(1)?;
    if bit != 1 {
        report.diagnostic(
            location,
            Diagnostic::MarkerMismatch {
                field,
                expected: "1",
                found: bit,
            },
        );
    }
    Ok(())
}
