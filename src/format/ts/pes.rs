use std::fmt;

use super::types::{ticks_to_seconds, ClockReference};
use crate::error::{DumpError, Result};
use crate::format::report::{check_marker_bit, Diagnostic, Location, RecordBody, Report};
use crate::utils::BitReader;

/// Size of the fixed PES header: start code, stream id and length.
pub const PES_FIXED_HEADER_SIZE: usize = 6;

/// Audio stream id range (0xC0..=0xDF)
pub const STREAM_ID_AUDIO_MIN: u8 = 0xC0;
pub const STREAM_ID_AUDIO_MAX: u8 = 0xDF;
/// Video stream id range (0xE0..=0xEF)
pub const STREAM_ID_VIDEO_MIN: u8 = 0xE0;
pub const STREAM_ID_VIDEO_MAX: u8 = 0xEF;

/// Coarse classification of a PES stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Video,
    Other,
}

impl StreamKind {
    pub fn from_stream_id(stream_id: u8) -> Self {
        match stream_id {
            STREAM_ID_AUDIO_MIN..=STREAM_ID_AUDIO_MAX => StreamKind::Audio,
            STREAM_ID_VIDEO_MIN..=STREAM_ID_VIDEO_MAX => StreamKind::Video,
            _ => StreamKind::Other,
        }
    }

    /// Audio and video streams carry the optional PES header.
    pub fn has_optional_header(&self) -> bool {
        matches!(self, StreamKind::Audio | StreamKind::Video)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StreamKind::Audio => "Audio",
            StreamKind::Video => "Video",
            StreamKind::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Timing fields decoded from a PES optional header.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PesTiming {
    /// Presentation time stamp, 90 kHz ticks
    pub pts: Option<u64>,
    /// Decoding time stamp, 90 kHz ticks
    pub dts: Option<u64>,
    /// Elementary stream clock reference
    pub escr: Option<ClockReference>,
    /// Elementary stream rate in bytes per second
    pub es_rate: Option<u32>,
}

impl PesTiming {
    pub fn is_empty(&self) -> bool {
        self.pts.is_none() && self.dts.is_none() && self.escr.is_none() && self.es_rate.is_none()
    }

    pub fn pts_seconds(&self) -> Option<f64> {
        self.pts.map(ticks_to_seconds)
    }

    pub fn dts_seconds(&self) -> Option<f64> {
        self.dts.map(ticks_to_seconds)
    }

    pub fn escr_seconds(&self) -> Option<f64> {
        self.escr.map(|escr| escr.as_seconds())
    }
}

impl fmt::Display for PesTiming {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(dts) = self.dts_seconds() {
            parts.push(format!("DTS={:.6}", dts));
        }
        if let Some(pts) = self.pts_seconds() {
            parts.push(format!("PTS={:.6}", pts));
        }
        if let Some(escr) = self.escr_seconds() {
            parts.push(format!("ESCR={:.6}", escr));
        }
        if let Some(rate) = self.es_rate {
            parts.push(format!("ES_RATE={}", rate));
        }
        f.write_str(&parts.join(", "))
    }
}

/// The optional PES header that follows the fixed 6 bytes for audio and
/// video streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PesHeader {
    pub scrambling_control: u8,
    pub priority: bool,
    pub data_alignment: bool,
    pub copyright: bool,
    pub original: bool,
    /// 0 = none, 2 = PTS only, 3 = PTS and DTS
    pub pts_dts_flags: u8,
    pub escr_flag: bool,
    pub es_rate_flag: bool,
    pub dsm_trick_mode_flag: bool,
    pub additional_copy_info_flag: bool,
    pub crc_flag: bool,
    pub extension_flag: bool,
    pub header_data_length: u8,
    pub timing: PesTiming,
    /// The flagged fields ran past header-data-length; `timing` holds the
    /// fields decoded before that point.
    pub truncated: bool,
}

/// A PES unit located in a stream, with its optional header when decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PesUnit {
    pub stream_id: u8,
    pub kind: StreamKind,
    /// Bytes following the fixed 6-byte header.
    pub length: usize,
    /// True when the declared length was 0 and the length was inferred from
    /// the next unit boundary.
    pub inferred: bool,
    pub header: Option<PesHeader>,
}

impl PesUnit {
    pub fn timing(&self) -> Option<&PesTiming> {
        self.header.as_ref().map(|h| &h.timing)
    }
}

impl fmt::Display for PesUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} PES packet (stream 0x{:02X}) with length {}{}",
            self.kind,
            self.stream_id,
            self.length,
            if self.inferred { " (inferred)" } else { "" }
        )?;
        if let Some(header) = &self.header {
            write!(
                f,
                ": aligned={}, escr={}, es_rate={}",
                header.data_alignment as u8, header.escr_flag as u8, header.es_rate_flag as u8
            )?;
            if !header.timing.is_empty() {
                write!(f, ", {}", header.timing)?;
            }
        }
        Ok(())
    }
}

/// Decodes the optional PES header from the bytes following the fixed
/// 6-byte header.
///
/// Decoding is bounded by the header-data-length byte. Marker mismatches are
/// reported to `report` and decoding carries on with the bits as positioned.
pub fn decode_pes_header(data: &[u8], report: &mut Report, loc: Location) -> Result<PesHeader> {
    if data.len() < 3 {
        return Err(DumpError::InsufficientData {
            needed: 24,
            available: data.len() * 8,
        });
    }
    let end = data.len().min(3 + data[2] as usize);
    let mut reader = BitReader::new(&data[..end]);

    reader.skip_bits(2)?; // '10'
    let mut header = PesHeader {
        scrambling_control: reader.get_bits(2)? as u8,
        priority: reader.get_flag()?,
        data_alignment: reader.get_flag()?,
        copyright: reader.get_flag()?,
        original: reader.get_flag()?,
        pts_dts_flags: reader.get_bits(2)? as u8,
        escr_flag: reader.get_flag()?,
        es_rate_flag: reader.get_flag()?,
        dsm_trick_mode_flag: reader.get_flag()?,
        additional_copy_info_flag: reader.get_flag()?,
        crc_flag: reader.get_flag()?,
        extension_flag: reader.get_flag()?,
        header_data_length: reader.get_bits(8)? as u8,
        timing: PesTiming::default(),
        truncated: false,
    };

    match decode_timing_fields(&mut reader, &mut header, report, loc) {
        Ok(()) => {}
        Err(e) if e.is_insufficient_data() => {
            log::debug!("PES header fields run past header data length: {}", e);
            header.truncated = true;
            report.diagnostic(
                loc,
                Diagnostic::TruncatedUnit {
                    unit: "PES header".to_string(),
                },
            );
        }
        Err(e) => return Err(e),
    }

    Ok(header)
}

/// Decodes the flagged PTS/DTS/ESCR/ES rate fields into `header.timing`,
/// storing each field as soon as it is complete.
fn decode_timing_fields(
    reader: &mut BitReader,
    header: &mut PesHeader,
    report: &mut Report,
    loc: Location,
) -> Result<()> {
    if header.pts_dts_flags >= 2 {
        let prefix = reader.get_bits(4)?;
        if !(2..=3).contains(&prefix) {
            report.diagnostic(
                loc,
                Diagnostic::MarkerMismatch {
                    field: "PTS prefix",
                    expected: "2 or 3",
                    found: prefix,
                },
            );
        }
        header.timing.pts = Some(read_timestamp(reader, "PTS", report, loc)?);

        if header.pts_dts_flags == 3 {
            let prefix = reader.get_bits(4)?;
            if prefix != 1 {
                report.diagnostic(
                    loc,
                    Diagnostic::MarkerMismatch {
                        field: "DTS prefix",
                        expected: "1",
                        found: prefix,
                    },
                );
            }
            header.timing.dts = Some(read_timestamp(reader, "DTS", report, loc)?);
        }
    }

    if header.escr_flag {
        reader.skip_bits(2)?; // reserved
        let base = read_timestamp(reader, "ESCR", report, loc)?;
        let extension = reader.get_bits(9)? as u16;
        check_marker_bit(reader, "ESCR", report, loc)?;
        header.timing.escr = Some(ClockReference::new(base, extension));
    }

    if header.es_rate_flag {
        check_marker_bit(reader, "ES rate", report, loc)?;
        // Units are 50 bytes/sec
        let rate = reader.get_bits(22)? as u32 * 50;
        check_marker_bit(reader, "ES rate", report, loc)?;
        header.timing.es_rate = Some(rate);
    }

    Ok(())
}

/// Reads a 33-bit timestamp split into 3/15/15-bit groups, each followed by
/// a marker bit.
fn read_timestamp(
    reader: &mut BitReader,
    field: &'static str,
    report: &mut Report,
    loc: Location,
) -> Result<u64> {
    let mut ts = reader.get_bits(3)? << 30;
    check_marker_bit(reader, field, report, loc)?;
    ts |= reader.get_bits(15)? << 15;
    check_marker_bit(reader, field, report, loc)?;
    ts |= reader.get_bits(15)?;
    check_marker_bit(reader, field, report, loc)?;
    Ok(ts)
}
