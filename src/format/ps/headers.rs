use std::io::Read;

use super::types::*;
use crate::error::{DumpError, Result};
use crate::format::report::{check_marker_bit, Diagnostic, Location, Report};
use crate::format::ts::pes::{decode_pes_header, PesUnit, StreamKind};
use crate::format::ts::types::ClockReference;
use crate::utils::{BitReader, ByteSource};

/// Decodes a pack header: 10 bytes followed by up to 7 stuffing bytes.
pub fn decode_pack_header<R: Read>(
    source: &mut ByteSource<R>,
    report: &mut Report,
    loc: Location,
) -> Result<PackHeader> {
    let mut reader = BitReader::new(&source.read_exact(10)?);

    let prefix = reader.get_bits(2)?;
    if prefix != 0b01 {
        report.diagnostic(
            loc,
            Diagnostic::MarkerMismatch {
                field: "pack header prefix",
                expected: "01",
                found: prefix,
            },
        );
    }

    let mut scr = reader.get_bits(3)? << 30;
    check_marker_bit(&mut reader, "SCR", report, loc)?;
    scr |= reader.get_bits(15)? << 15;
    check_marker_bit(&mut reader, "SCR", report, loc)?;
    scr |= reader.get_bits(15)?;
    check_marker_bit(&mut reader, "SCR", report, loc)?;
    let scr_ext = reader.get_bits(9)? as u16;
    check_marker_bit(&mut reader, "SCR", report, loc)?;

    let mux_rate = reader.get_bits(22)? as u32;
    check_marker_bit(&mut reader, "mux rate", report, loc)?;
    check_marker_bit(&mut reader, "mux rate", report, loc)?;
    reader.skip_bits(5)?; // reserved
    let stuffing_length = reader.get_bits(3)? as u8;

    source.skip(stuffing_length as usize)?;

    Ok(PackHeader {
        scr: ClockReference::new(scr, scr_ext),
        mux_rate,
        stuffing_length,
    })
}

/// Decodes a length-prefixed system header and its stream bound list.
pub fn decode_system_header<R: Read>(
    source: &mut ByteSource<R>,
    report: &mut Report,
    loc: Location,
) -> Result<SystemHeader> {
    let header_length = source.read_u16()?;
    let mut reader = BitReader::new(&source.read_exact(header_length as usize)?);

    check_marker_bit(&mut reader, "rate bound", report, loc)?;
    let rate_bound = reader.get_bits(22)? as u32;
    check_marker_bit(&mut reader, "rate bound", report, loc)?;
    let audio_bound = reader.get_bits(6)? as u8;
    let fixed_bitrate = reader.get_flag()?;
    let constrained_parameters = reader.get_flag()?;
    let system_audio_lock = reader.get_flag()?;
    let system_video_lock = reader.get_flag()?;
    check_marker_bit(&mut reader, "video bound", report, loc)?;
    let video_bound = reader.get_bits(5)? as u8;
    let packet_rate_restriction = reader.get_flag()?;
    reader.skip_bits(7)?; // reserved

    let mut streams = Vec::new();
    while reader.remaining_bits() >= 24 && reader.peek_bits(1)? == 1 {
        let stream_id = reader.get_bits(8)? as u8;
        if stream_id < 0xBC && stream_id != 0xB8 && stream_id != 0xB9 {
            report.diagnostic(loc, Diagnostic::BadSystemStreamId { stream_id });
        }
        reader.skip_bits(2)?; // '11'
        streams.push(StreamBound {
            stream_id,
            buffer_bound_scale: reader.get_flag()?,
            buffer_size_bound: reader.get_bits(13)? as u16,
        });
    }

    Ok(SystemHeader {
        header_length,
        rate_bound,
        audio_bound,
        fixed_bitrate,
        constrained_parameters,
        system_audio_lock,
        system_video_lock,
        video_bound,
        packet_rate_restriction,
        streams,
    })
}

/// Decodes a sequence header, including the optional quantiser matrices.
///
/// The intra matrix starts on the last bit of the fixed 8 bytes, so its 64
/// bytes are appended to the same bit reader; the non-intra flag is the bit
/// that follows it.
pub fn decode_sequence_header<R: Read>(
    source: &mut ByteSource<R>,
    report: &mut Report,
    loc: Location,
) -> Result<SequenceHeader> {
    let mut reader = BitReader::new(&source.read_exact(8)?);

    let width = reader.get_bits(12)? as u16;
    let height = reader.get_bits(12)? as u16;
    let aspect_ratio = AspectRatio::from_code(reader.get_bits(4)? as u8);
    let frame_rate = FrameRate::from_code(reader.get_bits(4)? as u8);
    let bit_rate = reader.get_bits(18)? as u32;
    check_marker_bit(&mut reader, "sequence header", report, loc)?;
    let vbv_buffer_size = reader.get_bits(10)? as u16;
    let constrained_parameters = reader.get_flag()?;

    let intra_quantiser_matrix = if reader.get_flag()? {
        reader.append(&source.read_exact(64)?);
        let matrix = (0..64)
            .map(|_| reader.get_bits(8).map(|v| v as u8))
            .collect::<Result<Vec<u8>>>()?;
        Some(matrix)
    } else {
        None
    };

    let non_intra_quantiser_matrix = if reader.get_flag()? {
        Some(source.read_exact(64)?.to_vec())
    } else {
        None
    };

    Ok(SequenceHeader {
        width,
        height,
        aspect_ratio,
        frame_rate,
        bit_rate,
        vbv_buffer_size,
        constrained_parameters,
        intra_quantiser_matrix,
        non_intra_quantiser_matrix,
    })
}

/// Decodes an extension unit. The kind is the high nibble of the first
/// byte; unknown kinds are returned without consuming anything.
pub fn decode_extension<R: Read>(
    source: &mut ByteSource<R>,
    report: &mut Report,
    loc: Location,
) -> Result<Extension> {
    let leading_byte = match source.peek(1)?.first() {
        Some(&b) => b,
        None => {
            return Err(DumpError::InsufficientData {
                needed: 8,
                available: 0,
            })
        }
    };

    match leading_byte >> 4 {
        1 => {
            let mut reader = BitReader::new(&source.read_exact(6)?);
            reader.skip_bits(4)?;
            let profile_and_level = reader.get_bits(8)? as u8;
            let progressive_sequence = reader.get_flag()?;
            let chroma_format = reader.get_bits(2)? as u8;
            let horizontal_size_ext = reader.get_bits(2)? as u8;
            let vertical_size_ext = reader.get_bits(2)? as u8;
            let bit_rate_ext = reader.get_bits(12)? as u16;
            check_marker_bit(&mut reader, "sequence extension", report, loc)?;
            Ok(Extension::Sequence(SequenceExtension {
                profile_and_level,
                progressive_sequence,
                chroma_format,
                horizontal_size_ext,
                vertical_size_ext,
                bit_rate_ext,
                vbv_buffer_size_ext: reader.get_bits(8)? as u8,
                low_delay: reader.get_flag()?,
                frame_rate_ext_n: reader.get_bits(2)? as u8,
                frame_rate_ext_d: reader.get_bits(5)? as u8,
            }))
        }
        2 => {
            let has_colour = leading_byte & 1 == 1;
            let size = if has_colour { 8 } else { 5 };
            let mut reader = BitReader::new(&source.read_exact(size)?);
            reader.skip_bits(4)?;
            let video_format = reader.get_bits(3)? as u8;
            reader.skip_bits(1)?; // colour_description flag, already peeked
            let colour_description = if has_colour {
                Some(ColourDescription {
                    colour_primaries: reader.get_bits(8)? as u8,
                    transfer_characteristics: reader.get_bits(8)? as u8,
                    matrix_coefficients: reader.get_bits(8)? as u8,
                })
            } else {
                None
            };
            let display_horizontal_size = reader.get_bits(14)? as u16;
            check_marker_bit(&mut reader, "display extension", report, loc)?;
            let display_vertical_size = reader.get_bits(14)? as u16;
            Ok(Extension::SequenceDisplay(SequenceDisplayExtension {
                video_format,
                colour_description,
                display_horizontal_size,
                display_vertical_size,
            }))
        }
        8 => {
            // composite_display_flag is bit 33
            let head = source.peek(5)?;
            let composite = head.len() == 5 && head[4] & 0x40 != 0;
            let size = if composite { 7 } else { 5 };
            let mut reader = BitReader::new(&source.read_exact(size)?);
            reader.skip_bits(4)?;
            let mut f_codes = [[0u8; 2]; 2];
            for row in f_codes.iter_mut() {
                for code in row.iter_mut() {
                    *code = reader.get_bits(4)? as u8;
                }
            }
            Ok(Extension::PictureCoding(PictureCodingExtension {
                f_codes,
                intra_dc_precision: reader.get_bits(2)? as u8,
                picture_structure: reader.get_bits(2)? as u8,
                top_field_first: reader.get_flag()?,
                frame_pred_frame_dct: reader.get_flag()?,
                concealment_motion_vectors: reader.get_flag()?,
                q_scale_type: reader.get_flag()?,
                intra_vlc_format: reader.get_flag()?,
                alternate_scan: reader.get_flag()?,
                repeat_first_field: reader.get_flag()?,
                chroma_420_type: reader.get_flag()?,
                progressive_frame: reader.get_flag()?,
                composite_display: reader.get_flag()?,
            }))
        }
        kind => Ok(Extension::Unknown(kind)),
    }
}

pub fn decode_gop_header<R: Read>(
    source: &mut ByteSource<R>,
    report: &mut Report,
    loc: Location,
) -> Result<GopHeader> {
    let mut reader = BitReader::new(&source.read_exact(4)?);
    let drop_frame = reader.get_flag()?;
    let hours = reader.get_bits(5)? as u8;
    let minutes = reader.get_bits(6)? as u8;
    check_marker_bit(&mut reader, "time code", report, loc)?;
    Ok(GopHeader {
        drop_frame,
        hours,
        minutes,
        seconds: reader.get_bits(6)? as u8,
        pictures: reader.get_bits(6)? as u8,
        closed: reader.get_flag()?,
        broken: reader.get_flag()?,
    })
}

/// Decodes a picture header. P and B pictures carry motion vector codes
/// past the fixed 4 bytes; one more byte is pulled in when needed.
pub fn decode_picture_header<R: Read>(source: &mut ByteSource<R>) -> Result<PictureHeader> {
    let mut reader = BitReader::new(&source.read_exact(4)?);
    let temporal_reference = reader.get_bits(10)? as u16;
    let frame_type = FrameType::from_code(reader.get_bits(3)? as u8);
    let vbv_delay = reader.get_bits(16)? as u16;

    let mut read_motion_code = |reader: &mut BitReader| -> Result<MotionCode> {
        if reader.remaining_bits() < 4 {
            reader.append(&source.read_exact(1)?);
        }
        Ok(MotionCode {
            full_pel: reader.get_flag()?,
            f_code: reader.get_bits(3)? as u8,
        })
    };

    let forward = if frame_type.has_forward_vector() {
        Some(read_motion_code(&mut reader)?)
    } else {
        None
    };
    let backward = if frame_type.has_backward_vector() {
        Some(read_motion_code(&mut reader)?)
    } else {
        None
    };

    Ok(PictureHeader {
        temporal_reference,
        frame_type,
        vbv_delay,
        forward,
        backward,
    })
}

/// Decodes private stream 2: a 16-bit length, a kind byte and the payload.
pub fn decode_private_stream_2<R: Read>(source: &mut ByteSource<R>) -> Result<PrivateStream2> {
    let length = source.read_u16()?;
    if length == 0 {
        return Ok(PrivateStream2 {
            length,
            kind: None,
            payload: Default::default(),
        });
    }

    let kind = NavigationKind::from_code(source.read_u8()?);
    let payload = source.read(length as usize - 1)?;
    Ok(PrivateStream2 {
        length,
        kind: Some(kind),
        payload,
    })
}

/// Decodes the header of a PES unit found while scanning a program stream.
///
/// Only the fixed header and the optional header are consumed, so structural
/// units carried in the payload are still found by the scan.
pub fn decode_ps_pes<R: Read>(
    source: &mut ByteSource<R>,
    stream_id: u8,
    report: &mut Report,
    loc: Location,
) -> Result<PesUnit> {
    let length = source.read_u16()? as usize;
    let kind = StreamKind::from_stream_id(stream_id);

    let header = if kind.has_optional_header() && length >= 3 {
        let header_data_length = match source.peek(3)?.get(2) {
            Some(&len) => len as usize,
            None => {
                return Err(DumpError::InsufficientData {
                    needed: 24,
                    available: source.buffered() * 8,
                })
            }
        };
        let data = source.read_exact(3 + header_data_length)?;
        Some(decode_pes_header(&data, report, loc)?)
    } else {
        None
    };

    Ok(PesUnit {
        stream_id,
        kind,
        length,
        inferred: false,
        header,
    })
}

/// Skips the declared payload of a length-prefixed unit, returning its length.
pub fn skip_length_prefixed<R: Read>(source: &mut ByteSource<R>) -> Result<usize> {
    let length = source.read_u16()? as usize;
    source.skip(length)
}
