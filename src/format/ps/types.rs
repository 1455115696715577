use std::fmt;

use bytes::Bytes;

use crate::format::ts::types::ClockReference;

/// The unit type selected by the byte following a `00 00 01` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCodeKind {
    Picture,
    Slice(u8),
    UserData,
    SequenceHeader,
    SequenceError,
    Extension,
    SequenceEnd,
    GroupOfPictures,
    ProgramEnd,
    PackHeader,
    SystemHeader,
    ProgramStreamMap,
    PrivateStream1,
    Padding,
    PrivateStream2,
    /// Audio stream 0..=31 (0xC0..=0xDF)
    Audio(u8),
    /// Video stream 0..=15 (0xE0..=0xEF)
    Video(u8),
    Directory,
    Reserved(u8),
    Unknown(u8),
}

impl StartCodeKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => StartCodeKind::Picture,
            0x01..=0xAF => StartCodeKind::Slice(code),
            0xB2 => StartCodeKind::UserData,
            0xB3 => StartCodeKind::SequenceHeader,
            0xB4 => StartCodeKind::SequenceError,
            0xB5 => StartCodeKind::Extension,
            0xB7 => StartCodeKind::SequenceEnd,
            0xB8 => StartCodeKind::GroupOfPictures,
            0xB9 => StartCodeKind::ProgramEnd,
            0xBA => StartCodeKind::PackHeader,
            0xBB => StartCodeKind::SystemHeader,
            0xBC => StartCodeKind::ProgramStreamMap,
            0xBD => StartCodeKind::PrivateStream1,
            0xBE => StartCodeKind::Padding,
            0xBF => StartCodeKind::PrivateStream2,
            0xC0..=0xDF => StartCodeKind::Audio(code - 0xC0),
            0xE0..=0xEF => StartCodeKind::Video(code - 0xE0),
            0xFF => StartCodeKind::Directory,
            0xB0 | 0xB1 | 0xB6 | 0xFA..=0xFE => StartCodeKind::Reserved(code),
            _ => StartCodeKind::Unknown(code),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            StartCodeKind::Picture => 0x00,
            StartCodeKind::Slice(code) => code,
            StartCodeKind::UserData => 0xB2,
            StartCodeKind::SequenceHeader => 0xB3,
            StartCodeKind::SequenceError => 0xB4,
            StartCodeKind::Extension => 0xB5,
            StartCodeKind::SequenceEnd => 0xB7,
            StartCodeKind::GroupOfPictures => 0xB8,
            StartCodeKind::ProgramEnd => 0xB9,
            StartCodeKind::PackHeader => 0xBA,
            StartCodeKind::SystemHeader => 0xBB,
            StartCodeKind::ProgramStreamMap => 0xBC,
            StartCodeKind::PrivateStream1 => 0xBD,
            StartCodeKind::Padding => 0xBE,
            StartCodeKind::PrivateStream2 => 0xBF,
            StartCodeKind::Audio(n) => 0xC0 + n,
            StartCodeKind::Video(n) => 0xE0 + n,
            StartCodeKind::Directory => 0xFF,
            StartCodeKind::Reserved(code) | StartCodeKind::Unknown(code) => code,
        }
    }

    /// Stream ids at or above 0xBC carry a 16-bit length after the start
    /// code.
    pub fn is_length_prefixed(&self) -> bool {
        self.code() >= 0xBC
    }
}

impl fmt::Display for StartCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StartCodeKind::Picture => f.write_str("Picture"),
            StartCodeKind::Slice(_) => f.write_str("Slice"),
            StartCodeKind::UserData => f.write_str("User Data"),
            StartCodeKind::SequenceHeader => f.write_str("Sequence Header"),
            StartCodeKind::SequenceError => f.write_str("Sequence Error"),
            StartCodeKind::Extension => f.write_str("Extension"),
            StartCodeKind::SequenceEnd => f.write_str("Sequence End"),
            StartCodeKind::GroupOfPictures => f.write_str("Group of Pictures"),
            StartCodeKind::ProgramEnd => f.write_str("Program End"),
            StartCodeKind::PackHeader => f.write_str("Pack Header"),
            StartCodeKind::SystemHeader => f.write_str("System Header"),
            StartCodeKind::ProgramStreamMap => f.write_str("Program Stream Map"),
            StartCodeKind::PrivateStream1 => {
                f.write_str("Private Stream 1 (Non-MPEG Audio, Subpictures)")
            }
            StartCodeKind::Padding => f.write_str("Padding Stream"),
            StartCodeKind::PrivateStream2 => f.write_str("Private Stream 2 (Navigation Data)"),
            StartCodeKind::Audio(n) => write!(f, "Audio Stream {}", n),
            StartCodeKind::Video(n) => write!(f, "Video Stream {}", n),
            StartCodeKind::Directory => f.write_str("Program Stream Directory"),
            StartCodeKind::Reserved(_) => f.write_str("Reserved"),
            StartCodeKind::Unknown(_) => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Forbidden,
    Square,
    FourByThree,
    SixteenByNine,
    TwoTwentyOne,
    Unknown(u8),
}

impl AspectRatio {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AspectRatio::Forbidden,
            1 => AspectRatio::Square,
            2 => AspectRatio::FourByThree,
            3 => AspectRatio::SixteenByNine,
            4 => AspectRatio::TwoTwentyOne,
            _ => AspectRatio::Unknown(code),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AspectRatio::Forbidden => "Forbidden",
            AspectRatio::Square => "1:1",
            AspectRatio::FourByThree => "4:3",
            AspectRatio::SixteenByNine => "16:9",
            AspectRatio::TwoTwentyOne => "2.21:1",
            AspectRatio::Unknown(_) => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRate {
    Forbidden,
    Fps23_976,
    Fps24,
    Fps25,
    Fps29_97,
    Fps30,
    Fps50,
    Fps59_94,
    Fps60,
    Unknown(u8),
}

impl FrameRate {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => FrameRate::Forbidden,
            1 => FrameRate::Fps23_976,
            2 => FrameRate::Fps24,
            3 => FrameRate::Fps25,
            4 => FrameRate::Fps29_97,
            5 => FrameRate::Fps30,
            6 => FrameRate::Fps50,
            7 => FrameRate::Fps59_94,
            8 => FrameRate::Fps60,
            _ => FrameRate::Unknown(code),
        }
    }

    /// Frames per second as a (numerator, denominator) pair.
    pub fn as_fraction(&self) -> Option<(u32, u32)> {
        match self {
            FrameRate::Fps23_976 => Some((24000, 1001)),
            FrameRate::Fps24 => Some((24, 1)),
            FrameRate::Fps25 => Some((25, 1)),
            FrameRate::Fps29_97 => Some((30000, 1001)),
            FrameRate::Fps30 => Some((30, 1)),
            FrameRate::Fps50 => Some((50, 1)),
            FrameRate::Fps59_94 => Some((60000, 1001)),
            FrameRate::Fps60 => Some((60, 1)),
            FrameRate::Forbidden | FrameRate::Unknown(_) => None,
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_fraction() {
            Some((n, 1)) => write!(f, "{}", n),
            Some((n, d)) => write!(f, "{}/{} = {:.3}", n, d, n as f64 / d as f64),
            None if *self == FrameRate::Forbidden => f.write_str("Forbidden"),
            None => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    I,
    P,
    B,
    D,
    Unknown(u8),
}

impl FrameType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => FrameType::I,
            2 => FrameType::P,
            3 => FrameType::B,
            4 => FrameType::D,
            _ => FrameType::Unknown(code),
        }
    }

    pub fn has_forward_vector(&self) -> bool {
        matches!(self, FrameType::P | FrameType::B)
    }

    pub fn has_backward_vector(&self) -> bool {
        matches!(self, FrameType::B)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameType::I => f.write_str("I"),
            FrameType::P => f.write_str("P"),
            FrameType::B => f.write_str("B"),
            FrameType::D => f.write_str("D"),
            FrameType::Unknown(code) => write!(f, "Unknown({})", code),
        }
    }
}

pub fn colour_primaries_name(code: u8) -> &'static str {
    match code {
        0 => "Forbidden",
        1 => "BT.709",
        2 => "Unspecified",
        3 => "Reserved/future",
        4 => "BT.470-6/NTSC 1953",
        5 => "EBU Tech 3213",
        6 => "SMPTE RP 145",
        7 => "SMPTE 240M",
        8 => "Generic film",
        _ => "Unknown",
    }
}

pub fn transfer_characteristics_name(code: u8) -> &'static str {
    match code {
        0 => "Forbidden",
        1 | 6 => "BT.709",
        2 => "Unspecified",
        3 => "Reserved/future",
        4 => "Display gamma 2.2",
        5 => "Display gamma 2.8",
        7 => "SMPTE 240M",
        8 => "Linear",
        9 => "Log (10^2:1)",
        10 => "Log (10^2.5:1)",
        11 => "xvYCC",
        12 => "BT.1361",
        _ => "Reserved",
    }
}

pub fn matrix_coefficients_name(code: u8) -> &'static str {
    match code {
        0 => "Forbidden/BR",
        1 => "BT.709",
        2 => "Unspecified",
        3 => "Reserved/future",
        4..=6 => "BT.601",
        7 => "SMPTE 240M",
        8 => "Y'CgCo",
        _ => "Reserved",
    }
}

/// Pack header (0xBA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    /// System clock reference: 33-bit base and 9-bit extension
    pub scr: ClockReference,
    /// Program mux rate in units of 50 bytes/sec
    pub mux_rate: u32,
    pub stuffing_length: u8,
}

impl PackHeader {
    pub fn bytes_per_second(&self) -> u64 {
        self.mux_rate as u64 * 50
    }
}

impl fmt::Display for PackHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Pack Header: SCR={}, scr_ext={}, bit_rate={} bytes/sec, stuffing={}",
            self.scr,
            self.scr.extension,
            self.bytes_per_second(),
            self.stuffing_length
        )
    }
}

/// P-STD buffer bound for one stream listed in a system header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBound {
    pub stream_id: u8,
    pub buffer_bound_scale: bool,
    pub buffer_size_bound: u16,
}

impl StreamBound {
    /// Bound in bytes: units of 1024 with the scale bit set, else 128.
    pub fn buffer_size_bytes(&self) -> u32 {
        let unit = if self.buffer_bound_scale { 1024 } else { 128 };
        self.buffer_size_bound as u32 * unit
    }
}

/// System header (0xBB)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemHeader {
    pub header_length: u16,
    pub rate_bound: u32,
    pub audio_bound: u8,
    pub fixed_bitrate: bool,
    pub constrained_parameters: bool,
    pub system_audio_lock: bool,
    pub system_video_lock: bool,
    pub video_bound: u8,
    pub packet_rate_restriction: bool,
    pub streams: Vec<StreamBound>,
}

impl fmt::Display for SystemHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "System Header ({} bytes): rate_bound={}, audio_bound={}, video_bound={}, fixed={}, \
             constrained={}, audio_lock={}, video_lock={}, rate_restriction={}",
            self.header_length,
            self.rate_bound,
            self.audio_bound,
            self.video_bound,
            self.fixed_bitrate as u8,
            self.constrained_parameters as u8,
            self.system_audio_lock as u8,
            self.system_video_lock as u8,
            self.packet_rate_restriction as u8
        )?;
        for stream in &self.streams {
            write!(
                f,
                "; stream 0x{:02X} = {} bound {} x{}",
                stream.stream_id,
                StartCodeKind::from_code(stream.stream_id),
                stream.buffer_size_bound,
                if stream.buffer_bound_scale { 1024 } else { 128 }
            )?;
        }
        Ok(())
    }
}

/// Sequence header (0xB3)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    pub width: u16,
    pub height: u16,
    pub aspect_ratio: AspectRatio,
    pub frame_rate: FrameRate,
    /// Units of 400 bits/sec
    pub bit_rate: u32,
    /// Units of 2048 bytes
    pub vbv_buffer_size: u16,
    pub constrained_parameters: bool,
    pub intra_quantiser_matrix: Option<Vec<u8>>,
    pub non_intra_quantiser_matrix: Option<Vec<u8>>,
}

impl SequenceHeader {
    pub fn bits_per_second(&self) -> u64 {
        self.bit_rate as u64 * 400
    }

    pub fn vbv_buffer_bytes(&self) -> u32 {
        self.vbv_buffer_size as u32 * 2048
    }
}

impl fmt::Display for SequenceHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sequence Header: {}x{}, aspect {}, {} fps, bit_rate={} bits/sec, buffer={} bytes",
            self.width,
            self.height,
            self.aspect_ratio,
            self.frame_rate,
            self.bits_per_second(),
            self.vbv_buffer_bytes()
        )?;
        if self.intra_quantiser_matrix.is_some() {
            f.write_str(", intra matrix")?;
        }
        if self.non_intra_quantiser_matrix.is_some() {
            f.write_str(", non-intra matrix")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceExtension {
    pub profile_and_level: u8,
    pub progressive_sequence: bool,
    pub chroma_format: u8,
    pub horizontal_size_ext: u8,
    pub vertical_size_ext: u8,
    pub bit_rate_ext: u16,
    pub vbv_buffer_size_ext: u8,
    pub low_delay: bool,
    pub frame_rate_ext_n: u8,
    pub frame_rate_ext_d: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourDescription {
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceDisplayExtension {
    pub video_format: u8,
    pub colour_description: Option<ColourDescription>,
    pub display_horizontal_size: u16,
    pub display_vertical_size: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureCodingExtension {
    /// `f_code[forward/backward][horizontal/vertical]`
    pub f_codes: [[u8; 2]; 2],
    pub intra_dc_precision: u8,
    pub picture_structure: u8,
    pub top_field_first: bool,
    pub frame_pred_frame_dct: bool,
    pub concealment_motion_vectors: bool,
    pub q_scale_type: bool,
    pub intra_vlc_format: bool,
    pub alternate_scan: bool,
    pub repeat_first_field: bool,
    pub chroma_420_type: bool,
    pub progressive_frame: bool,
    pub composite_display: bool,
}

/// Extension (0xB5), discriminated by the high nibble of its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Sequence(SequenceExtension),
    SequenceDisplay(SequenceDisplayExtension),
    PictureCoding(PictureCodingExtension),
    Unknown(u8),
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Extension::Sequence(ext) => write!(
                f,
                "Sequence Extension: profile/level={}, progressive={}, chroma={}, \
                 size_ext={}x{}, bitrate_ext={}, vbv_ext={}, low_delay={}, fps_ext={}/{}",
                ext.profile_and_level,
                ext.progressive_sequence as u8,
                ext.chroma_format,
                ext.horizontal_size_ext,
                ext.vertical_size_ext,
                ext.bit_rate_ext,
                ext.vbv_buffer_size_ext,
                ext.low_delay as u8,
                ext.frame_rate_ext_n,
                ext.frame_rate_ext_d
            ),
            Extension::SequenceDisplay(ext) => {
                write!(f, "Sequence Display Extension: video_format={}", ext.video_format)?;
                if let Some(colour) = &ext.colour_description {
                    write!(
                        f,
                        ", primaries={} ({}), transfer={} ({}), matrix={} ({})",
                        colour.colour_primaries,
                        colour_primaries_name(colour.colour_primaries),
                        colour.transfer_characteristics,
                        transfer_characteristics_name(colour.transfer_characteristics),
                        colour.matrix_coefficients,
                        matrix_coefficients_name(colour.matrix_coefficients)
                    )?;
                }
                write!(
                    f,
                    ", display={}x{}",
                    ext.display_horizontal_size, ext.display_vertical_size
                )
            }
            Extension::PictureCoding(ext) => write!(
                f,
                "Picture Coding Extension: f_codes={:?}, intra_dc_precision={}, structure={}, \
                 top_field_first={}, progressive_frame={}, repeat_first_field={}",
                ext.f_codes,
                ext.intra_dc_precision,
                ext.picture_structure,
                ext.top_field_first as u8,
                ext.progressive_frame as u8,
                ext.repeat_first_field as u8
            ),
            Extension::Unknown(kind) => write!(f, "Unknown extension: {}", kind),
        }
    }
}

/// Group of pictures header (0xB8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GopHeader {
    pub drop_frame: bool,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub pictures: u8,
    pub closed: bool,
    pub broken: bool,
}

impl fmt::Display for GopHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Group of Pictures: {:02}:{:02}:{:02}{}{:02}, closed={}, broken={}",
            self.hours,
            self.minutes,
            self.seconds,
            if self.drop_frame { ';' } else { ':' },
            self.pictures,
            self.closed as u8,
            self.broken as u8
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionCode {
    pub full_pel: bool,
    pub f_code: u8,
}

/// Picture header (0x00)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureHeader {
    pub temporal_reference: u16,
    pub frame_type: FrameType,
    pub vbv_delay: u16,
    pub forward: Option<MotionCode>,
    pub backward: Option<MotionCode>,
}

impl fmt::Display for PictureHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Picture Header: sequence={}, type={}, vbv_delay={}",
            self.temporal_reference, self.frame_type, self.vbv_delay
        )?;
        if let Some(forward) = &self.forward {
            write!(f, ", forward={}/{}", forward.full_pel as u8, forward.f_code)?;
        }
        if let Some(backward) = &self.backward {
            write!(f, ", backward={}/{}", backward.full_pel as u8, backward.f_code)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Presentation control information
    Pci,
    /// Data search information
    Dsi,
    Unknown(u8),
}

impl NavigationKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => NavigationKind::Pci,
            1 => NavigationKind::Dsi,
            _ => NavigationKind::Unknown(code),
        }
    }
}

/// Private stream 2 (0xBF), DVD navigation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateStream2 {
    pub length: u16,
    /// `None` for an empty unit.
    pub kind: Option<NavigationKind>,
    /// Bytes following the kind byte.
    pub payload: Bytes,
}

impl fmt::Display for PrivateStream2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Private Stream 2 / Navigation ({} bytes)", self.length)?;
        match self.kind {
            Some(NavigationKind::Pci) => f.write_str(": PCI"),
            Some(NavigationKind::Dsi) => f.write_str(": DSI"),
            Some(NavigationKind::Unknown(_)) => f.write_str(": Unknown"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start_code_table() {
        assert_eq!(StartCodeKind::from_code(0x00), StartCodeKind::Picture);
        assert_eq!(StartCodeKind::from_code(0x2A), StartCodeKind::Slice(0x2A));
        assert_eq!(StartCodeKind::from_code(0xB6), StartCodeKind::Reserved(0xB6));
        assert_eq!(StartCodeKind::from_code(0xC3), StartCodeKind::Audio(3));
        assert_eq!(StartCodeKind::from_code(0xE1), StartCodeKind::Video(1));
        assert_eq!(StartCodeKind::from_code(0xF3), StartCodeKind::Unknown(0xF3));
        assert_eq!(StartCodeKind::from_code(0xFC), StartCodeKind::Reserved(0xFC));

        for code in 0..=0xFFu8 {
            assert_eq!(StartCodeKind::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_start_code_names() {
        assert_eq!(StartCodeKind::from_code(0xC5).to_string(), "Audio Stream 5");
        assert_eq!(StartCodeKind::from_code(0xB8).to_string(), "Group of Pictures");
        assert!(StartCodeKind::Padding.is_length_prefixed());
        assert!(!StartCodeKind::SequenceEnd.is_length_prefixed());
    }

    #[test]
    fn test_code_tables() {
        assert_eq!(AspectRatio::from_code(3).to_string(), "16:9");
        assert_eq!(AspectRatio::from_code(9), AspectRatio::Unknown(9));
        assert_eq!(FrameRate::from_code(4).to_string(), "30000/1001 = 29.970");
        assert_eq!(FrameRate::from_code(3).to_string(), "25");
        assert_eq!(FrameRate::from_code(0).to_string(), "Forbidden");
        assert_eq!(FrameRate::from_code(12).to_string(), "Unknown");
        assert_eq!(FrameType::from_code(3), FrameType::B);
        assert_eq!(transfer_characteristics_name(6), "BT.709");
        assert_eq!(matrix_coefficients_name(5), "BT.601");
    }
}
