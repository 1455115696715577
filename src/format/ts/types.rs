use std::fmt;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const SYNC_BYTE: u8 = 0x47;
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;

// PIDs
pub const PID_NULL: u16 = 0x1FFF;

/// A 27 MHz clock value split the way it is carried on the wire: a 33-bit
/// base at 90 kHz and a 9-bit extension at 27 MHz.
///
/// Used for PCR/OPCR in adaptation fields and for the PES ESCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReference {
    pub base: u64,
    pub extension: u16,
}

impl ClockReference {
    pub fn new(base: u64, extension: u16) -> Self {
        Self { base, extension }
    }

    /// Full value at 27 MHz resolution.
    pub fn as_27mhz(&self) -> u64 {
        self.base * 300 + self.extension as u64
    }

    pub fn as_seconds(&self) -> f64 {
        self.as_27mhz() as f64 / PCR_HZ as f64
    }
}

impl fmt::Display for ClockReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.6}", self.as_seconds())
    }
}

/// Converts 90 kHz ticks (PTS/DTS/SCR base) to seconds.
pub fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / PTS_HZ as f64
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// Value of the length byte; the field occupies `length + 1` bytes.
    pub length: usize,
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    pub pcr_flag: bool,
    pub opcr_flag: bool,
    pub splicing_point_flag: bool,
    pub private_data_flag: bool,
    pub extension_flag: bool,
    pub pcr: Option<ClockReference>,
    pub opcr: Option<ClockReference>,
}

/// One parsed transport packet: header, optional adaptation field and the
/// payload span that follows them.
#[derive(Debug, Clone)]
pub struct TsPacket {
    pub header: TsHeader,
    pub adaptation: Option<AdaptationField>,
    pub payload: bytes::Bytes,
}
