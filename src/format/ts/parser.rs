use super::types::*;
use crate::error::{DumpError, Result};
use crate::utils::BitReader;
use bytes::Bytes;

/// Parses fixed-size transport packets field by field.
#[derive(Debug, Default)]
pub struct TsPacketParser;

impl TsPacketParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses the 4-byte packet header, validating the sync byte.
    pub fn parse_header(&self, reader: &mut BitReader) -> Result<TsHeader> {
        let sync_byte = reader.get_bits(8)? as u8;
        if sync_byte != SYNC_BYTE {
            return Err(DumpError::MalformedSegment(format!(
                "invalid sync byte 0x{:02x}",
                sync_byte
            )));
        }

        Ok(TsHeader {
            transport_error: reader.get_flag()?,
            payload_unit_start: reader.get_flag()?,
            transport_priority: reader.get_flag()?,
            pid: reader.get_bits(13)? as u16,
            scrambling_control: reader.get_bits(2)? as u8,
            adaptation_field_exists: reader.get_flag()?,
            contains_payload: reader.get_flag()?,
            continuity_counter: reader.get_bits(4)? as u8,
        })
    }

    /// Parses a length-prefixed adaptation field at the reader's position.
    ///
    /// A PCR or OPCR whose flag is set but whose bytes do not fit in the
    /// declared length is left as `None`.
    pub fn parse_adaptation_field(&self, reader: &mut BitReader) -> Result<AdaptationField> {
        let length = reader.get_bits(8)? as usize;
        let mut field = AdaptationField {
            length,
            ..Default::default()
        };
        if length == 0 {
            return Ok(field);
        }

        let mut data = BitReader::new(reader.read_bytes(length));
        field.discontinuity = data.get_flag()?;
        field.random_access = data.get_flag()?;
        field.es_priority = data.get_flag()?;
        field.pcr_flag = data.get_flag()?;
        field.opcr_flag = data.get_flag()?;
        field.splicing_point_flag = data.get_flag()?;
        field.private_data_flag = data.get_flag()?;
        field.extension_flag = data.get_flag()?;

        if field.pcr_flag {
            field.pcr = read_clock_reference(&mut data)
                .map_err(|e| log::warn!("adaptation field too short for PCR: {}", e))
                .ok();
        }
        if field.opcr_flag {
            field.opcr = read_clock_reference(&mut data)
                .map_err(|e| log::warn!("adaptation field too short for OPCR: {}", e))
                .ok();
        }

        Ok(field)
    }

    /// Parses one complete packet.
    pub fn parse_packet(&self, data: &[u8]) -> Result<TsPacket> {
        let mut reader = BitReader::new(data);
        let header = self.parse_header(&mut reader)?;

        let adaptation = if header.adaptation_field_exists {
            Some(self.parse_adaptation_field(&mut reader)?)
        } else {
            None
        };

        let payload = if header.contains_payload {
            Bytes::copy_from_slice(reader.read_bytes(TS_PACKET_SIZE))
        } else {
            Bytes::new()
        };

        Ok(TsPacket {
            header,
            adaptation,
            payload,
        })
    }
}

/// Reads a 33-bit base, 6 reserved bits and a 9-bit extension.
pub fn read_clock_reference(reader: &mut BitReader) -> Result<ClockReference> {
    let base = reader.get_bits(33)?;
    reader.skip_bits(6)?;
    let extension = reader.get_bits(9)? as u16;
    Ok(ClockReference::new(base, extension))
}
