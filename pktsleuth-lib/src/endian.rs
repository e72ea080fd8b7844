use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;
use strum_macros::Display;

/// Byte order used to interpret a multi-byte window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[strum(to_string = "LE")]
    Little,
    #[strum(to_string = "BE")]
    Big,
}

impl Endianness {
    pub const BOTH: [Endianness; 2] = [Endianness::Big, Endianness::Little];

    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endianness::Little => LittleEndian::read_u16(buf),
            Endianness::Big => BigEndian::read_u16(buf),
        }
    }

    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endianness::Little => LittleEndian::read_u32(buf),
            Endianness::Big => BigEndian::read_u32(buf),
        }
    }

    /// Read an unsigned value of 1, 2 or 4 bytes. Single bytes ignore the order.
    pub fn read_uint(self, buf: &[u8]) -> Option<u32> {
        match buf.len() {
            1 => Some(buf[0] as u32),
            2 => Some(self.read_u16(buf) as u32),
            4 => Some(self.read_u32(buf)),
            _ => None,
        }
    }
}
