use serde::Serialize;
use std::str::FromStr;
use strum_macros::Display;

use crate::error::SleuthError;

/// Supported checksum algorithms. Values are widened to `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumAlgorithm {
    /// XOR of all bytes
    #[strum(to_string = "XOR-8")]
    Xor8,
    /// sum(bytes) mod 256, same as sum & 0xFF
    #[strum(to_string = "SUM-8")]
    Sum8,
    /// sum(bytes) mod 255
    #[strum(to_string = "SUM-8/MOD255")]
    Sum8Mod255,
    /// sum(bytes) mod 65536, same as sum & 0xFFFF
    #[strum(to_string = "SUM-16")]
    Sum16,
    /// sum(bytes) mod 65535
    #[strum(to_string = "SUM-16/MOD65535")]
    Sum16Mod65535,
    /// sum(bytes) & 0xFFFFFFFF
    #[strum(to_string = "SUM-32")]
    Sum32,
    /// poly 0x07, init 0x00
    #[strum(to_string = "CRC-8-CCITT")]
    Crc8Ccitt,
    /// poly 0x31 reflected (0x8C), init 0x00
    #[strum(to_string = "CRC-8-MAXIM")]
    Crc8Maxim,
    /// poly 0x1021, init 0xFFFF, MSB-first
    #[strum(to_string = "CRC-16-CCITT-FALSE")]
    Crc16CcittFalse,
    /// poly 0x1021, init 0x0000, MSB-first
    #[strum(to_string = "CRC-16-XMODEM")]
    Crc16Xmodem,
    /// poly 0xA001 (reflected 0x8005), init 0xFFFF, LSB-first
    #[strum(to_string = "CRC-16-MODBUS")]
    Crc16Modbus,
    /// IEEE 802.3
    #[strum(to_string = "CRC-32")]
    Crc32,
}

impl ChecksumAlgorithm {
    pub const ALL: [ChecksumAlgorithm; 12] = [
        ChecksumAlgorithm::Xor8,
        ChecksumAlgorithm::Sum8,
        ChecksumAlgorithm::Sum8Mod255,
        ChecksumAlgorithm::Crc8Ccitt,
        ChecksumAlgorithm::Crc8Maxim,
        ChecksumAlgorithm::Sum16,
        ChecksumAlgorithm::Sum16Mod65535,
        ChecksumAlgorithm::Crc16CcittFalse,
        ChecksumAlgorithm::Crc16Xmodem,
        ChecksumAlgorithm::Crc16Modbus,
        ChecksumAlgorithm::Sum32,
        ChecksumAlgorithm::Crc32,
    ];

    /// Output size in bytes.
    pub fn width(&self) -> usize {
        match self {
            ChecksumAlgorithm::Xor8
            | ChecksumAlgorithm::Sum8
            | ChecksumAlgorithm::Sum8Mod255
            | ChecksumAlgorithm::Crc8Ccitt
            | ChecksumAlgorithm::Crc8Maxim => 1,
            ChecksumAlgorithm::Sum16
            | ChecksumAlgorithm::Sum16Mod65535
            | ChecksumAlgorithm::Crc16CcittFalse
            | ChecksumAlgorithm::Crc16Xmodem
            | ChecksumAlgorithm::Crc16Modbus => 2,
            ChecksumAlgorithm::Sum32 | ChecksumAlgorithm::Crc32 => 4,
        }
    }

    /// Algorithms whose output is exactly `width` bytes, in catalogue order.
    pub fn with_width(width: usize) -> impl Iterator<Item = ChecksumAlgorithm> {
        Self::ALL.into_iter().filter(move |alg| alg.width() == width)
    }

    /// Short identifier, also accepted by [`FromStr`].
    pub fn id(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Xor8 => "xor8",
            ChecksumAlgorithm::Sum8 => "sum8",
            ChecksumAlgorithm::Sum8Mod255 => "sum8-mod255",
            ChecksumAlgorithm::Sum16 => "sum16",
            ChecksumAlgorithm::Sum16Mod65535 => "sum16-mod65535",
            ChecksumAlgorithm::Sum32 => "sum32",
            ChecksumAlgorithm::Crc8Ccitt => "crc8-ccitt",
            ChecksumAlgorithm::Crc8Maxim => "crc8-maxim",
            ChecksumAlgorithm::Crc16CcittFalse => "crc16-ccitt-false",
            ChecksumAlgorithm::Crc16Xmodem => "crc16-xmodem",
            ChecksumAlgorithm::Crc16Modbus => "crc16-modbus",
            ChecksumAlgorithm::Crc32 => "crc32",
        }
    }

    pub fn compute(&self, data: &[u8]) -> u32 {
        match self {
            ChecksumAlgorithm::Xor8 => xor8(data) as u32,
            ChecksumAlgorithm::Sum8 => (byte_sum(data) & 0xFF) as u32,
            ChecksumAlgorithm::Sum8Mod255 => (byte_sum(data) % 255) as u32,
            ChecksumAlgorithm::Sum16 => (byte_sum(data) & 0xFFFF) as u32,
            ChecksumAlgorithm::Sum16Mod65535 => (byte_sum(data) % 65535) as u32,
            ChecksumAlgorithm::Sum32 => (byte_sum(data) & 0xFFFF_FFFF) as u32,
            ChecksumAlgorithm::Crc8Ccitt => crc8_msb(data, 0x07, 0x00) as u32,
            ChecksumAlgorithm::Crc8Maxim => crc8_lsb(data, 0x8C, 0x00) as u32,
            ChecksumAlgorithm::Crc16CcittFalse => crc16_msb(data, 0x1021, 0xFFFF) as u32,
            ChecksumAlgorithm::Crc16Xmodem => crc16_msb(data, 0x1021, 0x0000) as u32,
            ChecksumAlgorithm::Crc16Modbus => crc16_lsb(data, 0xA001, 0xFFFF) as u32,
            ChecksumAlgorithm::Crc32 => crc32fast::hash(data),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = SleuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|alg| alg.id() == wanted || alg.to_string().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| SleuthError::UnknownAlgorithm(s.to_string()))
    }
}

fn xor8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

fn byte_sum(data: &[u8]) -> u64 {
    data.iter().map(|&b| b as u64).sum()
}

/// Non-reflected CRC-8.
fn crc8_msb(data: &[u8], poly: u8, init: u8) -> u8 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ poly } else { crc << 1 };
        }
    }
    crc
}

/// Reflected CRC-8; `poly` is already bit-reversed.
fn crc8_lsb(data: &[u8], poly: u8, init: u8) -> u8 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x01 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
        }
    }
    crc
}

/// Non-reflected CRC-16, bit 15 tested each round.
fn crc16_msb(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ poly } else { crc << 1 };
        }
    }
    crc
}

/// Reflected CRC-16; `poly` is already bit-reversed.
fn crc16_lsb(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
        }
    }
    crc
}
