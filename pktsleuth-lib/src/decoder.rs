use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use tracing::{debug, warn};

use crate::checksum::ChecksumAlgorithm;
use crate::constants::*;
use crate::endian::Endianness;
use crate::error::{Result, SleuthError};
use crate::frame::{Frame, serialize_hex};
use crate::matcher::ChecksumReport;

/// Where each field lives in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketLayout {
    pub expected_len: usize,
    pub header: Range<usize>,
    #[serde(serialize_with = "serialize_hex_vec")]
    pub expected_header: Vec<u8>,
    pub sequence_offset: usize,
    pub counter_offset: usize,
    pub secondary_offset: usize,
    pub status_offsets: Vec<usize>,
    pub payload: Range<usize>,
    pub checksum: Range<usize>,
    /// Byte order of the counter and secondary fields
    pub field_order: Endianness,
}

impl Default for PacketLayout {
    fn default() -> Self {
        Self::device()
    }
}

impl PacketLayout {
    /// The 23-byte device frame.
    pub fn device() -> Self {
        Self {
            expected_len: DEVICE_PACKET_LEN,
            header: 0..DEVICE_HEADER_LEN,
            expected_header: DEVICE_HEADER.to_vec(),
            sequence_offset: DEVICE_SEQUENCE_OFFSET,
            counter_offset: DEVICE_COUNTER_OFFSET,
            secondary_offset: DEVICE_SECONDARY_OFFSET,
            status_offsets: DEVICE_STATUS_OFFSETS.to_vec(),
            payload: DEVICE_PAYLOAD_OFFSET..DEVICE_CHECKSUM_OFFSET,
            checksum: DEVICE_CHECKSUM_OFFSET..DEVICE_CHECKSUM_OFFSET + DEVICE_CHECKSUM_LEN,
            field_order: Endianness::Big,
        }
    }

    /// Replace the expected header; the header field becomes `0..header.len()`.
    pub fn with_header(mut self, header: Vec<u8>) -> Self {
        self.header = 0..header.len();
        self.expected_header = header;
        self
    }

    pub fn with_field_order(mut self, order: Endianness) -> Self {
        self.field_order = order;
        self
    }

    pub fn checksum_width(&self) -> usize {
        self.checksum.len()
    }

    /// Check that every field fits inside `expected_len`.
    pub fn validate(&self) -> Result<()> {
        let len = self.expected_len;
        let fits = |range: &Range<usize>, name: &str| -> Result<()> {
            if range.start > range.end || range.end > len {
                return Err(SleuthError::InvalidLayout(format!(
                    "{} {:?} does not fit in {} bytes",
                    name, range, len
                )));
            }
            Ok(())
        };

        fits(&self.header, "header")?;
        fits(&self.payload, "payload")?;
        fits(&self.checksum, "checksum")?;
        fits(&(self.sequence_offset..self.sequence_offset + 1), "sequence")?;
        fits(&(self.counter_offset..self.counter_offset + 2), "counter")?;
        fits(&(self.secondary_offset..self.secondary_offset + 2), "secondary")?;
        for &offset in &self.status_offsets {
            fits(&(offset..offset + 1), "status")?;
        }

        if self.header.len() != self.expected_header.len() {
            return Err(SleuthError::InvalidLayout(format!(
                "header field is {} bytes but the expected header is {}",
                self.header.len(),
                self.expected_header.len()
            )));
        }
        if !matches!(self.checksum_width(), 1 | 2 | 4) {
            return Err(SleuthError::InvalidLayout(format!(
                "checksum width {} has no catalogue algorithms",
                self.checksum_width()
            )));
        }
        Ok(())
    }
}

/// A status byte read against the known sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive, Serialize)]
#[repr(u8)]
pub enum StatusReading {
    Asserted = 0xFF,
    AssertedAlternate = 0x80,

    #[num_enum(catch_all)]
    NotAsserted(u8),
}

impl StatusReading {
    pub fn is_asserted(&self) -> bool {
        !matches!(self, StatusReading::NotAsserted(_))
    }
}

/// One candidate status byte; candidates are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusHypothesis {
    pub offset: usize,
    pub value: u8,
    pub reading: StatusReading,
}

/// A computed value that did not match the trailing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecksumCandidate {
    pub algorithm: ChecksumAlgorithm,
    pub computed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    Verified {
        algorithm: ChecksumAlgorithm,
        endianness: Option<Endianness>,
    },
    Unverified {
        candidates: Vec<ChecksumCandidate>,
    },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }

    pub fn algorithm(&self) -> Option<ChecksumAlgorithm> {
        match self {
            Verification::Verified { algorithm, .. } => Some(*algorithm),
            Verification::Unverified { .. } => None,
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Verified {
                algorithm,
                endianness: Some(order),
            } => write!(f, "verified-with({} {})", algorithm, order),
            Verification::Verified { algorithm, .. } => write!(f, "verified-with({})", algorithm),
            Verification::Unverified { candidates } => {
                write!(f, "unverified [")?;
                for (i, c) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={:#06x}", c.algorithm, c.computed)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    HeaderMismatch {
        #[serde(serialize_with = "serialize_hex")]
        expected: Bytes,
        #[serde(serialize_with = "serialize_hex")]
        actual: Bytes,
        differing_offsets: Vec<usize>,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::HeaderMismatch {
                expected,
                actual,
                differing_offsets,
            } => write!(
                f,
                "header mismatch at {:?}: expected {}, got {}",
                differing_offsets,
                hex::encode(expected),
                hex::encode(actual)
            ),
        }
    }
}

/// A frame split into named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    pub frame_index: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub header: Bytes,
    pub header_matches: bool,
    pub sequence: u8,
    pub counter: u16,
    pub secondary: u16,
    pub status: Vec<StatusHypothesis>,
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Bytes,
    #[serde(serialize_with = "serialize_hex")]
    pub checksum: Bytes,
    /// The checksum field read big-endian
    pub checksum_value: u32,
    pub verification: Verification,
    pub warnings: Vec<DecodeWarning>,
}

impl fmt::Display for DecodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌─ Frame {} ─────────────────────────────────────────", self.frame_index)?;
        writeln!(
            f,
            "│ Header:    {} ({})",
            hex::encode(&self.header),
            if self.header_matches { "expected" } else { "MISMATCH" }
        )?;
        writeln!(f, "│ Sequence:  {:#04x}", self.sequence)?;
        writeln!(f, "│ Counter:   {:#06x} ({})", self.counter, self.counter)?;
        writeln!(f, "│ Secondary: {:#06x} ({})", self.secondary, self.secondary)?;
        for status in &self.status {
            writeln!(
                f,
                "│ Status@{:<3} {:#04x} {:?}",
                status.offset, status.value, status.reading
            )?;
        }
        writeln!(f, "│ Payload:   {}", hex::encode(&self.payload))?;
        writeln!(
            f,
            "│ Checksum:  {} ({:#x}) {}",
            hex::encode(&self.checksum),
            self.checksum_value,
            self.verification
        )?;
        for warning in &self.warnings {
            writeln!(f, "│ Warning:   {}", warning)?;
        }
        write!(f, "└───────────────────────────────────────────────────")
    }
}

/// Decodes frames against one layout, optionally guided by matcher findings.
#[derive(Debug, Clone)]
pub struct FieldDecoder {
    layout: PacketLayout,
    preferred: Vec<(ChecksumAlgorithm, Option<Endianness>)>,
}

impl FieldDecoder {
    pub fn new(layout: PacketLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            preferred: Vec::new(),
        })
    }

    pub fn layout(&self) -> &PacketLayout {
        &self.layout
    }

    /// Try the algorithms the matcher found at this layout's checksum position
    /// before the rest of the catalogue.
    pub fn with_hints(mut self, report: &ChecksumReport) -> Self {
        let start = self.layout.checksum.start;
        let width = self.layout.checksum_width();
        self.preferred = report
            .matches()
            .filter(|m| m.prefix_len == start && m.tail_len == width)
            .map(|m| (m.algorithm, m.endianness))
            .collect();
        debug!("Decoder hints: {:?}", self.preferred);
        self
    }

    pub fn fits(&self, frame: &Frame) -> bool {
        frame.len() == self.layout.expected_len
    }

    pub fn decode(&self, frame: &Frame) -> Result<DecodedPacket> {
        if !self.fits(frame) {
            warn!(
                "Frame {}: length {} does not match layout length {}",
                frame.index,
                frame.len(),
                self.layout.expected_len
            );
            return Err(SleuthError::LengthMismatch {
                expected: self.layout.expected_len,
                actual: frame.len(),
            });
        }
        Ok(self.decode_fitting(frame))
    }

    /// Split a frame whose length is already known to match the layout.
    pub(crate) fn decode_fitting(&self, frame: &Frame) -> DecodedPacket {
        let layout = &self.layout;
        let bytes = &frame.bytes;
        let header = bytes.slice(layout.header.clone());
        let differing_offsets: Vec<usize> = header
            .iter()
            .zip(&layout.expected_header)
            .enumerate()
            .filter(|(_, (actual, expected))| actual != expected)
            .map(|(i, _)| layout.header.start + i)
            .collect();

        let mut warnings = Vec::new();
        if !differing_offsets.is_empty() {
            warn!(
                "Frame {}: header differs at offsets {:?}",
                frame.index, differing_offsets
            );
            warnings.push(DecodeWarning::HeaderMismatch {
                expected: Bytes::from(layout.expected_header.clone()),
                actual: header.clone(),
                differing_offsets: differing_offsets.clone(),
            });
        }

        let status = layout
            .status_offsets
            .iter()
            .map(|&offset| StatusHypothesis {
                offset,
                value: bytes[offset],
                reading: StatusReading::from_primitive(bytes[offset]),
            })
            .collect();

        let order = layout.field_order;
        let checksum = bytes.slice(layout.checksum.clone());
        DecodedPacket {
            frame_index: frame.index,
            header,
            header_matches: differing_offsets.is_empty(),
            sequence: bytes[layout.sequence_offset],
            counter: order.read_u16(&bytes[layout.counter_offset..layout.counter_offset + 2]),
            secondary: order.read_u16(&bytes[layout.secondary_offset..layout.secondary_offset + 2]),
            status,
            payload: bytes.slice(layout.payload.clone()),
            checksum_value: BigEndian::read_uint(&checksum, checksum.len()) as u32,
            checksum,
            verification: self.verify(bytes),
            warnings,
        }
    }

    fn verify(&self, bytes: &[u8]) -> Verification {
        let checksum = &bytes[self.layout.checksum.clone()];
        let covered = &bytes[..self.layout.checksum.start];
        let width = checksum.len();

        let orders: &[Option<Endianness>] = if width == 1 {
            &[None]
        } else {
            &[Some(Endianness::Big), Some(Endianness::Little)]
        };
        let catalogue = ChecksumAlgorithm::with_width(width)
            .flat_map(|alg| orders.iter().map(move |&order| (alg, order)));
        let attempts = self.preferred.iter().copied().chain(catalogue);

        for (algorithm, endianness) in attempts {
            let stored = endianness.unwrap_or(Endianness::Big).read_uint(checksum);
            if stored == Some(algorithm.compute(covered)) {
                return Verification::Verified { algorithm, endianness };
            }
        }

        Verification::Unverified {
            candidates: ChecksumAlgorithm::with_width(width)
                .map(|algorithm| ChecksumCandidate {
                    algorithm,
                    computed: algorithm.compute(covered),
                })
                .collect(),
        }
    }
}

fn serialize_hex_vec<S: serde::Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}
