use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::constants::{DEFAULT_TIMESTAMP_STRIDE, PLAUSIBLE_EPOCH_MAX, PLAUSIBLE_EPOCH_MIN, TIMESTAMP_WIDTH};
use crate::endian::Endianness;
use crate::frame::{Frame, min_frame_len};

/// Scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimestampScan {
    /// Distance between scanned offsets; 4 keeps windows aligned, 1 tries every offset
    pub stride: usize,
    pub min_epoch: u32,
    pub max_epoch: u32,
}

impl Default for TimestampScan {
    fn default() -> Self {
        Self {
            stride: DEFAULT_TIMESTAMP_STRIDE,
            min_epoch: PLAUSIBLE_EPOCH_MIN,
            max_epoch: PLAUSIBLE_EPOCH_MAX,
        }
    }
}

impl TimestampScan {
    pub fn is_plausible(&self, value: u32) -> bool {
        (self.min_epoch..=self.max_epoch).contains(&value)
    }
}

/// An (offset, byte order) pair that decodes to a plausible epoch in every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampCandidate {
    pub offset: usize,
    pub endianness: Endianness,
    /// One value per frame, in frame order
    pub values: Vec<u32>,
    pub utc: Vec<DateTime<Utc>>,
}

impl TimestampCandidate {
    fn new(offset: usize, endianness: Endianness, values: Vec<u32>) -> Self {
        let utc = values
            .iter()
            .filter_map(|&v| DateTime::from_timestamp(v as i64, 0))
            .collect();
        Self {
            offset,
            endianness,
            values,
            utc,
        }
    }
}

impl fmt::Display for TimestampCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {:>3} {}:", self.offset, self.endianness)?;
        for (value, utc) in self.values.iter().zip(&self.utc) {
            write!(f, " {} ({})", value, utc.format("%Y-%m-%dT%H:%M:%SZ"))?;
        }
        Ok(())
    }
}

/// Scan the frame set with the default stride and range.
pub fn scan_timestamps(frames: &[Frame]) -> Vec<TimestampCandidate> {
    scan_timestamps_with(frames, &TimestampScan::default())
}

pub fn scan_timestamps_with(frames: &[Frame], scan: &TimestampScan) -> Vec<TimestampCandidate> {
    let Some(min_len) = min_frame_len(frames) else {
        return Vec::new();
    };
    let stride = scan.stride.max(1);

    let mut candidates = Vec::new();
    for offset in (0..).step_by(stride).take_while(|o| o + TIMESTAMP_WIDTH <= min_len) {
        for endianness in [Endianness::Little, Endianness::Big] {
            let values: Vec<u32> = frames
                .iter()
                .map(|frame| endianness.read_u32(&frame.bytes[offset..offset + TIMESTAMP_WIDTH]))
                .collect();
            if values.iter().all(|&v| scan.is_plausible(v)) {
                candidates.push(TimestampCandidate::new(offset, endianness, values));
            }
        }
    }

    debug!("Timestamp scan (stride {}): {} candidates", stride, candidates.len());
    candidates
}
