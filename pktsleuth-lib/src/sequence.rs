use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::constants::COUNTER_NEAR_OVERFLOW;
use crate::decoder::DecodedPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceEntry {
    pub frame_index: usize,
    pub counter: u16,
    /// `(counter - previous) mod 65536`; `None` for the first packet
    pub delta: Option<u16>,
    /// The counter went down compared to the previous packet
    pub wrapped: bool,
    /// The counter is at or above 0xFF00
    pub near_overflow: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    pub entries: Vec<SequenceEntry>,
}

impl SequenceReport {
    pub fn wraparounds(&self) -> usize {
        self.entries.iter().filter(|e| e.wrapped).count()
    }

    /// Entries whose delta is anything but 1. Not an error, just a count.
    pub fn gaps(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.delta, Some(d) if d != 1))
            .count()
    }

    pub fn max_delta(&self) -> Option<u16> {
        self.entries.iter().filter_map(|e| e.delta).max()
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "frame {:>3}  counter {:#06x}", entry.frame_index, entry.counter)?;
            if let Some(delta) = entry.delta {
                write!(f, "  delta {:>5}", delta)?;
            }
            if entry.wrapped {
                write!(f, "  WRAPPED")?;
            }
            if entry.near_overflow {
                write!(f, "  near-overflow")?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} wraparound(s), {} gap(s)",
            self.wraparounds(),
            self.gaps()
        )
    }
}

/// Build the report from `(frame index, counter)` pairs in capture order.
pub fn analyze_counters<I>(counters: I) -> SequenceReport
where
    I: IntoIterator<Item = (usize, u16)>,
{
    let mut entries: Vec<SequenceEntry> = Vec::new();
    let mut previous: Option<u16> = None;

    for (frame_index, counter) in counters {
        let (delta, wrapped) = match previous {
            Some(prev) => (Some(counter.wrapping_sub(prev)), counter < prev),
            None => (None, false),
        };
        entries.push(SequenceEntry {
            frame_index,
            counter,
            delta,
            wrapped,
            near_overflow: counter >= COUNTER_NEAR_OVERFLOW,
        });
        previous = Some(counter);
    }

    let report = SequenceReport { entries };
    debug!(
        "Sequence: {} packets, {} wraparounds, {} gaps",
        report.entries.len(),
        report.wraparounds(),
        report.gaps()
    );
    report
}

pub fn analyze_sequence(packets: &[DecodedPacket]) -> SequenceReport {
    analyze_counters(packets.iter().map(|p| (p.frame_index, p.counter)))
}
