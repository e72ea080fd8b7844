//! One analysis session over a loaded frame set.
//!
//! The variability, timestamp and checksum analyzers only read the frames, so
//! they can run side by side; decoding and sequence analysis follow in capture
//! order.

use serde::Serialize;
use std::fmt;
use std::thread;
use tracing::{debug, info, warn};

use crate::decoder::{DecodedPacket, FieldDecoder, PacketLayout};
use crate::error::Result;
use crate::frame::{Frame, LoadError, LoadedFrames};
use crate::matcher::{ChecksumReport, ChecksumSearch, match_checksums_with};
use crate::sequence::{SequenceReport, analyze_sequence};
use crate::timestamp::{TimestampCandidate, TimestampScan, scan_timestamps_with};
use crate::variability::{ByteOffsetProfile, analyze_variability};

/// Knobs for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    pub timestamp: TimestampScan,
    pub checksum: ChecksumSearch,
    pub layout: PacketLayout,
    /// Run the field decoder and sequence analyzer
    pub decode: bool,
    /// Feed checksum findings to the decoder
    pub use_checksum_hints: bool,
    /// Run the independent analyzers on scoped threads
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timestamp: TimestampScan::default(),
            checksum: ChecksumSearch::default(),
            layout: PacketLayout::device(),
            decode: true,
            use_checksum_hints: true,
            parallel: false,
        }
    }
}

/// Per-frame decode result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FrameDecode {
    Decoded(DecodedPacket),
    Skipped {
        frame_index: usize,
        expected_len: usize,
        actual_len: usize,
    },
}

impl FrameDecode {
    pub fn packet(&self) -> Option<&DecodedPacket> {
        match self {
            FrameDecode::Decoded(packet) => Some(packet),
            _ => None,
        }
    }
}

/// How a session ended, as the front end reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Analyzed,
    NoValidFrames,
    NoDecodableFrames,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Analyzed => 0,
            Outcome::NoValidFrames => 1,
            Outcome::NoDecodableFrames => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub frame_count: usize,
    pub load_errors: Vec<LoadError>,
    pub variability: Vec<ByteOffsetProfile>,
    pub timestamps: Vec<TimestampCandidate>,
    pub checksums: ChecksumReport,
    pub decoded: Vec<FrameDecode>,
    pub sequence: SequenceReport,
    pub outcome: Outcome,
}

impl AnalysisReport {
    pub fn packets(&self) -> impl Iterator<Item = &DecodedPacket> {
        self.decoded.iter().filter_map(FrameDecode::packet)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Run every analyzer over `loaded`.
///
/// Fails only when the configured layout is inconsistent.
pub fn analyze(loaded: &LoadedFrames, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let decoder = if config.decode {
        Some(FieldDecoder::new(config.layout.clone())?)
    } else {
        None
    };
    let frames = &loaded.frames;
    info!("Analyzing {} frames ({} rejected)", frames.len(), loaded.errors.len());

    let (variability, timestamps, checksums) = if config.parallel {
        run_parallel(frames, config)
    } else {
        (
            analyze_variability(frames),
            scan_timestamps_with(frames, &config.timestamp),
            match_checksums_with(frames, &config.checksum),
        )
    };

    let mut decoded = Vec::new();
    if let Some(decoder) = decoder {
        let decoder = if config.use_checksum_hints {
            decoder.with_hints(&checksums)
        } else {
            decoder
        };
        decoded = decode_all(&decoder, frames);
    }

    let packets: Vec<DecodedPacket> = decoded.iter().filter_map(FrameDecode::packet).cloned().collect();
    let sequence = analyze_sequence(&packets);

    let outcome = if frames.is_empty() {
        Outcome::NoValidFrames
    } else if config.decode && packets.is_empty() {
        Outcome::NoDecodableFrames
    } else {
        Outcome::Analyzed
    };
    debug!("Session outcome: {:?}", outcome);

    Ok(AnalysisReport {
        frame_count: frames.len(),
        load_errors: loaded.errors.clone(),
        variability,
        timestamps,
        checksums,
        decoded,
        sequence,
        outcome,
    })
}

/// Decode each frame in order; length mismatches become `Skipped` entries.
pub fn decode_all(decoder: &FieldDecoder, frames: &[Frame]) -> Vec<FrameDecode> {
    frames
        .iter()
        .map(|frame| {
            if decoder.fits(frame) {
                return FrameDecode::Decoded(decoder.decode_fitting(frame));
            }
            let expected_len = decoder.layout().expected_len;
            warn!(
                "Frame {}: skipped, length {} (layout expects {})",
                frame.index,
                frame.len(),
                expected_len
            );
            FrameDecode::Skipped {
                frame_index: frame.index,
                expected_len,
                actual_len: frame.len(),
            }
        })
        .collect()
}

fn run_parallel(
    frames: &[Frame],
    config: &AnalysisConfig,
) -> (Vec<ByteOffsetProfile>, Vec<TimestampCandidate>, ChecksumReport) {
    thread::scope(|s| {
        let variability = s.spawn(|| analyze_variability(frames));
        let timestamps = s.spawn(|| scan_timestamps_with(frames, &config.timestamp));
        let checksums = match_checksums_with(frames, &config.checksum);
        (
            variability.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            timestamps.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            checksums,
        )
    })
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frames analyzed: {} (rejected: {})", self.frame_count, self.load_errors.len())?;
        for error in &self.load_errors {
            match error.line {
                Some(line) => writeln!(f, "  rejected #{} (line {}): {}", error.index, line, error.message)?,
                None => writeln!(f, "  rejected #{}: {}", error.index, error.message)?,
            }
        }

        writeln!(f, "\n== Byte variability ==")?;
        writeln!(f, "Off   Kind      N/F    Values")?;
        for profile in &self.variability {
            writeln!(f, "{}", profile)?;
        }

        writeln!(f, "\n== Timestamp candidates ==")?;
        if self.timestamps.is_empty() {
            writeln!(f, "none")?;
        }
        for candidate in &self.timestamps {
            writeln!(f, "{}", candidate)?;
        }

        writeln!(f, "\n== Checksum matches ==")?;
        let mut matched = self.checksums.findings.iter().filter(|finding| finding.is_match()).peekable();
        if matched.peek().is_none() {
            writeln!(f, "no known algorithm matched at any position")?;
        }
        for finding in matched {
            writeln!(f, "{}", finding)?;
        }
        for tail_len in [1, 2, 4] {
            if self.checksums.checksum_not_found(tail_len) {
                writeln!(f, "tail {}: no known algorithm matched", tail_len)?;
            }
        }
        writeln!(
            f,
            "({} positions checked without a match)",
            self.checksums.unmatched().count()
        )?;

        if !self.decoded.is_empty() {
            writeln!(f, "\n== Decoded packets ==")?;
            for decode in &self.decoded {
                match decode {
                    FrameDecode::Decoded(packet) => writeln!(f, "{}", packet)?,
                    FrameDecode::Skipped {
                        frame_index,
                        expected_len,
                        actual_len,
                    } => writeln!(
                        f,
                        "Frame {}: skipped, length {} (layout expects {})",
                        frame_index, actual_len, expected_len
                    )?,
                }
            }
        }

        if !self.sequence.entries.is_empty() {
            writeln!(f, "\n== Sequence ==")?;
            writeln!(f, "{}", self.sequence)?;
        }
        Ok(())
    }
}
