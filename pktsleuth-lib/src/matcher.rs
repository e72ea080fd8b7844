use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::checksum::ChecksumAlgorithm;
use crate::constants::DEFAULT_TAIL_LENGTHS;
use crate::endian::Endianness;
use crate::frame::{Frame, min_frame_len};

/// Matcher parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumSearch {
    /// Tail widths in bytes; widths without catalogue entries are not searched
    pub tail_lengths: Vec<usize>,
}

impl Default for ChecksumSearch {
    fn default() -> Self {
        Self {
            tail_lengths: DEFAULT_TAIL_LENGTHS.to_vec(),
        }
    }
}

/// An algorithm that reproduces `frame[prefix_len..prefix_len + tail_len]`
/// from `frame[..prefix_len]` in every frame of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChecksumMatch {
    pub algorithm: ChecksumAlgorithm,
    pub prefix_len: usize,
    pub tail_len: usize,
    /// `None` for single-byte tails, which have one interpretation
    pub endianness: Option<Endianness>,
}

impl fmt::Display for ChecksumMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.algorithm)?;
        if let Some(order) = self.endianness {
            write!(f, " ({})", order)?;
        }
        Ok(())
    }
}

/// Outcome for one `(prefix_len, tail_len)` position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "matches", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(Vec<ChecksumMatch>),
    /// Checked, and no known algorithm matched
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumFinding {
    pub prefix_len: usize,
    pub tail_len: usize,
    pub outcome: MatchOutcome,
}

impl ChecksumFinding {
    pub fn matches(&self) -> &[ChecksumMatch] {
        match &self.outcome {
            MatchOutcome::Matched(matches) => matches,
            MatchOutcome::NoMatch => &[],
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Matched(_))
    }

    /// More than one distinct algorithm fits this position.
    pub fn is_ambiguous(&self) -> bool {
        let mut algorithms: Vec<ChecksumAlgorithm> = self.matches().iter().map(|m| m.algorithm).collect();
        algorithms.sort();
        algorithms.dedup();
        algorithms.len() > 1
    }
}

impl fmt::Display for ChecksumFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prefix {:>3} tail {}: ", self.prefix_len, self.tail_len)?;
        match &self.outcome {
            MatchOutcome::NoMatch => write!(f, "no known algorithm matched"),
            MatchOutcome::Matched(matches) => {
                let names: Vec<String> = matches.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join(", "))?;
                if self.is_ambiguous() {
                    write!(f, " [ambiguous]")?;
                }
                Ok(())
            }
        }
    }
}

/// All findings of one matcher run, ordered by tail length then prefix length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChecksumReport {
    pub min_frame_len: usize,
    pub findings: Vec<ChecksumFinding>,
}

impl ChecksumReport {
    pub fn matches(&self) -> impl Iterator<Item = &ChecksumMatch> {
        self.findings.iter().flat_map(ChecksumFinding::matches)
    }

    /// Matches whose tail ends exactly at the end of the shortest frame.
    pub fn trailing_matches(&self) -> impl Iterator<Item = &ChecksumMatch> {
        let end = self.min_frame_len;
        self.matches().filter(move |m| m.prefix_len + m.tail_len == end)
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &ChecksumFinding> {
        self.findings.iter().filter(|f| !f.is_match())
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = &ChecksumFinding> {
        self.findings.iter().filter(|f| f.is_ambiguous())
    }

    /// True when a tail length was checked and no position matched at all.
    /// Tail lengths that were never searched return false.
    pub fn checksum_not_found(&self, tail_len: usize) -> bool {
        let mut checked = self.findings.iter().filter(|f| f.tail_len == tail_len).peekable();
        checked.peek().is_some() && checked.all(|f| !f.is_match())
    }

    pub fn finding(&self, prefix_len: usize, tail_len: usize) -> Option<&ChecksumFinding> {
        self.findings
            .iter()
            .find(|f| f.prefix_len == prefix_len && f.tail_len == tail_len)
    }
}

pub fn match_checksums(frames: &[Frame]) -> ChecksumReport {
    match_checksums_with(frames, &ChecksumSearch::default())
}

pub fn match_checksums_with(frames: &[Frame], search: &ChecksumSearch) -> ChecksumReport {
    let Some(min_len) = min_frame_len(frames) else {
        return ChecksumReport::default();
    };

    let mut tail_lengths = search.tail_lengths.clone();
    tail_lengths.sort_unstable();
    tail_lengths.dedup();

    let mut findings = Vec::new();
    for &tail_len in &tail_lengths {
        if tail_len == 0 || tail_len > min_len {
            continue;
        }
        if ChecksumAlgorithm::with_width(tail_len).next().is_none() {
            debug!("No catalogue algorithm is {} bytes wide, tail skipped", tail_len);
            continue;
        }
        for prefix_len in 0..=(min_len - tail_len) {
            let matches = match_position(frames, prefix_len, tail_len);
            let outcome = if matches.is_empty() {
                MatchOutcome::NoMatch
            } else {
                MatchOutcome::Matched(matches)
            };
            findings.push(ChecksumFinding {
                prefix_len,
                tail_len,
                outcome,
            });
        }
    }

    let report = ChecksumReport {
        min_frame_len: min_len,
        findings,
    };
    debug!(
        "Checksum matcher: {} positions checked, {} matches",
        report.findings.len(),
        report.matches().count()
    );
    report
}

fn match_position(frames: &[Frame], prefix_len: usize, tail_len: usize) -> Vec<ChecksumMatch> {
    let orders: &[Option<Endianness>] = if tail_len == 1 {
        &[None]
    } else {
        &[Some(Endianness::Big), Some(Endianness::Little)]
    };

    let mut matches = Vec::new();
    for algorithm in ChecksumAlgorithm::with_width(tail_len) {
        let computed: Vec<u32> = frames
            .iter()
            .map(|frame| algorithm.compute(&frame.bytes[..prefix_len]))
            .collect();

        for &endianness in orders {
            let order = endianness.unwrap_or(Endianness::Big);
            let agrees = frames.iter().zip(&computed).all(|(frame, &value)| {
                let tail = &frame.bytes[prefix_len..prefix_len + tail_len];
                order.read_uint(tail) == Some(value)
            });
            if agrees {
                matches.push(ChecksumMatch {
                    algorithm,
                    prefix_len,
                    tail_len,
                    endianness,
                });
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_position_gets_a_finding() {
        let frame = Frame::new(0, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        let report = match_checksums(&[frame]);
        // tail 1: prefixes 0..=4, tail 2: 0..=3, tail 4: 0..=1
        assert_eq!(report.findings.len(), 5 + 4 + 2);
        assert_eq!(report.findings[0].tail_len, 1);
        assert_eq!(report.findings.last().map(|f| f.tail_len), Some(4));
    }

    #[test]
    fn xor_tail_is_found() {
        let a = Frame::new(0, vec![0x10, 0x22, 0x32]);
        let b = Frame::new(1, vec![0x0F, 0x01, 0x0E]);
        let report = match_checksums(&[a, b]);
        let finding = report.finding(2, 1).unwrap();
        assert!(finding.matches().iter().any(|m| m.algorithm == ChecksumAlgorithm::Xor8));
        assert!(finding.matches().iter().all(|m| m.endianness.is_none()));
    }

    #[test]
    fn widths_without_algorithms_are_not_searched() {
        let frame = Frame::new(0, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let search = ChecksumSearch {
            tail_lengths: vec![3, 5],
        };
        let report = match_checksums_with(&[frame], &search);
        assert!(report.findings.is_empty());
        assert!(!report.checksum_not_found(3));
        assert!(report.finding(0, 3).is_none());
    }

    #[test]
    fn empty_set_yields_empty_report() {
        let report = match_checksums(&[]);
        assert!(report.findings.is_empty());
        assert!(!report.checksum_not_found(2));
    }
}
