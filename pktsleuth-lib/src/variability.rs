use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::frame::Frame;

/// What was observed at one byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByteOffsetProfile {
    pub offset: usize,
    #[serde(serialize_with = "serialize_values")]
    pub distinct: BTreeSet<u8>,
    /// Number of frames long enough to contain this offset
    pub frames_reaching: usize,
    /// One distinct value, and every frame reached the offset
    pub is_constant: bool,
}

impl ByteOffsetProfile {
    pub fn distinct_count(&self) -> usize {
        self.distinct.len()
    }

    /// The constant value, when there is one.
    pub fn constant_value(&self) -> Option<u8> {
        if self.is_constant {
            self.distinct.iter().next().copied()
        } else {
            None
        }
    }
}

/// Build one profile per offset, from 0 up to the longest frame.
pub fn analyze_variability(frames: &[Frame]) -> Vec<ByteOffsetProfile> {
    let max_len = frames.iter().map(Frame::len).max().unwrap_or(0);

    let profiles: Vec<ByteOffsetProfile> = (0..max_len)
        .map(|offset| {
            let mut distinct = BTreeSet::new();
            let mut frames_reaching = 0;
            for frame in frames {
                if let Some(&value) = frame.bytes.get(offset) {
                    distinct.insert(value);
                    frames_reaching += 1;
                }
            }
            let is_constant = distinct.len() == 1 && frames_reaching == frames.len();
            ByteOffsetProfile {
                offset,
                distinct,
                frames_reaching,
                is_constant,
            }
        })
        .collect();

    debug!(
        "Variability: {} offsets, {} constant",
        profiles.len(),
        profiles.iter().filter(|p| p.is_constant).count()
    );
    profiles
}

/// Offsets that form the leading run of constant bytes.
pub fn constant_prefix_len(profiles: &[ByteOffsetProfile]) -> usize {
    profiles.iter().take_while(|p| p.is_constant).count()
}

impl fmt::Display for ByteOffsetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.distinct.iter().map(|v| format!("{:02x}", v)).collect();
        write!(
            f,
            "{:>4}  {:<8}  {:>2}/{:<2}  {}",
            self.offset,
            if self.is_constant { "const" } else { "var" },
            self.distinct.len(),
            self.frames_reaching,
            values.join(" ")
        )
    }
}

fn serialize_values<S: Serializer>(values: &BTreeSet<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    let hex: Vec<String> = values.iter().map(|v| format!("{:02x}", v)).collect();
    hex.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frames(raw: &[&[u8]]) -> Vec<Frame> {
        raw.iter().enumerate().map(|(i, b)| Frame::new(i, b.to_vec())).collect()
    }

    #[test]
    fn short_frames_do_not_make_an_offset_constant() {
        let set = frames(&[&[0x01, 0x02, 0x03], &[0x01, 0x02]]);
        let profiles = analyze_variability(&set);
        assert_eq!(profiles.len(), 3);
        assert!(profiles[0].is_constant);
        assert!(profiles[1].is_constant);
        assert!(!profiles[2].is_constant);
        assert_eq!(profiles[2].distinct_count(), 1);
        assert_eq!(profiles[2].frames_reaching, 1);
        assert_eq!(constant_prefix_len(&profiles), 2);
    }

    #[test]
    fn empty_set_has_no_offsets() {
        assert!(analyze_variability(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn distinct_count_matches_observed_values(
            raw in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..16), 1..8)
        ) {
            let set: Vec<Frame> = raw.iter().enumerate().map(|(i, b)| Frame::new(i, b.clone())).collect();
            let profiles = analyze_variability(&set);
            for profile in &profiles {
                let expected: BTreeSet<u8> = raw.iter().filter_map(|f| f.get(profile.offset).copied()).collect();
                prop_assert_eq!(profile.distinct_count(), expected.len());
                let reaching = raw.iter().filter(|f| f.len() > profile.offset).count();
                prop_assert_eq!(profile.frames_reaching, reaching);
                prop_assert_eq!(profile.is_constant, expected.len() == 1 && reaching == raw.len());
            }
        }
    }
}
