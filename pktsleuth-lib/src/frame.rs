use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, SleuthError};

/// One captured frame, identified by its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Position of the source string in the input list
    pub index: usize,
    /// 1-based source line, when loaded from text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(serialize_with = "serialize_hex")]
    pub bytes: Bytes,
}

impl Frame {
    pub fn new(index: usize, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            line: None,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the raw bytes as a hex string
    pub fn hex_string(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// A rejected input string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadError {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

/// The valid frames of a batch plus everything that was rejected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadedFrames {
    pub frames: Vec<Frame>,
    pub errors: Vec<LoadError>,
}

impl LoadedFrames {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Length of the shortest valid frame, if any.
    pub fn min_len(&self) -> Option<usize> {
        min_frame_len(&self.frames)
    }

    /// Length of the longest valid frame, if any.
    pub fn max_len(&self) -> Option<usize> {
        self.frames.iter().map(Frame::len).max()
    }

    fn push(&mut self, index: usize, line: Option<usize>, text: &str) {
        match decode_hex(text) {
            Ok(bytes) => self.frames.push(Frame {
                index,
                line,
                bytes: bytes.into(),
            }),
            Err(message) => {
                warn!("Rejected frame {}: {}", index, message);
                self.errors.push(LoadError { index, line, message });
            }
        }
    }
}

/// Length of the shortest frame in `frames`, if any.
pub fn min_frame_len(frames: &[Frame]) -> Option<usize> {
    frames.iter().map(Frame::len).min()
}

/// Strip whitespace and `:` separators and decode one frame.
pub fn parse_frame(index: usize, text: &str) -> Result<Frame> {
    decode_hex(text)
        .map(|bytes| Frame::new(index, bytes))
        .map_err(|message| SleuthError::InvalidHexInput { index, message })
}

fn decode_hex(text: &str) -> std::result::Result<Vec<u8>, String> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if cleaned.is_empty() {
        return Err("empty frame".to_string());
    }
    hex::decode(&cleaned).map_err(|e| e.to_string())
}

/// Load frames supplied programmatically; `index` is the position in `inputs`.
pub fn load_frames<I, S>(inputs: I) -> LoadedFrames
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut loaded = LoadedFrames::default();
    for (index, text) in inputs.into_iter().enumerate() {
        loaded.push(index, None, text.as_ref());
    }
    debug!(
        "Loaded {} frames ({} rejected)",
        loaded.frames.len(),
        loaded.errors.len()
    );
    loaded
}

/// Load frames from capture text: one frame per line, blank lines and
/// `#` comments ignored.
pub fn load_frames_from_str(text: &str) -> LoadedFrames {
    let mut loaded = LoadedFrames::default();
    let frame_lines = text
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    for (index, (line_no, line)) in frame_lines.enumerate() {
        loaded.push(index, Some(line_no), line);
    }
    debug!(
        "Loaded {} frames ({} rejected) from text",
        loaded.frames.len(),
        loaded.errors.len()
    );
    loaded
}

/// Read a capture file. Only the read itself can fail.
pub fn load_frames_from_path<P: AsRef<Path>>(path: P) -> Result<LoadedFrames> {
    let text = fs::read_to_string(path.as_ref())?;
    let loaded = load_frames_from_str(&text);
    debug!("Read {:?}", path.as_ref());
    Ok(loaded)
}

pub(crate) fn serialize_hex<S: Serializer>(bytes: &Bytes, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators() {
        let frame = parse_frame(0, "05:a0 BA\t44").unwrap();
        assert_eq!(frame.as_slice(), &[0x05, 0xa0, 0xba, 0x44]);
    }

    #[test]
    fn odd_length_is_rejected() {
        match parse_frame(3, "abc") {
            Err(SleuthError::InvalidHexInput { index, .. }) => assert_eq!(index, 3),
            other => panic!("Expected InvalidHexInput, got {:?}", other),
        }
    }

    #[test]
    fn rejection_message_matches_parse_error() {
        let loaded = load_frames(["0102", "0g"]);
        match parse_frame(1, "0g") {
            Err(SleuthError::InvalidHexInput { message, .. }) => {
                assert_eq!(loaded.errors[0].message, message);
            }
            other => panic!("Expected InvalidHexInput, got {:?}", other),
        }
        assert_eq!(loaded.errors[0].index, 1);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# capture\n\n0102\n  # another\nzz\n0304\n";
        let loaded = load_frames_from_str(text);
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!(loaded.frames[0].line, Some(3));
        assert_eq!(loaded.frames[1].index, 2);
        assert_eq!(loaded.errors.len(), 1);
        assert_eq!(loaded.errors[0].line, Some(5));
    }
}
