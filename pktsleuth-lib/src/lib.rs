pub mod analysis;
pub mod checksum;
pub mod constants;
pub mod decoder;
pub mod endian;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod sequence;
pub mod timestamp;
pub mod variability;

// Re-export the entry points for easy access
pub use analysis::{AnalysisConfig, AnalysisReport, Outcome, analyze};
pub use checksum::ChecksumAlgorithm;
pub use decoder::{DecodedPacket, FieldDecoder, PacketLayout};
pub use endian::Endianness;
pub use error::SleuthError;
pub use frame::{Frame, LoadedFrames, load_frames, load_frames_from_path, load_frames_from_str};
