//! Sample captures and frame builders for the integration tests

// Each test binary compiles this module and uses a different subset of it
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use pktsleuth_lib::checksum::ChecksumAlgorithm;
#[allow(unused_imports)]
pub use pktsleuth_lib::constants::DEVICE_HEADER;
#[allow(unused_imports)]
pub use pktsleuth_lib::endian::Endianness;
#[allow(unused_imports)]
pub use pktsleuth_lib::error::SleuthError;
#[allow(unused_imports)]
pub use pktsleuth_lib::frame::{Frame, load_frames};

/// The two device captures the 23-byte layout was inferred from
#[allow(dead_code)]
pub const SAMPLE_FRAMES: [&str; 2] = [
    "05a0ba44ba3df20e001001076b290d618000800000049d",
    "05a0ba44ba3df20e0010010c7ed03d00ff00000000961e",
];

#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("test hex must be valid"))
}

#[allow(dead_code)]
pub fn frame(index: usize, hex_data: &str) -> Frame {
    Frame::new(index, hex_to_bytes(hex_data))
}

#[allow(dead_code)]
pub fn sample_frames() -> Vec<Frame> {
    SAMPLE_FRAMES.iter().enumerate().map(|(i, h)| frame(i, h)).collect()
}

/// A 23-byte device frame with the expected header and a big-endian
/// CRC-16-CCITT-FALSE trailer.
#[allow(dead_code)]
pub fn device_frame(index: usize, sequence: u8, counter: u16) -> Frame {
    let mut bytes = DEVICE_HEADER.to_vec();
    bytes.push(sequence);
    bytes.extend_from_slice(&counter.to_be_bytes());
    bytes.extend_from_slice(&[0x0d, 0x61, 0x80, 0x00, 0x80, 0x00, 0x00]);
    let crc = ChecksumAlgorithm::Crc16CcittFalse.compute(&bytes) as u16;
    bytes.extend_from_slice(&crc.to_be_bytes());
    Frame::new(index, bytes)
}
