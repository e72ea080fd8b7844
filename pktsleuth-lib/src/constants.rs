// Constants for the assumed device frame and the analyzers' default limits

/// Earliest plausible epoch (2000-01-01T00:00:00Z)
pub const PLAUSIBLE_EPOCH_MIN: u32 = 946_684_800;

/// Latest plausible epoch (2036-01-01T00:00:00Z, the end of 2035)
pub const PLAUSIBLE_EPOCH_MAX: u32 = 2_082_758_400;

/// Width of a timestamp window in bytes
pub const TIMESTAMP_WIDTH: usize = 4;

/// Default stride between scanned timestamp offsets
pub const DEFAULT_TIMESTAMP_STRIDE: usize = 4;

/// Tail lengths tried by the checksum matcher (8/16/32-bit)
pub const DEFAULT_TAIL_LENGTHS: [usize; 3] = [1, 2, 4];

/// Total length of the device packet (23 bytes)
pub const DEVICE_PACKET_LEN: usize = 23;

/// Size of the device header (11 bytes)
pub const DEVICE_HEADER_LEN: usize = 11;

/// Header observed on every sample capture
pub const DEVICE_HEADER: [u8; DEVICE_HEADER_LEN] =
    [0x05, 0xa0, 0xba, 0x44, 0xba, 0x3d, 0xf2, 0x0e, 0x00, 0x10, 0x01];

/// Offset of the one-byte sequence field
pub const DEVICE_SEQUENCE_OFFSET: usize = 11;

/// Offset of the 16-bit counter
pub const DEVICE_COUNTER_OFFSET: usize = 12;

/// Offset of the 16-bit secondary value
pub const DEVICE_SECONDARY_OFFSET: usize = 14;

/// Offsets of the bytes that may carry a status flag
pub const DEVICE_STATUS_OFFSETS: [usize; 2] = [16, 18];

/// Start of the variable middle region
pub const DEVICE_PAYLOAD_OFFSET: usize = 16;

/// Start of the trailing checksum field
pub const DEVICE_CHECKSUM_OFFSET: usize = 21;

/// Width of the trailing checksum field (2 bytes)
pub const DEVICE_CHECKSUM_LEN: usize = 2;

/// Counters at or above this value are about to wrap
pub const COUNTER_NEAR_OVERFLOW: u16 = 0xFF00;
