//! Tests for loading frames, byte variability and timestamp discovery

mod common;

use common::*;
use pktsleuth_lib::frame::load_frames_from_str;
use pktsleuth_lib::timestamp::{TimestampScan, scan_timestamps, scan_timestamps_with};
use pktsleuth_lib::variability::{analyze_variability, constant_prefix_len};

#[test]
fn test_invalid_frames_do_not_stop_the_batch() {
    let loaded = load_frames([SAMPLE_FRAMES[0], "0g12", "abc", "", SAMPLE_FRAMES[1]]);

    assert_eq!(loaded.frames.len(), 2);
    assert_eq!(loaded.frames[0].index, 0);
    assert_eq!(loaded.frames[1].index, 4);

    let rejected: Vec<usize> = loaded.errors.iter().map(|e| e.index).collect();
    assert_eq!(rejected, vec![1, 2, 3]);
    assert!(loaded.errors[1].message.to_lowercase().contains("odd"));
}

#[test]
fn test_colon_and_space_separated_input() {
    let loaded = load_frames(["05:a0:ba 44"]);
    assert_eq!(loaded.frames[0].as_slice(), &[0x05, 0xa0, 0xba, 0x44]);
    assert_eq!(loaded.frames[0].hex_string(), "05a0ba44");
}

#[test]
fn test_capture_text_with_comments() {
    let text = format!("# device capture\n{}\n\n# second\n{}\n", SAMPLE_FRAMES[0], SAMPLE_FRAMES[1]);
    let loaded = load_frames_from_str(&text);
    assert!(loaded.errors.is_empty());
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.min_len(), Some(23));
    assert_eq!(loaded.frames[1].line, Some(5));
}

#[test]
fn test_shared_header_is_constant() {
    let profiles = analyze_variability(&sample_frames());

    assert_eq!(profiles.len(), 23);
    for profile in &profiles[..11] {
        assert!(profile.is_constant, "offset {} should be constant", profile.offset);
        assert_eq!(profile.constant_value(), Some(DEVICE_HEADER[profile.offset]));
    }
    assert!(!profiles[11].is_constant);
    assert_eq!(profiles[11].distinct_count(), 2);
    assert_eq!(constant_prefix_len(&profiles), 11);
}

#[test]
fn test_offset_reached_by_some_frames_is_not_constant() {
    let frames = vec![frame(0, "aabbcc"), frame(1, "aabb"), frame(2, "aabbcc")];
    let profiles = analyze_variability(&frames);
    assert_eq!(profiles[2].distinct_count(), 1);
    assert_eq!(profiles[2].frames_reaching, 2);
    assert!(!profiles[2].is_constant);
}

#[test]
fn test_timestamp_must_be_plausible_in_every_frame() {
    // 0x65000000 (2023) little-endian at offset 4 in both; 0xffffffff at offset 0 is past 2035
    let a = frame(0, "ffffffff00000065");
    let b = frame(1, "ffffffff01000065");
    let found = scan_timestamps(&[a.clone(), b]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].offset, 4);
    assert_eq!(found[0].endianness, Endianness::Little);
    assert_eq!(found[0].values, vec![0x6500_0000, 0x6500_0001]);

    let c = frame(2, "ffffffff00000001");
    assert!(scan_timestamps(&[a, c]).is_empty());
}

#[test]
fn test_big_endian_timestamp() {
    // 65 00 00 0x is 2023 big-endian; read little-endian it is far before 2000
    let a = frame(0, "ffffffff65000000");
    let b = frame(1, "ffffffff65000001");
    let found = scan_timestamps(&[a, b]);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].offset, 4);
    assert_eq!(found[0].endianness, Endianness::Big);
    assert_eq!(found[0].values, vec![0x6500_0000, 0x6500_0001]);
    assert_eq!(found[0].utc[0].format("%Y").to_string(), "2023");
}

#[test]
fn test_byte_orders_are_judged_independently() {
    // 0x5f5f5f5f (2020) reads the same both ways
    let symmetric = frame(0, "5f5f5f5f");
    let found = scan_timestamps(&[symmetric.clone()]);
    let orders: Vec<Endianness> = found.iter().map(|c| c.endianness).collect();
    assert_eq!(orders, vec![Endianness::Little, Endianness::Big]);

    // Adding a frame that is only plausible big-endian drops the little-endian hypothesis
    let found = scan_timestamps(&[symmetric, frame(1, "65000000")]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].endianness, Endianness::Big);
    assert_eq!(found[0].values, vec![0x5f5f_5f5f, 0x6500_0000]);
}

#[test]
fn test_window_must_fit_in_shortest_frame() {
    let long = frame(0, "0000000000000065");
    let short = frame(1, "00000000000000");
    assert!(scan_timestamps(&[long, short]).is_empty());
}

#[test]
fn test_stride_one_finds_unaligned_windows() {
    // 0x60000000 little-endian starting at offset 1
    let f = frame(0, "ff00000060ff");
    assert!(scan_timestamps(&[f.clone()]).is_empty());

    let scan = TimestampScan {
        stride: 1,
        ..TimestampScan::default()
    };
    let found = scan_timestamps_with(&[f], &scan);
    assert!(found.iter().any(|c| c.offset == 1 && c.endianness == Endianness::Little));
}

#[test]
fn test_sample_frames_have_no_aligned_timestamp() {
    let found = scan_timestamps(&sample_frames());
    for candidate in &found {
        assert_eq!(candidate.offset % 4, 0);
        assert_eq!(candidate.values.len(), 2);
    }
}
