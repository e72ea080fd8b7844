//! Run only the checksum matcher over a capture file and list every position
//! where at least one algorithm fits all frames.
//!
//! Usage: cargo run --example checksum_hunt -- captures/device_samples.txt

use pktsleuth_lib::load_frames_from_path;
use pktsleuth_lib::matcher::match_checksums;
use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let path = env::args().nth(1).ok_or("usage: checksum_hunt <capture file>")?;
    let loaded = load_frames_from_path(&path)?;
    for error in &loaded.errors {
        eprintln!("skipped frame {}: {}", error.index, error.message);
    }
    println!("{} frames, shortest {} bytes", loaded.len(), loaded.min_len().unwrap_or(0));

    let report = match_checksums(&loaded.frames);
    for finding in report.findings.iter().filter(|f| f.is_match()) {
        println!("{}", finding);
    }
    for tail_len in [1, 2, 4] {
        if report.checksum_not_found(tail_len) {
            println!("tail {}: no known algorithm matched at any position", tail_len);
        }
    }
    Ok(())
}
