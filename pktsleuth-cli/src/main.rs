use anyhow::{Context, Result, bail};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pktsleuth_lib::analysis::AnalysisConfig;
use pktsleuth_lib::frame::{LoadedFrames, load_frames, load_frames_from_path};
use pktsleuth_lib::matcher::ChecksumSearch;
use pktsleuth_lib::timestamp::TimestampScan;
use pktsleuth_lib::{ChecksumAlgorithm, Endianness, PacketLayout, analyze};

/// Statistical forensics for captured frames of an undocumented device protocol.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Capture file: one hex frame per line, blank lines and `#` comments ignored.
    input: Option<PathBuf>,
    /// A hex frame given on the command line (repeatable, appended after the file).
    #[arg(short, long = "frame")]
    frames: Vec<String>,
    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Distance between scanned timestamp offsets (1 scans every offset).
    #[arg(long, default_value_t = 4)]
    stride: usize,
    /// Checksum tail lengths to try, in bytes (1, 2 or 4).
    #[arg(long = "tail", value_delimiter = ',', default_values_t = [1, 2, 4])]
    tail_lengths: Vec<usize>,
    /// Expected header bytes in hex, replacing the device default.
    #[arg(long)]
    header: Option<String>,
    /// Read the counter and secondary fields as little-endian.
    #[arg(long)]
    little_endian_fields: bool,
    /// Skip the field decoder and sequence analysis.
    #[arg(long)]
    no_decode: bool,
    /// Do not feed matcher findings to the field decoder.
    #[arg(long)]
    no_hints: bool,
    /// Run the independent analyzers on separate threads.
    #[arg(long)]
    parallel: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

impl Cli {
    fn config(&self) -> Result<AnalysisConfig> {
        let mut layout = PacketLayout::device();
        if let Some(ref header) = self.header {
            let bytes: String = header.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
            let bytes = hex::decode(&bytes).with_context(|| format!("Invalid --header value: {:?}", header))?;
            layout = layout.with_header(bytes);
        }
        if self.little_endian_fields {
            layout = layout.with_field_order(Endianness::Little);
        }
        if self.stride == 0 {
            bail!("--stride must be at least 1");
        }
        if let Some(&tail) = self
            .tail_lengths
            .iter()
            .find(|&&t| ChecksumAlgorithm::with_width(t).next().is_none())
        {
            bail!("--tail {} has no checksum algorithm of that width", tail);
        }

        Ok(AnalysisConfig {
            timestamp: TimestampScan {
                stride: self.stride,
                ..TimestampScan::default()
            },
            checksum: ChecksumSearch {
                tail_lengths: self.tail_lengths.clone(),
            },
            layout,
            decode: !self.no_decode,
            use_checksum_hints: !self.no_hints,
            parallel: self.parallel,
        })
    }

    fn load(&self) -> Result<LoadedFrames> {
        let mut loaded = match self.input {
            Some(ref path) => load_frames_from_path(path)
                .with_context(|| format!("Failed to read capture file: {:?}", path))?,
            None => LoadedFrames::default(),
        };

        // Command-line frames continue the index sequence of the file
        let offset = loaded.frames.len() + loaded.errors.len();
        let extra = load_frames(&self.frames);
        loaded.frames.extend(extra.frames.into_iter().map(|mut f| {
            f.index += offset;
            f
        }));
        loaded.errors.extend(extra.errors.into_iter().map(|mut e| {
            e.index += offset;
            e
        }));
        Ok(loaded)
    }
}

/// Console diagnostics go to stderr so `--json` output on stdout stays clean.
/// The returned guard flushes the `--log-file` writer when dropped.
fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let file_sink = cli
        .log_file
        .as_ref()
        .map(|path| {
            File::create(path)
                .map(tracing_appender::non_blocking)
                .with_context(|| format!("Cannot open --log-file {:?}", path))
        })
        .transpose()?;
    let (file_layer, guard) = match file_sink {
        Some((writer, guard)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // -v / -q pick the level unless RUST_LOG is set
    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(ref path) = cli.log_file {
        debug!("Session log mirrored to {:?}", path);
    }
    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = init_tracing(&cli)?;

    match run(&cli) {
        Ok(code) => {
            drop(guard);
            process::exit(code);
        }
        Err(e) => {
            error!("Analysis failed: {:?}", e);
            Err(e)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    if cli.input.is_none() && cli.frames.is_empty() {
        bail!("No input: pass a capture file or at least one --frame");
    }

    let config = cli.config()?;
    let loaded = cli.load()?;
    let report = analyze(&loaded, &config)?;

    if cli.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{}", report);
    }

    info!("Outcome: {:?}", report.outcome);
    Ok(report.outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_shape_the_config() {
        let cli = Cli::parse_from([
            "pktsleuth",
            "-f",
            "0102",
            "--tail",
            "2,4",
            "--header",
            "05:a0",
            "--little-endian-fields",
            "--no-decode",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.checksum.tail_lengths, vec![2, 4]);
        assert_eq!(config.layout.expected_header, vec![0x05, 0xa0]);
        assert_eq!(config.layout.field_order, Endianness::Little);
        assert!(!config.decode);
        assert_eq!(config.timestamp.stride, 4);
    }

    #[test]
    fn command_line_frames_are_loaded_in_order() {
        let cli = Cli::parse_from(["pktsleuth", "-f", "0102", "-f", "xx", "-f", "0304"]);
        let loaded = cli.load().unwrap();
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!(loaded.frames[1].index, 2);
        assert_eq!(loaded.errors[0].index, 1);
    }

    #[test]
    fn tail_without_algorithms_is_rejected() {
        let cli = Cli::parse_from(["pktsleuth", "-f", "0102", "--tail", "2,3"]);
        let err = cli.config().unwrap_err();
        assert!(err.to_string().contains("--tail 3"));
    }

    #[test]
    fn zero_stride_is_rejected() {
        let cli = Cli::parse_from(["pktsleuth", "-f", "0102", "--stride", "0"]);
        assert!(cli.config().is_err());
    }
}
