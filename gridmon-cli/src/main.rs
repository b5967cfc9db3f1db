//! gridmon CLI - Replay and inspect detector-grid hit captures.
//!
//! Replays capture files through the window controller and writes each
//! window's projections as PNG images or CSV tables.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};

use gridmon_io::{
    load_config, summarize, synthetic_message, CaptureFile, CaptureWriter, Colormap,
    CsvSnapshotWriter, PngRenderer, SyntheticConfig, MAX_SCALE,
};
use gridmon_monitor::{
    CancelToken, MonitorConfig, SnapshotSink, Termination, WindowController, WindowSnapshot,
};
use log::{info, LevelFilter};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    GridmonIo(#[from] gridmon_io::Error),

    #[error("Monitor error: {0}")]
    Monitor(#[from] gridmon_monitor::Error),
}

/// Snapshot output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One PNG per window with the three projections side by side
    Png,
    /// One CSV table of non-zero cells per window
    Csv,
    /// Log window totals only
    None,
}

/// Colormap selection for PNG output.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColormapArg {
    Grayscale,
    Hot,
    Viridis,
    Green,
}

impl From<ColormapArg> for Colormap {
    fn from(arg: ColormapArg) -> Self {
        match arg {
            ColormapArg::Grayscale => Colormap::Grayscale,
            ColormapArg::Hot => Colormap::Hot,
            ColormapArg::Viridis => Colormap::Viridis,
            ColormapArg::Green => Colormap::Green,
        }
    }
}

/// Live projection monitor for multi-grid detector hit streams.
#[derive(Parser)]
#[command(name = "gridmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (repeat for debug logging)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture file through the monitor
    Replay {
        /// Input capture file
        input: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for snapshot files
        #[arg(short, long, default_value = "snapshots")]
        output_dir: PathBuf,

        /// Snapshot output format
        #[arg(short, long, value_enum, default_value = "png")]
        format: Format,

        /// Colormap for PNG output
        #[arg(long, value_enum, default_value = "viridis")]
        colormap: ColormapArg,

        /// Output pixels per histogram cell
        #[arg(
            long,
            default_value = "8",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SCALE))
        )]
        scale: u32,

        /// Messages per window (overrides the config file)
        #[arg(long)]
        period: Option<u32>,

        /// Records per message (overrides the config file, 0 = any)
        #[arg(long)]
        records: Option<usize>,

        /// Delay between replayed messages (milliseconds)
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Stop after this many seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Emit the final incomplete window
        #[arg(long)]
        flush_partial: bool,
    },

    /// Show information about a capture file
    Info {
        /// Input capture file
        input: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a synthetic capture file
    Record {
        /// Output capture file
        output: PathBuf,

        /// Number of messages
        #[arg(short, long, default_value = "10")]
        messages: u64,

        /// Records per message
        #[arg(short, long, default_value = "80000")]
        records: usize,

        /// RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Fraction of records with an out-of-range pixel index
        #[arg(long, default_value = "0.0")]
        invalid_fraction: f64,

        /// JSON configuration file (grid and record layout)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Logs window totals without writing files.
struct LogSink;

impl SnapshotSink for LogSink {
    fn publish(&mut self, snapshot: WindowSnapshot) -> gridmon_monitor::Result<()> {
        info!(
            "window {}: max cell {}, {} dropped",
            snapshot.window,
            snapshot.histograms.max_count(),
            snapshot.dropped
        );
        Ok(())
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn read_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay {
            input,
            config,
            output_dir,
            format,
            colormap,
            scale,
            period,
            records,
            interval_ms,
            timeout,
            flush_partial,
        } => {
            let mut config = read_config(config.as_deref())?;
            if let Some(period) = period {
                config = config.with_period(period);
            }
            if let Some(records) = records {
                config = config.with_records_per_message(Some(records).filter(|&n| n > 0));
            }
            config.validate()?;

            let capture = CaptureFile::open(&input)?;
            let mut source = capture
                .replay()
                .with_max_message_bytes(config.max_message_bytes)
                .with_interval(Duration::from_millis(interval_ms));

            let mut sink: Box<dyn SnapshotSink> = match format {
                Format::Png => Box::new(
                    PngRenderer::new(&output_dir)?
                        .with_scale(scale)
                        .with_colormap(colormap.into()),
                ),
                Format::Csv => Box::new(CsvSnapshotWriter::new(&output_dir)?),
                Format::None => Box::new(LogSink),
            };

            let cancel = CancelToken::new();
            if let Some(secs) = timeout {
                let cancel = cancel.clone();
                let limit = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
                thread::spawn(move || {
                    thread::sleep(limit);
                    cancel.cancel();
                });
            }

            let mut controller = WindowController::new(config)?;
            let summary = controller.run(&mut source, &mut sink, &cancel);
            if flush_partial {
                controller.flush(&mut sink);
            }
            let stats = controller.statistics();

            println!("Replayed {} in {:.2}s", input.display(), summary.elapsed.as_secs_f64());
            if summary.termination == Termination::Cancelled {
                println!("Stopped early: {} frames not replayed", source.remaining());
            }
            println!("Messages: {}", stats.messages);
            println!("Records: {}", stats.records);
            println!("Hits: {}", stats.hits);
            println!(
                "Dropped (out of range): {} ({:.3}%)",
                stats.dropped_out_of_range,
                stats.drop_fraction().unwrap_or(0.0) * 100.0
            );
            println!(
                "Defective payloads: {} truncated, {} overlong",
                stats.truncated_payloads, stats.overlong_payloads
            );
            if source.skipped_oversized() > 0 {
                println!("Oversized frames skipped: {}", source.skipped_oversized());
            }
            println!("Snapshots: {}", stats.snapshots);
            if stats.sink_failures > 0 {
                println!("Snapshot write failures: {}", stats.sink_failures);
            }
            if format != Format::None {
                println!("Output: {}", output_dir.display());
            }
        }

        Commands::Info {
            input,
            config,
            json,
        } => {
            let config = read_config(config.as_deref())?;
            let capture = CaptureFile::open(&input)?;

            let start = Instant::now();
            let summary = summarize(&capture, &config)?;
            info!("scanned in {:.2?}", start.elapsed());

            if json {
                println!("{}", summary.to_json()?);
                return Ok(());
            }

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                capture.len(),
                capture.len() as f64 / 1_000_000.0
            );
            println!("Frames: {}", summary.frames);
            println!("Payload bytes: {}", summary.payload_bytes);
            if summary.trailing_bytes > 0 {
                println!("Trailing bytes (partial frame): {}", summary.trailing_bytes);
            }
            println!("Records: {}", summary.records);
            println!("Valid hits: {}", summary.valid_hits);
            println!("Out-of-range indices: {}", summary.out_of_range);
            println!(
                "Defective payloads: {} truncated, {} overlong, {} oversized",
                summary.truncated, summary.overlong, summary.oversized
            );
            println!(
                "Full windows (period {}): {}",
                config.period,
                summary.full_windows(config.period)
            );
        }

        Commands::Record {
            output,
            messages,
            records,
            seed,
            invalid_fraction,
            config,
        } => {
            let config = read_config(config.as_deref())?;
            let synthetic = SyntheticConfig::default()
                .with_grid(config.grid)
                .with_layout(config.layout)
                .with_records(records)
                .with_seed(seed)
                .with_invalid_fraction(invalid_fraction);

            let mut rng = synthetic.rng();
            let mut writer = CaptureWriter::create(&output)?;
            for _ in 0..messages {
                writer.write_message(&synthetic_message(&synthetic, &mut rng)?)?;
            }
            writer.flush()?;

            println!(
                "Wrote {} messages of {} records to {}",
                writer.messages_written(),
                records,
                output.display()
            );
        }
    }

    Ok(())
}
