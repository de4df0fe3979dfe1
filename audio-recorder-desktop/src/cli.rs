//! Command-line interface for the desktop recorder.
//!
//! Handles argument parsing and logging configuration.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::LevelFilter;
use thiserror::Error;

use audio_recorder_core::models::error::{PlaybackError, RecorderError};
use audio_recorder_core::models::format::OutputFormat;

/// Record, play back and delete voice recordings.
#[derive(Parser, Debug)]
#[command(name = "audio-recorder")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record from the default microphone
    Record(RecordArgs),
    /// Play a recording through the default output
    Play(PlayArgs),
    /// Delete a recording and its metadata sidecar
    Delete {
        path: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
pub struct RecordArgs {
    /// Recording length in seconds
    #[arg(short, long, default_value_t = 5)]
    pub seconds: u64,

    /// Pause after this many seconds for one second, then resume
    #[arg(long)]
    pub pause_at: Option<u64>,

    /// Output container (wav, flac, aac, m4a)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Capture two channels if the microphone supports it
    #[arg(long)]
    pub stereo: bool,

    /// File name without extension (default: timestamp)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Take power levels from the hardware meter instead of buffer RMS
    #[arg(long)]
    pub meter: bool,

    /// Write a JSON metadata sidecar next to the recording
    #[arg(long)]
    pub metadata: bool,

    /// JSON recorder configuration; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct PlayArgs {
    pub path: PathBuf,

    /// Skip forward this many seconds after starting
    #[arg(long)]
    pub skip: Option<f64>,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Keep audio backends quiet unless tracing
    builder.filter_level(if args.verbose >= 3 { LevelFilter::Trace } else { LevelFilter::Warn });
    builder.filter_module("audio_recorder_core", args.log_level());
    builder.filter_module("audio_recorder_desktop", args.log_level());
    builder.filter_module("audio_recorder", args.log_level());

    builder.format_timestamp_millis().init();
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
