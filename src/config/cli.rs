//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// untz - Convert FLACs and sort them into a sensible folder hierarchy
///
/// Inputs may be single files, directories (searched recursively) or cue
/// sheets describing a single-image album.
#[derive(Parser, Debug)]
#[command(name = "untz")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base directory to store output files to
    #[arg(short = 'd', long = "base", value_name = "DIR")]
    pub base_dir: PathBuf,

    /// Encoder to use
    #[arg(short, long, default_value = "vorbis")]
    #[arg(value_parser = ["opus", "vorbis"])]
    pub encoder: String,

    /// Produce filenames as this string, with %g, %a, %l, %n, %t, %d replaced by
    /// genre, artist, album, track number, title and date; %% gives a literal %
    #[arg(short = 'n', long = "names", value_name = "PATTERN", default_value = "%n - %t")]
    pub pattern: String,

    /// Vorbis quality, -1 (low) to 10 (high); fractional levels such as 2.5 are allowed
    #[arg(short, long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub quality: f64,

    /// Opus target bitrate in kbps
    #[arg(short, long, default_value_t = 10)]
    pub bitrate: u32,

    /// Apply replaygain tags once encoding has finished
    #[arg(short = 'r', long = "replaygain", default_value = "false")]
    pub replaygain: bool,

    /// Worker pool size (defaults to CPU count)
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Parent directory for cue sheet workspaces (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress the progress bar)
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// List of file, folder or cue sheet inputs
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
