//! Runtime configuration settings

use crate::encode::{Encoder, EncoderKind, ToolPaths};
use crate::error::Result;
use crate::tags::PathPattern;
use std::path::PathBuf;

/// Runtime settings for the transcode pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Files, directories or cue sheets to encode
    pub inputs: Vec<PathBuf>,
    /// Root of the output library
    pub output_root: PathBuf,
    /// Selected backend and its parameters
    pub encoder: Encoder,
    /// File name pattern below `<root>/<artist>/<album>/`
    pub pattern: PathPattern,
    /// Run the gain pass after encoding
    pub replaygain: bool,
    /// Number of worker threads
    pub threads: usize,
    /// Show progress bar
    pub show_progress: bool,
    /// Parent directory for cue workspaces
    pub scratch_dir: Option<PathBuf>,
    /// External binaries
    pub tools: ToolPaths,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let encoder = match cli.encoder.parse::<EncoderKind>()? {
            EncoderKind::Opus => Encoder::Opus {
                bitrate: cli.bitrate,
            },
            EncoderKind::Vorbis => Encoder::Vorbis {
                quality: cli.quality,
            },
        };

        Ok(Self {
            inputs: cli.inputs.clone(),
            output_root: cli.base_dir.clone(),
            encoder,
            pattern: PathPattern::new(cli.pattern.clone()),
            replaygain: cli.replaygain,
            threads: cli.threads.unwrap_or_else(num_cpus::get),
            show_progress: !cli.quiet,
            scratch_dir: cli.scratch_dir.clone(),
            tools: ToolPaths::from_env(),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_root: PathBuf::from("./output"),
            encoder: Encoder::Vorbis { quality: 10.0 },
            pattern: PathPattern::default(),
            replaygain: false,
            threads: num_cpus::get().max(1),
            show_progress: true,
            scratch_dir: None,
            tools: ToolPaths::default(),
        }
    }
}
