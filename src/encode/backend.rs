//! Encoder backends
//!
//! Two interchangeable variants behind one enum. Both hand the actual work to
//! an external binary and share the gain pass.

use crate::encode::tools::{run_tool, ToolPaths};
use crate::error::{Result, UntzError};
use crate::tags::{read_tags, PathPattern};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info};

/// Encoder selection, as named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderKind {
    Opus,
    #[default]
    Vorbis,
}

impl FromStr for EncoderKind {
    type Err = UntzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "opus" => Ok(EncoderKind::Opus),
            "vorbis" => Ok(EncoderKind::Vorbis),
            other => Err(UntzError::ConfigError(format!("invalid encoder: {}", other))),
        }
    }
}

/// A configured encoder backend
#[derive(Debug, Clone, PartialEq)]
pub enum Encoder {
    /// Constant-bitrate Opus, bitrate in kbps
    Opus { bitrate: u32 },
    /// Variable-quality Vorbis. Nominally -1.0..=10.0; out-of-range values
    /// are passed through for oggenc to deal with.
    Vorbis { quality: f64 },
}

impl Encoder {
    /// Output file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Encoder::Opus { .. } => "opus",
            Encoder::Vorbis { .. } => "ogg",
        }
    }

    /// Binary this backend runs
    pub fn program<'a>(&self, tools: &'a ToolPaths) -> &'a Path {
        match self {
            Encoder::Opus { .. } => tools.opusenc.as_path(),
            Encoder::Vorbis { .. } => tools.oggenc.as_path(),
        }
    }

    /// Argument vector for one encode
    pub fn encode_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        match self {
            Encoder::Opus { bitrate } => vec![
                "--bitrate".into(),
                bitrate.to_string().into(),
                input.into(),
                output.into(),
            ],
            Encoder::Vorbis { quality } => vec![
                "-q".into(),
                quality.to_string().into(),
                "-o".into(),
                output.into(),
                input.into(),
            ],
        }
    }

    /// Encode one item to an already-rendered path
    pub fn encode(&self, input: &Path, output: &Path, tools: &ToolPaths) -> Result<()> {
        run_tool(self.program(tools), self.encode_args(input, output))?;
        Ok(())
    }

    /// Run the batch gain tagger over the whole output root
    pub fn apply_gain(&self, root: &Path, tools: &ToolPaths) -> Result<()> {
        info!("Applying gain tags under {}", root.display());
        let args: [OsString; 2] = ["-b".into(), root.into()];
        run_tool(&tools.rgbpm, args)?;
        Ok(())
    }
}

/// Serializes directory creation across workers.
///
/// The lock covers only the mkdir step; encoders run outside it.
#[derive(Debug, Default)]
pub struct DirectoryGuard {
    lock: Mutex<()>,
}

impl DirectoryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure every directory above `file` exists
    pub fn ensure_parent(&self, file: &Path) -> Result<()> {
        let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };

        // A poisoned lock only means another worker panicked mid-mkdir;
        // create_dir_all is idempotent so carrying on is sound.
        let _held = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if dir.is_dir() {
            return Ok(());
        }
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                debug!("Created \"{}\"", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(UntzError::output_error(dir, e)),
        }
    }
}

/// Everything a worker needs to turn one source file into one output file
#[derive(Debug)]
pub struct Transcoder {
    encoder: Encoder,
    pattern: PathPattern,
    output_root: PathBuf,
    tools: ToolPaths,
    dirs: DirectoryGuard,
}

impl Transcoder {
    pub fn new(
        encoder: Encoder,
        pattern: PathPattern,
        output_root: PathBuf,
        tools: ToolPaths,
    ) -> Self {
        Self {
            encoder,
            pattern,
            output_root,
            tools,
            dirs: DirectoryGuard::new(),
        }
    }

    /// Where `item` would be written
    pub fn output_path(&self, item: &Path) -> Result<PathBuf> {
        let tags = read_tags(item, &self.pattern.referenced_keys())?;
        Ok(self
            .pattern
            .render(&tags, &self.output_root, self.encoder.extension()))
    }

    /// Tag read, render, mkdir, encode. Returns the written path.
    pub fn transcode(&self, item: &Path) -> Result<PathBuf> {
        let output = self.output_path(item)?;
        self.dirs.ensure_parent(&output)?;

        info!("Encoding \"{}\"", item.display());
        self.encoder.encode(item, &output, &self.tools)?;
        debug!("Wrote \"{}\"", output.display());
        Ok(output)
    }

    /// Gain pass over the output root
    pub fn apply_gain(&self) -> Result<()> {
        self.encoder.apply_gain(&self.output_root, &self.tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_encoder_kind_parsing() {
        assert_eq!("opus".parse::<EncoderKind>().unwrap(), EncoderKind::Opus);
        assert_eq!("Vorbis".parse::<EncoderKind>().unwrap(), EncoderKind::Vorbis);
        assert!("mp3".parse::<EncoderKind>().is_err());
        assert_eq!(EncoderKind::default(), EncoderKind::Vorbis);
    }

    #[test]
    fn test_opus_arguments() {
        let encoder = Encoder::Opus { bitrate: 128 };
        let args = encoder.encode_args(Path::new("in.flac"), Path::new("/out/a.opus"));
        assert_eq!(
            args_as_strings(args),
            vec!["--bitrate", "128", "in.flac", "/out/a.opus"]
        );
        assert_eq!(encoder.extension(), "opus");
    }

    #[test]
    fn test_vorbis_quality_passed_verbatim() {
        let encoder = Encoder::Vorbis { quality: 11.5 };
        let args = encoder.encode_args(Path::new("in.flac"), Path::new("/out/a.ogg"));
        assert_eq!(
            args_as_strings(args),
            vec!["-q", "11.5", "-o", "/out/a.ogg", "in.flac"]
        );
        assert_eq!(encoder.extension(), "ogg");
    }

    #[test]
    fn test_vorbis_negative_fractional_quality() {
        let encoder = Encoder::Vorbis { quality: -0.5 };
        let args = args_as_strings(encoder.encode_args(Path::new("i"), Path::new("o")));
        assert_eq!(args[1], "-0.5");
    }

    #[test]
    fn test_ensure_parent_is_idempotent() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("Artist/Album/01 - Intro.ogg");
        let guard = DirectoryGuard::new();
        guard.ensure_parent(&target).unwrap();
        guard.ensure_parent(&target).unwrap();
        assert!(root.path().join("Artist/Album").is_dir());
    }

    #[test]
    fn test_concurrent_ensure_parent() {
        let root = TempDir::new().unwrap();
        let guard = Arc::new(DirectoryGuard::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let guard = Arc::clone(&guard);
                let target = root.path().join(format!("Shared/Album/{:02}.ogg", i));
                thread::spawn(move || guard.ensure_parent(&target))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(root.path().join("Shared/Album").is_dir());
    }

    #[test]
    fn test_ensure_parent_fails_under_a_file() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("Artist");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = DirectoryGuard::new()
            .ensure_parent(&blocker.join("Album/x.ogg"))
            .unwrap_err();
        assert!(matches!(err, UntzError::OutputError { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_gain_failure_surfaces_exit_code() {
        let root = TempDir::new().unwrap();
        let tools = ToolPaths {
            rgbpm: PathBuf::from("false"),
            ..ToolPaths::default()
        };
        let err = Encoder::Vorbis { quality: 10.0 }
            .apply_gain(root.path(), &tools)
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err, UntzError::ExternalToolFailure { .. }));
    }
}
