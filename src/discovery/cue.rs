//! Cue sheet expansion
//!
//! A cue sheet indexes tracks inside one continuous audio image. Expanding it
//! takes four external steps inside a private workspace:
//!
//! 1. `dos2unix` copies the sheet in with unix line endings
//! 2. the `FILE "<name>" WAVE` directive names the image
//! 3. `shnsplit` cuts the image into one file per track
//! 4. `cuetag.sh` copies the cue metadata onto the split files
//!
//! The workspace is a [`TempDir`], so it is removed when the `CueSheet` is
//! dropped, and also when any step above fails and `open` returns early.

use crate::encode::tools::{run_tool, ToolPaths};
use crate::error::{Result, UntzError};
use crate::types::{AudioItem, SourceFormat};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;
use tracing::{debug, info};

/// Name template handed to the splitter
const SPLIT_NAME_FORMAT: &str = "%n - %t";

const WORKSPACE_PREFIX: &str = "untz-cue-";

/// `FILE "<name>" WAVE`, anchored at the start of the line
static FILE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*FILE "(.+)" WAVE"#).expect("FILE directive pattern is valid")
});

/// An expanded cue sheet and the workspace holding its tracks
#[derive(Debug)]
pub struct CueSheet {
    source: PathBuf,
    tracks: Vec<AudioItem>,
    // Declared last so it is dropped after everything that points into it
    workspace: TempDir,
}

impl CueSheet {
    /// Split a cue-indexed image into per-track files.
    ///
    /// `scratch` is the parent for the workspace; `None` uses the system
    /// temp directory.
    pub fn open(cue_path: &Path, tools: &ToolPaths, scratch: Option<&Path>) -> Result<Self> {
        let workspace = create_workspace(scratch)?;
        debug!(
            "Expanding {} in {}",
            cue_path.display(),
            workspace.path().display()
        );

        let file_name = cue_path
            .file_name()
            .ok_or_else(|| UntzError::invalid_input(cue_path, "cue sheet has no file name"))?;
        let normalized = workspace.path().join(file_name);
        let args: [OsString; 3] = ["-n".into(), cue_path.into(), normalized.clone().into()];
        run_tool(&tools.dos2unix, args)?;

        let text = std::fs::read(&normalized)?;
        let referenced = find_audio_reference(&String::from_utf8_lossy(&text)).ok_or_else(|| {
            UntzError::MalformedInput {
                path: cue_path.to_path_buf(),
                reason: "no FILE \"<name>\" WAVE directive".to_string(),
            }
        })?;
        let audio = cue_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(referenced);

        let ext = SourceFormat::Flac.extension();
        let split_args: Vec<OsString> = vec![
            "-t".into(),
            SPLIT_NAME_FORMAT.into(),
            "-o".into(),
            ext.into(),
            "-d".into(),
            workspace.path().into(),
            "-f".into(),
            normalized.clone().into(),
            audio.into(),
        ];
        run_tool(&tools.shnsplit, split_args)?;

        let tracks = list_tracks(workspace.path())?;

        let mut tag_args: Vec<OsString> = vec![normalized.into()];
        tag_args.extend(tracks.iter().map(OsString::from));
        run_tool(&tools.cuetag, tag_args)?;

        info!(
            "Split {} into {} tracks",
            cue_path.display(),
            tracks.len()
        );

        Ok(Self {
            source: cue_path.to_path_buf(),
            tracks,
            workspace,
        })
    }

    /// The cue sheet this was expanded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory holding the split tracks
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// Split tracks, sorted by file name
    pub fn tracks(&self) -> &[AudioItem] {
        &self.tracks
    }
}

fn create_workspace(scratch: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(WORKSPACE_PREFIX);
    let dir = match scratch {
        Some(parent) => builder
            .tempdir_in(parent)
            .map_err(|e| UntzError::output_error(parent, e))?,
        None => builder.tempdir()?,
    };
    Ok(dir)
}

/// Source-format files directly inside the workspace
fn list_tracks(workspace: &Path) -> Result<Vec<AudioItem>> {
    let mut tracks = Vec::new();
    for entry in std::fs::read_dir(workspace)? {
        let path = entry?.path();
        if path.is_file() && SourceFormat::is_supported_path(&path) {
            tracks.push(path);
        }
    }
    tracks.sort();
    Ok(tracks)
}

/// Name of the audio image referenced by a cue sheet.
///
/// Looks for `FILE "<name>" WAVE`; when several lines match, the last wins.
pub fn find_audio_reference(cue: &str) -> Option<String> {
    cue.lines()
        .filter_map(|line| FILE_DIRECTIVE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "REM GENRE Rock\r\n\
PERFORMER \"Test Artist\"\n\
TITLE \"Demo\"\n\
FILE \"Demo Image.flac\" WAVE\n\
  TRACK 01 AUDIO\n\
    TITLE \"Intro\"\n\
    INDEX 01 00:00:00\n\
  TRACK 02 AUDIO\n\
    TITLE \"Outro\"\n\
    INDEX 01 03:12:40\n";

    #[test]
    fn test_finds_file_directive() {
        assert_eq!(
            find_audio_reference(SHEET).as_deref(),
            Some("Demo Image.flac")
        );
    }

    #[test]
    fn test_last_directive_wins() {
        let sheet = "FILE \"one.wav\" WAVE\nFILE \"two.wav\" WAVE\n";
        assert_eq!(find_audio_reference(sheet).as_deref(), Some("two.wav"));
    }

    #[test]
    fn test_quoted_name_with_quotes_inside() {
        let sheet = "FILE \"say \"hi\".wav\" WAVE\n";
        assert_eq!(find_audio_reference(sheet).as_deref(), Some("say \"hi\".wav"));
    }

    #[test]
    fn test_directive_must_start_the_line() {
        let sheet = "REM FILE \"fake.wav\" WAVE\n  FILE \"real.wav\" WAVE\n";
        assert_eq!(find_audio_reference(sheet).as_deref(), Some("real.wav"));
        assert_eq!(find_audio_reference("REM FILE \"fake.wav\" WAVE\n"), None);
    }

    #[test]
    fn test_missing_directive() {
        assert_eq!(find_audio_reference("TITLE \"x\"\nFILE \"a.mp3\" MP3\n"), None);
        assert_eq!(find_audio_reference("FILE \"\" WAVE\n"), None);
        assert_eq!(find_audio_reference(""), None);
    }
}
