//! External tool invocation
//!
//! Every collaborator binary is run with a fixed argument vector and judged by
//! exit status alone: 0 is success, anything else is fatal and carries the
//! captured stderr.

use crate::error::{Result, UntzError};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Locations of the external binaries untz drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Cue sheet line-ending normalizer
    pub dos2unix: PathBuf,
    /// Cue-driven file splitter
    pub shnsplit: PathBuf,
    /// Cue metadata propagation script
    pub cuetag: PathBuf,
    pub opusenc: PathBuf,
    pub oggenc: PathBuf,
    /// Batch gain tagger
    pub rgbpm: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            dos2unix: PathBuf::from("dos2unix"),
            shnsplit: PathBuf::from("shnsplit"),
            cuetag: PathBuf::from("cuetag.sh"),
            opusenc: PathBuf::from("opusenc"),
            oggenc: PathBuf::from("oggenc"),
            rgbpm: PathBuf::from("rgbpm"),
        }
    }
}

impl ToolPaths {
    /// Defaults, overridden by `UNTZ_<TOOL>` environment variables
    pub fn from_env() -> Self {
        let mut tools = Self::default();
        let overrides: [(&str, &mut PathBuf); 6] = [
            ("UNTZ_DOS2UNIX", &mut tools.dos2unix),
            ("UNTZ_SHNSPLIT", &mut tools.shnsplit),
            ("UNTZ_CUETAG", &mut tools.cuetag),
            ("UNTZ_OPUSENC", &mut tools.opusenc),
            ("UNTZ_OGGENC", &mut tools.oggenc),
            ("UNTZ_RGBPM", &mut tools.rgbpm),
        ];
        for (var, slot) in overrides {
            if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
                debug!("{} overrides {}", var, slot.display());
                *slot = PathBuf::from(value);
            }
        }
        tools
    }

    /// Tools needed to expand cue sheets
    pub fn cue_tools(&self) -> [&Path; 3] {
        [
            self.dos2unix.as_path(),
            self.shnsplit.as_path(),
            self.cuetag.as_path(),
        ]
    }
}

/// Display name used in logs and errors
pub fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .to_string()
}

/// Run a tool to completion, capturing its output.
///
/// Non-zero exit becomes `ExternalToolFailure`; a binary that cannot be
/// spawned at all becomes `MissingTool`.
pub fn run_tool<I, S>(program: &Path, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let name = tool_name(program);

    debug!(
        "Running: {} {}",
        program.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new(program).args(&args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UntzError::MissingTool { tool: name.clone() }
        } else {
            UntzError::ExternalToolFailure {
                tool: name.clone(),
                exit_code: -1,
                stderr: format!("failed to start: {}", e),
            }
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(UntzError::ExternalToolFailure {
            tool: name,
            exit_code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Check that a tool can be found before any work is dispatched
pub fn ensure_available(program: &Path) -> Result<PathBuf> {
    locate(program).ok_or_else(|| UntzError::MissingTool {
        tool: program.display().to_string(),
    })
}

fn locate(program: &Path) -> Option<PathBuf> {
    // Explicit paths are taken as-is
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
