//! Unified error types for untz
//!
//! Error strategy:
//! - Argument and pre-flight errors: detected before any worker starts, abort cleanly
//! - Per-item errors (metadata, encoder exit status): fatal for the whole run
//!
//! There is no skip-and-continue policy. The first fatal cause is the one reported.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for bad arguments or unusable paths
pub const EXIT_INVALID_INPUT: u8 = 2;

/// Exit code for malformed cue sheets and missing external tools
pub const EXIT_PREFLIGHT: u8 = 3;

/// Exit code for anything without a more specific origin
pub const EXIT_GENERIC: u8 = 1;

/// Top-level error type for untz operations
#[derive(Debug, Error)]
pub enum UntzError {
    // =========================================================================
    // Detected before dispatch
    // =========================================================================
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    NotFound(PathBuf),

    #[error("Malformed cue sheet '{path}': {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Required tool '{tool}' was not found\n  Tip: Install it or point UNTZ_* at the binary")]
    MissingTool { tool: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    // =========================================================================
    // Fatal during the run
    // =========================================================================
    #[error("Cannot read metadata from '{path}': {reason}")]
    UnreadableMetadata { path: PathBuf, reason: String },

    #[error("{tool} exited with code {exit_code}: {stderr}")]
    ExternalToolFailure {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Worker thread panicked: {0}")]
    WorkerPanic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for untz operations
pub type Result<T> = std::result::Result<T, UntzError>;

impl UntzError {
    /// Process exit code reflecting where the failure came from
    pub fn exit_code(&self) -> u8 {
        match self {
            UntzError::ExternalToolFailure { exit_code, .. } => match u8::try_from(*exit_code) {
                Ok(0) | Err(_) => EXIT_GENERIC,
                Ok(code) => code,
            },
            UntzError::MalformedInput { .. } | UntzError::MissingTool { .. } => EXIT_PREFLIGHT,
            UntzError::InvalidInput { .. } | UntzError::NotFound(_) | UntzError::ConfigError(_) => {
                EXIT_INVALID_INPUT
            }
            _ => EXIT_GENERIC,
        }
    }

    /// Returns true if this error was raised before any work was dispatched
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            UntzError::InvalidInput { .. }
                | UntzError::NotFound(_)
                | UntzError::MalformedInput { .. }
                | UntzError::MissingTool { .. }
                | UntzError::ConfigError(_)
        )
    }

    /// Create an invalid input error
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        UntzError::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => format!(
                "Permission denied. Check that you have write access to {}",
                path.display()
            ),
            std::io::ErrorKind::NotFound => format!(
                "Parent does not exist: {}",
                path.parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            _ => err.to_string(),
        };
        UntzError::OutputError { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_uses_tool_exit_code() {
        let err = UntzError::ExternalToolFailure {
            tool: "oggenc".to_string(),
            exit_code: 2,
            stderr: "bad flac".to_string(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_tool_failure_out_of_range_code() {
        let killed = UntzError::ExternalToolFailure {
            tool: "opusenc".to_string(),
            exit_code: -1,
            stderr: String::new(),
        };
        assert_eq!(killed.exit_code(), EXIT_GENERIC);
    }

    #[test]
    fn test_preflight_codes_are_distinct() {
        let malformed = UntzError::MalformedInput {
            path: PathBuf::from("album.cue"),
            reason: "no FILE directive".to_string(),
        };
        let missing = UntzError::MissingTool {
            tool: "shnsplit".to_string(),
        };
        assert_eq!(malformed.exit_code(), EXIT_PREFLIGHT);
        assert_eq!(missing.exit_code(), EXIT_PREFLIGHT);
        assert_ne!(EXIT_PREFLIGHT, EXIT_INVALID_INPUT);
        assert!(malformed.is_preflight());
    }

    #[test]
    fn test_metadata_error_is_not_preflight() {
        let err = UntzError::UnreadableMetadata {
            path: PathBuf::from("track.flac"),
            reason: "not audio".to_string(),
        };
        assert!(!err.is_preflight());
        assert_eq!(err.exit_code(), EXIT_GENERIC);
    }

    #[test]
    fn test_output_error_names_missing_parent() {
        let err = UntzError::output_error(
            "/out/Artist/Album/01.ogg",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        match err {
            UntzError::OutputError { reason, .. } => {
                assert_eq!(reason, "Parent does not exist: /out/Artist/Album")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
