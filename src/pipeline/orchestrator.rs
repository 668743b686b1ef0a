//! Pipeline orchestration
//!
//! Coordinates pre-flight checks, collection resolution, the worker pool and
//! the optional gain pass. The run either completes every queued item (and the
//! gain pass, when enabled) or stops at the first fatal error.

use crate::config::Settings;
use crate::discovery::collection::is_cue_sheet;
use crate::discovery::Collection;
use crate::encode::{ensure_available, Transcoder};
use crate::error::{Result, UntzError};
use crate::pipeline::pool::WorkerPool;
use crate::types::SourceFormat;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline result summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Items handed to the pool
    pub queued: usize,
    /// Items encoded successfully
    pub encoded: usize,
    /// Inputs ignored because they are not a source format
    pub skipped: usize,
    /// Whether the gain pass ran
    pub gain_applied: bool,
}

/// Run the full transcode pipeline
pub fn run(settings: &Settings) -> Result<RunSummary> {
    let pipeline_start = Instant::now();

    preflight(settings)?;

    // Resolve every input up front so a bad cue sheet or an unreadable
    // directory fails the run before any encoder starts. Collections own the
    // cue workspaces, so they must outlive the pool.
    let mut collections = Vec::with_capacity(settings.inputs.len());
    for input in &settings.inputs {
        let collection =
            Collection::resolve(input, &settings.tools, settings.scratch_dir.as_deref())?;
        debug!("Resolved {}", collection.describe());
        collections.push(collection);
    }

    let mut queue = Vec::new();
    let mut skipped = 0usize;
    for collection in &collections {
        for item in collection.items() {
            let item = item?;
            if SourceFormat::is_supported_path(&item) {
                queue.push(item);
            } else {
                warn!("Skipping \"{}\": not a FLAC file", item.display());
                skipped += 1;
            }
        }
    }
    info!("Discovered {} items", queue.len());

    let transcoder = Arc::new(Transcoder::new(
        settings.encoder.clone(),
        settings.pattern.clone(),
        settings.output_root.clone(),
        settings.tools.clone(),
    ));

    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(queue.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let pool = {
        let transcoder = Arc::clone(&transcoder);
        let progress_bar = progress_bar.clone();
        WorkerPool::spawn(settings.threads, move |item: &Path| {
            let written = transcoder.transcode(item)?;
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(
                    written
                        .file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .to_string(),
                );
            }
            Ok(())
        })?
    };

    info!("Started {} workers", pool.size());

    let mut queued = 0usize;
    for item in queue {
        if !pool.submit(item) {
            break;
        }
        queued += 1;
    }
    info!("Queued {} items", queued);

    let report = pool.finish();
    drop(collections);

    if let Some(pb) = progress_bar {
        match &report {
            Ok(_) => pb.finish_with_message("Encoding complete"),
            Err(_) => pb.abandon_with_message("Encoding aborted"),
        }
    }
    let report = report?;

    info!(
        "Encoded {} items in {:.2}s",
        report.processed,
        pipeline_start.elapsed().as_secs_f64()
    );

    let gain_applied = if settings.replaygain {
        transcoder.apply_gain()?;
        true
    } else {
        false
    };

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(RunSummary {
        queued,
        encoded: report.processed,
        skipped,
        gain_applied,
    })
}

/// Checks that must pass before any worker starts:
/// settings sanity, input existence and every external tool the run needs.
pub fn preflight(settings: &Settings) -> Result<()> {
    if settings.inputs.is_empty() {
        return Err(UntzError::ConfigError("no inputs given".to_string()));
    }
    if settings.threads == 0 {
        return Err(UntzError::ConfigError(
            "worker count must be at least 1".to_string(),
        ));
    }
    if settings.output_root.exists() && !settings.output_root.is_dir() {
        return Err(UntzError::invalid_input(
            &settings.output_root,
            "output root exists and is not a directory",
        ));
    }

    for input in &settings.inputs {
        if !input.exists() {
            return Err(UntzError::NotFound(input.clone()));
        }
    }

    let mut required: Vec<PathBuf> = vec![settings.encoder.program(&settings.tools).to_path_buf()];
    if settings.replaygain {
        required.push(settings.tools.rgbpm.clone());
    }
    if settings.inputs.iter().any(|i| i.is_file() && is_cue_sheet(i)) {
        required.extend(settings.tools.cue_tools().iter().map(|t| t.to_path_buf()));
    }
    for tool in &required {
        let found = ensure_available(tool)?;
        debug!("Found {}", found.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{Encoder, ToolPaths};
    use tempfile::TempDir;

    fn settings_for(input: &Path, output: &Path) -> Settings {
        Settings {
            inputs: vec![input.to_path_buf()],
            output_root: output.to_path_buf(),
            threads: 2,
            show_progress: false,
            ..Settings::default()
        }
    }

    #[test]
    fn test_preflight_rejects_missing_input() {
        let out = TempDir::new().unwrap();
        let settings = settings_for(Path::new("/nonexistent/untz/album"), out.path());
        assert!(matches!(preflight(&settings), Err(UntzError::NotFound(_))));
    }

    #[test]
    fn test_preflight_rejects_zero_threads() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_for(dir.path(), dir.path());
        settings.threads = 0;
        assert!(matches!(preflight(&settings), Err(UntzError::ConfigError(_))));
    }

    #[test]
    fn test_preflight_reports_missing_encoder() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_for(dir.path(), &dir.path().join("out"));
        settings.encoder = Encoder::Opus { bitrate: 96 };
        settings.tools = ToolPaths {
            opusenc: PathBuf::from("untz-missing-opusenc"),
            ..ToolPaths::default()
        };
        let err = preflight(&settings).unwrap_err();
        assert!(matches!(err, UntzError::MissingTool { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_PREFLIGHT);
    }

    #[test]
    fn test_preflight_rejects_file_as_output_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out");
        std::fs::write(&file, b"").unwrap();
        let settings = settings_for(dir.path(), &file);
        assert!(matches!(
            preflight(&settings),
            Err(UntzError::InvalidInput { .. })
        ));
    }
}
