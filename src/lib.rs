//! untz - Transcode FLAC collections into a tidy Opus/Vorbis library
//!
//! Inputs (single files, directory trees, or cue-sheet albums) are expanded
//! into single-track items, each item's tags pick its output path, and a
//! fixed pool of workers runs the external encoder on every item.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: collection resolvers (file, directory, cue sheet)
//! - `tags`: tag reading and output path templating
//! - `encode`: encoder backends and external tool invocation
//! - `pipeline`: worker pool and run coordination
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use untz::{config::Settings, pipeline};
//!
//! let settings = Settings {
//!     inputs: vec![PathBuf::from("/music/flac")],
//!     output_root: PathBuf::from("/music/ogg"),
//!     ..Settings::default()
//! };
//! let summary = pipeline::run(&settings).expect("Transcode failed");
//! println!("Encoded {} tracks", summary.encoded);
//! ```

pub mod config;
pub mod discovery;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod tags;
pub mod types;

// Re-export key types at crate root
pub use error::{Result, UntzError};
pub use types::{AudioItem, TagKey, TagSet};
