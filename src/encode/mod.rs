//! Encoder backends and the external tools they drive

pub mod backend;
pub mod tools;

pub use backend::{DirectoryGuard, Encoder, EncoderKind, Transcoder};
pub use tools::{ensure_available, run_tool, ToolPaths};
