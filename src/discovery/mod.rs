//! Source discovery
//!
//! Every input argument resolves to one [`Collection`], which yields the
//! single-track files to encode.

pub mod collection;
pub mod cue;

pub use collection::{Collection, Items};
pub use cue::CueSheet;
