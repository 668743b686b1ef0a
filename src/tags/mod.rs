//! Tag extraction and output path templating

pub mod reader;
pub mod template;

pub use reader::read_tags;
pub use template::PathPattern;
