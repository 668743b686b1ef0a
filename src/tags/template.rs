//! Output path templating
//!
//! A pattern such as `%n - %t` becomes the file stem under
//! `<root>/<album artist>/<album>/`. Tokens:
//!
//! | token | value        |
//! |-------|--------------|
//! | `%g`  | genre        |
//! | `%n`  | track number |
//! | `%t`  | title        |
//! | `%d`  | date         |
//! | `%a`  | album artist |
//! | `%l`  | album        |
//! | `%%`  | literal `%`  |

use crate::types::{TagKey, TagSet};
use std::path::{Path, PathBuf};

/// Default file name pattern
pub const DEFAULT_PATTERN: &str = "%n - %t";

/// Characters that must never reach the filesystem from a tag value
const UNSAFE_CHARS: &[char] = &['"', '*', '/', ':', '<', '>', '?', '\\', '|'];

/// A macro-bearing file name template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
}

impl PathPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Keys the pattern actually uses, so the reader can skip the rest
    pub fn referenced_keys(&self) -> Vec<TagKey> {
        let mut keys = Vec::new();
        let mut chars = self.raw.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                continue;
            }
            match chars.next() {
                Some(m) => {
                    if let Some(key) = TagKey::from_macro(m) {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
                None => break,
            }
        }
        keys
    }

    /// Substitute every token in a single left-to-right pass.
    ///
    /// Substituted values are sanitized and never rescanned, so a title
    /// containing `%t` stays literal.
    pub fn expand(&self, tags: &TagSet) -> String {
        let mut out = String::with_capacity(self.raw.len() + 32);
        let mut chars = self.raw.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some(m) => match TagKey::from_macro(m) {
                    Some(key) => out.push_str(&sanitize(tags.get(key))),
                    None => {
                        out.push('%');
                        out.push(m);
                    }
                },
                None => out.push('%'),
            }
        }
        out
    }

    /// Render the full output path:
    /// `<root>/<album artist>/<album>/<expanded pattern>.<ext>`
    pub fn render(&self, tags: &TagSet, root: &Path, ext: &str) -> PathBuf {
        let file_name = format!("{}.{}", self.expand(tags), ext);
        root.join(sanitize(tags.get(TagKey::AlbumArtist)))
            .join(sanitize(tags.get(TagKey::Album)))
            .join(file_name)
    }
}

impl Default for PathPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

/// Replace directory-unsafe characters with `_`
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
