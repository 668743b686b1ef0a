//! Core data types for untz
//!
//! These types represent the domain model and flow through the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// Work items
// =============================================================================

/// One resolved single-track audio file
pub type AudioItem = PathBuf;

// =============================================================================
// Tag model
// =============================================================================

/// Metadata fields a path pattern can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKey {
    Genre,
    TrackNumber,
    Title,
    Date,
    AlbumArtist,
    Album,
}

impl TagKey {
    /// Every key, in macro-table order
    pub const ALL: [TagKey; 6] = [
        TagKey::Genre,
        TagKey::TrackNumber,
        TagKey::Title,
        TagKey::Date,
        TagKey::AlbumArtist,
        TagKey::Album,
    ];

    /// Look up the key for the character following `%` in a pattern
    pub fn from_macro(c: char) -> Option<Self> {
        match c {
            'g' => Some(TagKey::Genre),
            'n' => Some(TagKey::TrackNumber),
            't' => Some(TagKey::Title),
            'd' => Some(TagKey::Date),
            'a' => Some(TagKey::AlbumArtist),
            'l' => Some(TagKey::Album),
            _ => None,
        }
    }

    /// Two-character macro token (e.g. "%n")
    pub fn macro_token(self) -> &'static str {
        match self {
            TagKey::Genre => "%g",
            TagKey::TrackNumber => "%n",
            TagKey::Title => "%t",
            TagKey::Date => "%d",
            TagKey::AlbumArtist => "%a",
            TagKey::Album => "%l",
        }
    }

    /// Literal used when the file carries no value for this key
    pub fn fallback(self) -> &'static str {
        match self {
            TagKey::AlbumArtist => "Unknown artist",
            TagKey::Album => "Unknown album",
            _ => "(none)",
        }
    }
}

/// Extracted metadata for one audio item
///
/// Only the keys that were requested are present; `get` falls back to the
/// key's literal for anything missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    values: BTreeMap<TagKey, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TagKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// Builder-style insert, handy for literals
    pub fn with(mut self, key: TagKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for `key`, or its fallback literal
    pub fn get(&self, key: TagKey) -> &str {
        self.values
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.fallback())
    }

    pub fn contains(&self, key: TagKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Source formats untz will transcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Flac,
}

impl SourceFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "flac" => Some(SourceFormat::Flac),
            _ => None,
        }
    }

    /// Extension the cue splitter writes
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Flac => "flac",
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_table_round_trips() {
        for key in TagKey::ALL {
            let c = key.macro_token().chars().nth(1).unwrap();
            assert_eq!(TagKey::from_macro(c), Some(key));
        }
        assert_eq!(TagKey::from_macro('%'), None);
        assert_eq!(TagKey::from_macro('x'), None);
    }

    #[test]
    fn test_tagset_fallbacks() {
        let tags = TagSet::new().with(TagKey::Title, "Intro");
        assert_eq!(tags.get(TagKey::Title), "Intro");
        assert_eq!(tags.get(TagKey::Genre), "(none)");
        assert_eq!(tags.get(TagKey::AlbumArtist), "Unknown artist");
        assert_eq!(tags.get(TagKey::Album), "Unknown album");
    }

    #[test]
    fn test_source_format_detection() {
        assert!(SourceFormat::is_supported_path(Path::new("/music/a.flac")));
        assert!(SourceFormat::is_supported_path(Path::new("/music/B.FLAC")));
        assert!(!SourceFormat::is_supported_path(Path::new("/music/a.mp3")));
        assert!(!SourceFormat::is_supported_path(Path::new("/music/flac")));
    }
}
