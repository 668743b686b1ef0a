//! Metadata extraction from audio file tags
//!
//! Uses lofty to read Vorbis comments (FLAC), ID3v2 and RIFF INFO tags.
//! The file is parsed in one go; lofty holds no handle once `read` returns.

use crate::error::{Result, UntzError};
use crate::types::{TagKey, TagSet};
use lofty::file::{TaggedFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::{debug, trace};

/// Where an album artist may be stored, in lookup order
enum ArtistField {
    /// A field lofty has no mapping for; matched ignoring ASCII case
    Raw(&'static str),
    Mapped(ItemKey),
}

const ALBUM_ARTIST_FIELDS: [ArtistField; 6] = [
    ArtistField::Raw("ALBUM_ARTIST"),
    ArtistField::Mapped(ItemKey::AlbumArtist),
    ArtistField::Raw("ALBUM ARTIST"),
    ArtistField::Mapped(ItemKey::Composer),
    ArtistField::Mapped(ItemKey::Performer),
    ArtistField::Mapped(ItemKey::TrackArtist),
];

/// Read the requested tags from an audio file
///
/// Album artist and album are always resolved since they partition the
/// output tree. Other keys are only read when listed in `wanted`.
pub fn read_tags(path: &Path, wanted: &[TagKey]) -> Result<TagSet> {
    let tagged_file = open_tagged(path).map_err(|e| UntzError::UnreadableMetadata {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let tags = ordered_tags(&tagged_file);
    if tags.is_empty() {
        debug!("No tags found in {}", path.display());
    }
    trace!(
        "Tags for {}: {:?}",
        path.display(),
        tags.iter().map(|tag| tag.tag_type()).collect::<Vec<_>>()
    );

    let mut set = TagSet::new();
    for key in TagKey::ALL {
        let needed = matches!(key, TagKey::AlbumArtist | TagKey::Album) || wanted.contains(&key);
        if !needed {
            continue;
        }
        if let Some(value) = tags.iter().find_map(|tag| lookup(tag, key)) {
            set.insert(key, value);
        }
    }

    Ok(set)
}

/// Sniff the container from its content, falling back to the extension
fn open_tagged(path: &Path) -> std::result::Result<TaggedFile, lofty::error::LoftyError> {
    let probe = Probe::open(path)?.guess_file_type()?;
    probe.read()
}

/// Primary tag first, then whatever else the container carries
fn ordered_tags(file: &TaggedFile) -> Vec<&Tag> {
    let primary = file.primary_tag();
    let mut tags: Vec<&Tag> = primary.into_iter().collect();
    for tag in file.tags() {
        if primary.map_or(true, |p| p.tag_type() != tag.tag_type()) {
            tags.push(tag);
        }
    }
    tags
}

fn lookup(tag: &Tag, key: TagKey) -> Option<String> {
    let value = match key {
        TagKey::Genre => tag.genre().map(|s| s.to_string()),
        TagKey::Title => tag.title().map(|s| s.to_string()),
        TagKey::Album => tag.album().map(|s| s.to_string()),
        // Keep the raw text ("01") rather than the parsed number
        TagKey::TrackNumber => tag
            .get_string(&ItemKey::TrackNumber)
            .map(str::to_string)
            .or_else(|| tag.track().map(|n| n.to_string())),
        TagKey::Date => tag
            .get_string(&ItemKey::RecordingDate)
            .map(str::to_string)
            .or_else(|| tag.year().map(|y| y.to_string())),
        TagKey::AlbumArtist => ALBUM_ARTIST_FIELDS
            .iter()
            .find_map(|field| artist_field(tag, field))
            .map(str::to_string),
    };
    value.filter(|s| !s.is_empty())
}

fn artist_field<'a>(tag: &'a Tag, field: &ArtistField) -> Option<&'a str> {
    let value = match field {
        ArtistField::Mapped(key) => tag.get_string(key),
        // Vorbis comment field names are case-insensitive
        ArtistField::Raw(name) => tag.items().find_map(|item| match item.key() {
            ItemKey::Unknown(key) if key.eq_ignore_ascii_case(name) => item.value().text(),
            _ => None,
        }),
    };
    value.filter(|s| !s.is_empty())
}
