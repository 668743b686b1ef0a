//! Collection resolvers: single files, directory trees and cue sheets

use crate::discovery::cue::CueSheet;
use crate::encode::ToolPaths;
use crate::error::{Result, UntzError};
use crate::types::{AudioItem, SourceFormat};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Lazy sequence of audio items produced by a collection.
///
/// A directory entry that cannot be read yields an error instead of being
/// skipped, so a partially readable tree never passes for a complete one.
pub type Items<'a> = Box<dyn Iterator<Item = Result<AudioItem>> + 'a>;

/// One input argument, resolved
#[derive(Debug)]
pub enum Collection {
    /// A single file
    Singlet(PathBuf),
    /// Every source file below a directory, in walk order
    Directory(PathBuf),
    /// Tracks split out of a cue-indexed image into a private workspace
    Cue(CueSheet),
}

impl Collection {
    /// Pick the resolver for an input path.
    ///
    /// Directories walk, `.cue` files split, anything else is a singlet.
    pub fn resolve(input: &Path, tools: &ToolPaths, scratch: Option<&Path>) -> Result<Self> {
        if !input.exists() {
            return Err(UntzError::NotFound(input.to_path_buf()));
        }
        if input.is_dir() {
            return Self::directory(input);
        }
        if is_cue_sheet(input) {
            return Ok(Collection::Cue(CueSheet::open(input, tools, scratch)?));
        }
        Ok(Self::singlet(input))
    }

    pub fn singlet(path: impl Into<PathBuf>) -> Self {
        Collection::Singlet(path.into())
    }

    pub fn directory(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(UntzError::invalid_input(path, "not a directory"));
        }
        Ok(Collection::Directory(path))
    }

    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            Collection::Singlet(p) => format!("file {}", p.display()),
            Collection::Directory(p) => format!("directory {}", p.display()),
            Collection::Cue(c) => format!("cue sheet {}", c.source().display()),
        }
    }

    /// The items this collection produces.
    ///
    /// Directory order is whatever the filesystem hands back.
    pub fn items(&self) -> Items<'_> {
        match self {
            Collection::Singlet(path) => Box::new(std::iter::once(Ok(path.clone()))),
            Collection::Directory(root) => Box::new(
                WalkDir::new(root)
                    .into_iter()
                    .filter_map(move |entry| match entry {
                        Ok(entry) if entry.file_type().is_file() => {
                            let path = entry.into_path();
                            SourceFormat::is_supported_path(&path).then(|| {
                                debug!("Discovered: {}", path.display());
                                Ok(path)
                            })
                        }
                        Ok(_) => None,
                        Err(e) => Some(Err(walk_error(root, e))),
                    }),
            ),
            Collection::Cue(cue) => Box::new(cue.tracks().iter().cloned().map(Ok)),
        }
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> UntzError {
    let path = err.path().unwrap_or(root).to_path_buf();
    UntzError::InvalidInput {
        path,
        reason: format!("cannot read directory entry: {}", err),
    }
}

pub(crate) fn is_cue_sheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("cue"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_singlet_yields_exactly_one() {
        let collection = Collection::singlet("/music/track.flac");
        let items: Vec<_> = collection.items().collect::<Result<_>>().unwrap();
        assert_eq!(items, vec![PathBuf::from("/music/track.flac")]);
    }

    #[test]
    fn test_directory_walks_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("disc1/extras");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.flac"), b"").unwrap();
        fs::write(dir.path().join("disc1/b.FLAC"), b"").unwrap();
        fs::write(nested.join("c.flac"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let collection = Collection::directory(dir.path()).unwrap();
        let mut items: Vec<_> = collection.items().collect::<Result<_>>().unwrap();
        items.sort();

        assert_eq!(
            items,
            vec![
                dir.path().join("a.flac"),
                dir.path().join("disc1/b.FLAC"),
                nested.join("c.flac"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.flac"), b"").unwrap();
        fs::write(dir.path().join("a.flac"), b"").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let collection = Collection::directory(dir.path()).unwrap();
        let result: Result<Vec<_>> = collection.items().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(UntzError::InvalidInput { path, .. }) => assert_eq!(path, locked),
            other => panic!("expected unreadable entry error, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_rejects_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.flac");
        fs::write(&file, b"").unwrap();

        let err = Collection::directory(&file).unwrap_err();
        assert!(matches!(err, UntzError::InvalidInput { .. }));
    }

    #[test]
    fn test_resolve_dispatch() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.flac");
        fs::write(&file, b"").unwrap();
        let tools = ToolPaths::default();

        assert!(matches!(
            Collection::resolve(dir.path(), &tools, None).unwrap(),
            Collection::Directory(_)
        ));
        assert!(matches!(
            Collection::resolve(&file, &tools, None).unwrap(),
            Collection::Singlet(_)
        ));
        assert!(matches!(
            Collection::resolve(&dir.path().join("missing.flac"), &tools, None),
            Err(UntzError::NotFound(_))
        ));
    }

    #[test]
    fn test_cue_extension_detection() {
        assert!(is_cue_sheet(Path::new("album.cue")));
        assert!(is_cue_sheet(Path::new("ALBUM.CUE")));
        assert!(!is_cue_sheet(Path::new("album.flac")));
        assert!(!is_cue_sheet(Path::new("cue")));
    }
}
