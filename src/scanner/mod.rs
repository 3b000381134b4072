pub mod metadata;

use crate::SUPPORTED_EXTENSIONS;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Music library not found or not a directory: {0}")]
    RootMissing(PathBuf),
}

/// An audio file found under the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    /// Lowercase extension without the dot, one of `SUPPORTED_EXTENSIONS`.
    pub extension: String,
}

/// Walk `root` recursively and yield every supported audio file.
///
/// The walk is lazy and starts fresh on every call. Entries within a directory
/// are visited in file-name order, so the encounter order (and with it the
/// best-match tie-break) is the same on every platform. Unreadable entries are
/// logged and skipped.
pub fn scan(root: &Path) -> Result<impl Iterator<Item = AudioFile> + use<>, ScanError> {
    check_root(root)?;

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    Ok(walker.filter_map(|entry| {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                return None;
            }
        };
        if !entry.file_type().is_file() {
            return None;
        }
        let extension = audio_extension(entry.path())?;
        Some(AudioFile {
            path: entry.into_path(),
            extension,
        })
    }))
}

/// Fail unless `root` is an existing directory.
pub fn check_root(root: &Path) -> Result<(), ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }
    Ok(())
}

/// Lowercased extension of `path` if it is one we recognize.
pub fn audio_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn relative_names(root: &Path) -> Vec<String> {
        scan(root)
            .unwrap()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension(Path::new("a/b.flac")).as_deref(), Some("flac"));
        assert_eq!(audio_extension(Path::new("a/b.MP3")).as_deref(), Some("mp3"));
        assert_eq!(audio_extension(Path::new("song.Wma")).as_deref(), Some("wma"));
        assert_eq!(audio_extension(Path::new("cover.jpg")), None);
        assert_eq!(audio_extension(Path::new("README")), None);
        assert_eq!(audio_extension(Path::new("notes.shn")), None);
    }

    #[test]
    fn test_scan_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp3");
        touch(dir.path(), "a/one.FLAC");
        touch(dir.path(), "a/cover.jpg");
        touch(dir.path(), "a/deep/two.ogg");
        touch(dir.path(), "c.txt");
        touch(dir.path(), "d.wav");

        assert_eq!(
            relative_names(dir.path()),
            vec!["a/deep/two.ogg", "a/one.FLAC", "b.mp3", "d.wav"]
        );
    }

    #[test]
    fn test_scan_reports_lowercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Artist/Track.AAC");

        let files: Vec<AudioFile> = scan(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension, "aac");
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "x.mp3");
        touch(dir.path(), "y.mp3");

        assert_eq!(relative_names(dir.path()), relative_names(dir.path()));
        assert_eq!(relative_names(dir.path()).len(), 2);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(scan(&missing), Err(ScanError::RootMissing(_))));
    }

    #[test]
    fn test_check_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "song.mp3");
        assert!(check_root(dir.path()).is_ok());
        assert!(matches!(
            check_root(&dir.path().join("song.mp3")),
            Err(ScanError::RootMissing(_))
        ));
        assert!(check_root(&dir.path().join("missing")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_broken_and_looping_links() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "c.mp3");
        symlink(dir.path().join("gone.mp3"), dir.path().join("b.mp3")).unwrap();
        symlink(dir.path(), dir.path().join("loop")).unwrap();

        assert_eq!(relative_names(dir.path()), vec!["a.mp3", "c.mp3"]);
    }

    #[test]
    fn test_scan_root_is_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "song.mp3");
        assert!(scan(&dir.path().join("song.mp3")).is_err());
    }
}
