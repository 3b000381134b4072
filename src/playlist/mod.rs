pub mod format;
pub mod paths;

pub use format::{PlaylistEncoder, PlaylistEntry, PlaylistFormat};
pub use paths::PathMode;

use crate::matcher::Match;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Invalid playlist name: {0:?}")]
    InvalidName(String),
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where and how to write a playlist.
#[derive(Debug, Clone)]
pub struct WriteOptions<'a> {
    pub output_dir: &'a Path,
    pub name: &'a str,
    pub format: PlaylistFormat,
    pub source_root: &'a Path,
    pub path_mode: PathMode,
}

/// Files produced by `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub playlist: PathBuf,
    pub manifest: PathBuf,
}

/// Playlist entries for `matches`, in the order given.
pub fn entries(matches: &[Match], source_root: &Path, mode: PathMode) -> Vec<PlaylistEntry> {
    matches
        .iter()
        .map(|m| PlaylistEntry {
            display: format!("{} - {}", m.artist(), m.title()),
            path: paths::resolve(m.path(), source_root, mode),
        })
        .collect()
}

/// Full source path of every match, one per line, for whatever copies the files.
pub fn manifest(matches: &[Match]) -> String {
    matches
        .iter()
        .map(|m| format!("{}\n", m.path().display()))
        .collect()
}

/// Name of the sidecar manifest for playlist `name`.
pub fn manifest_file_name(name: &str) -> String {
    format!("{name}-FullPaths.txt")
}

/// Write `<name>.<ext>` and `<name>-FullPaths.txt` into the output directory.
///
/// Both files are rendered in full before anything touches the disk, and each is
/// written to a temporary sibling then renamed into place.
pub fn write(matches: &[Match], opts: &WriteOptions) -> Result<Written, PlaylistError> {
    validate_name(opts.name)?;

    let playlist_text = opts
        .format
        .encode(opts.name, &entries(matches, opts.source_root, opts.path_mode));
    let manifest_text = manifest(matches);

    std::fs::create_dir_all(opts.output_dir).map_err(|source| PlaylistError::CreateDir {
        path: opts.output_dir.to_path_buf(),
        source,
    })?;

    let playlist = opts
        .output_dir
        .join(format!("{}.{}", opts.name, opts.format.extension()));
    let manifest = opts.output_dir.join(manifest_file_name(opts.name));

    write_atomic(&playlist, &playlist_text)?;
    write_atomic(&manifest, &manifest_text)?;

    log::info!(
        "Wrote {} entries to {} (manifest {})",
        matches.len(),
        playlist.display(),
        manifest.display()
    );
    Ok(Written { playlist, manifest })
}

/// The name becomes a file name, so it can't be empty or contain separators.
fn validate_name(name: &str) -> Result<(), PlaylistError> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if bad {
        return Err(PlaylistError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), PlaylistError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = std::fs::write(&tmp, contents).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(source) = result {
        std::fs::remove_file(&tmp).ok();
        return Err(PlaylistError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Candidate;
    use crate::queries::Query;
    use crate::scanner::metadata::Metadata;
    use crate::scanner::AudioFile;

    fn make_match(path: &str, artist: &str, title: &str) -> Match {
        Match {
            query: Query {
                song: title.to_string(),
                artist: artist.to_string(),
            },
            candidate: Candidate {
                file: AudioFile {
                    path: PathBuf::from(path),
                    extension: "mp3".to_string(),
                },
                metadata: Metadata {
                    artist: artist.to_string(),
                    title: title.to_string(),
                    album: String::new(),
                },
                artist_score: 100.0,
                song_score: 100.0,
            },
        }
    }

    fn matches() -> Vec<Match> {
        vec![
            make_match("/lib/B/SongY.mp3", "B", "SongY"),
            make_match("/lib/A/SongX.mp3", "A", "SongX"),
        ]
    }

    #[test]
    fn test_entries_keep_match_order() {
        let e = entries(&matches(), Path::new("/lib"), PathMode::Relative);
        assert_eq!(e[0].display, "B - SongY");
        assert_eq!(e[0].path, "B/SongY.mp3");
        assert_eq!(e[1].display, "A - SongX");
    }

    #[test]
    fn test_entries_absolute() {
        let e = entries(&matches(), Path::new("/lib"), PathMode::Absolute);
        assert_eq!(e[1].path, "/lib/A/SongX.mp3");
    }

    #[test]
    fn test_manifest_lists_full_paths() {
        assert_eq!(manifest(&matches()), "/lib/B/SongY.mp3\n/lib/A/SongX.mp3\n");
        assert_eq!(manifest(&[]), "");
    }

    #[test]
    fn test_write_creates_playlist_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let opts = WriteOptions {
            output_dir: &out,
            name: "Road Trip",
            format: PlaylistFormat::M3u,
            source_root: Path::new("/lib"),
            path_mode: PathMode::Relative,
        };

        let written = write(&matches(), &opts).unwrap();
        assert_eq!(written.playlist, out.join("Road Trip.m3u"));
        assert_eq!(written.manifest, out.join("Road Trip-FullPaths.txt"));

        let playlist = std::fs::read_to_string(&written.playlist).unwrap();
        assert_eq!(
            playlist,
            "#EXTM3U\n#EXTINF:-1,B - SongY\nB/SongY.mp3\n#EXTINF:-1,A - SongX\nA/SongX.mp3\n"
        );
        let manifest = std::fs::read_to_string(&written.manifest).unwrap();
        assert_eq!(manifest, "/lib/B/SongY.mp3\n/lib/A/SongX.mp3\n");

        // No temp files left behind
        let names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[test]
    fn test_write_overwrites_previous_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let opts = WriteOptions {
            output_dir: dir.path(),
            name: "mix",
            format: PlaylistFormat::Pls,
            source_root: Path::new("/lib"),
            path_mode: PathMode::Absolute,
        };
        write(&matches(), &opts).unwrap();
        let written = write(&matches()[..1], &opts).unwrap();

        let text = std::fs::read_to_string(written.playlist).unwrap();
        assert!(text.contains("NumberOfEntries=1"));
        assert!(text.contains("File1=/lib/B/SongY.mp3"));
    }

    #[test]
    fn test_write_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["", "  ", "a/b", r"a\b", ".."] {
            let opts = WriteOptions {
                output_dir: dir.path(),
                name,
                format: PlaylistFormat::M3u,
                source_root: Path::new("/lib"),
                path_mode: PathMode::Relative,
            };
            assert!(matches!(write(&[], &opts), Err(PlaylistError::InvalidName(_))), "{name:?}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_fails_when_output_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let opts = WriteOptions {
            output_dir: &blocker,
            name: "mix",
            format: PlaylistFormat::Wpl,
            source_root: Path::new("/lib"),
            path_mode: PathMode::Relative,
        };
        assert!(matches!(write(&matches(), &opts), Err(PlaylistError::CreateDir { .. })));
    }
}
