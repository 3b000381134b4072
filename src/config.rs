use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::matcher::Thresholds;
use crate::playlist::{PathMode, PlaylistFormat};
use crate::scanner::metadata::{ExternalProbe, MetadataResolver, MetadataSource};

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Music library to search (used when `match` has no `--source`).
    pub source_root: Option<PathBuf>,
    /// Directory the playlist and manifest are written to.
    pub dest_root: Option<PathBuf>,
    /// Playlist name (file stem of the output).
    pub playlist_name: String,
    pub format: PlaylistFormat,
    pub path_mode: PathMode,
    /// Minimum artist similarity, 0-100.
    pub artist_threshold: u8,
    /// Minimum song title similarity, 0-100.
    pub song_threshold: u8,
    /// Number of parallel metadata workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    pub metadata: MetadataConfig,
    pub probe: ProbeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            source_root: None,
            dest_root: None,
            playlist_name: "Playlist".to_string(),
            format: PlaylistFormat::default(),
            path_mode: PathMode::default(),
            artist_threshold: thresholds.artist,
            song_threshold: thresholds.song,
            workers: 0,
            metadata: MetadataConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

/// Which metadata sources to consult, in priority order. File and folder names
/// are always the last resort and needn't be listed.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub sources: Vec<SourceKind>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            sources: vec![SourceKind::Probe],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Embedded tags read in-process.
    Tags,
    /// External probe program.
    Probe,
    /// File and folder names.
    Path,
}

/// External tag probe settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Program to run (must accept ffprobe's arguments and JSON output flags).
    pub program: String,
    /// Give up on a single file after this many milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/playmatch/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            artist: self.artist_threshold.min(100),
            song: self.song_threshold.min(100),
        }
    }

    /// Build the metadata resolver described by `[metadata]` and `[probe]`.
    pub fn metadata_resolver(&self) -> MetadataResolver {
        let sources = self
            .metadata
            .sources
            .iter()
            .map(|kind| match kind {
                SourceKind::Tags => MetadataSource::EmbeddedTags,
                SourceKind::Probe => MetadataSource::ExternalProbe(ExternalProbe::new(
                    self.probe.program.clone(),
                    Duration::from_millis(self.probe.timeout_ms),
                )),
                SourceKind::Path => MetadataSource::PathHeuristic,
            })
            .collect();
        MetadataResolver::new(sources)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
