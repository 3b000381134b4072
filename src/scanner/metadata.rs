use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// How often a running probe is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resolved metadata for one library file. `artist` and `title` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub artist: String,
    pub title: String,
    pub album: String,
}

/// Whatever a single source managed to read. Blank values are stored as `None`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PartialTags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl PartialTags {
    fn new(artist: Option<String>, title: Option<String>, album: Option<String>) -> Self {
        Self {
            artist: non_blank(artist),
            title: non_blank(title),
            album: non_blank(album),
        }
    }

    fn is_complete(&self) -> bool {
        self.artist.is_some() && self.title.is_some() && self.album.is_some()
    }

    /// Fill fields still missing in `self` from `other`.
    fn merge_missing(&mut self, other: PartialTags) {
        if self.artist.is_none() {
            self.artist = other.artist;
        }
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.album.is_none() {
            self.album = other.album;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Why a metadata source produced nothing. Never escapes the resolver.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{0} not found on PATH")]
    ProgramNotFound(String),
    #[error("{0} previously found unavailable")]
    Unavailable(String),
    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
    #[error("Invalid probe output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Tag read error: {0}")]
    Tags(#[from] lofty::error::LoftyError),
    #[error("No tags present")]
    NoTags,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// External tag probe (ffprobe-compatible) run as a subprocess with a deadline.
#[derive(Debug)]
pub struct ExternalProbe {
    program: String,
    timeout: Duration,
    /// Set once the program fails to spawn so later files skip straight to fallback.
    unavailable: AtomicBool,
}

impl ExternalProbe {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn read(&self, path: &Path) -> Result<PartialTags, ProbeError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(ProbeError::Unavailable(self.program.clone()));
        }
        let stdout = self.run(path)?;
        parse_probe_output(&stdout)
    }

    fn run(&self, path: &Path) -> Result<Vec<u8>, ProbeError> {
        let spawned = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_entries",
                "format_tags:stream_tags",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.unavailable.swap(true, Ordering::Relaxed) {
                    log::warn!(
                        "{} not found, falling back to file and folder names",
                        self.program
                    );
                }
                return Err(ProbeError::ProgramNotFound(self.program.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        // Drain stdout off-thread so a large tag dump can't fill the pipe and stall the child
        let stdout = child.stdout.take();
        let reader = thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buf)?;
            }
            Ok(buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                return Err(ProbeError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = reader
            .join()
            .map_err(|_| std::io::Error::other("probe reader thread panicked"))??;

        if !status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(output)
    }
}

/// ffprobe `-print_format json` output (partial — we only need tags).
#[derive(Debug, Deserialize, Default)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeSection>,
    #[serde(default)]
    streams: Vec<ProbeSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeSection {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Extract artist/title/album from probe JSON. Container tags win over stream
/// tags (Ogg keeps its comments on the stream); keys are matched case-insensitively.
pub fn parse_probe_output(json: &[u8]) -> Result<PartialTags, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(json)?;

    let sections = output.format.into_iter().chain(output.streams);
    let mut tags = PartialTags::default();
    for section in sections {
        let lowered: HashMap<String, String> = section
            .tags
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        tags.merge_missing(PartialTags::new(
            lowered.get("artist").cloned(),
            lowered.get("title").cloned(),
            lowered.get("album").cloned(),
        ));
        if tags.is_complete() {
            break;
        }
    }
    Ok(tags)
}

/// Read embedded tags in-process (primary tag, then whichever tag comes first).
pub fn read_embedded_tags(path: &Path) -> Result<PartialTags, ProbeError> {
    let tagged_file = lofty::read_from_path(path)?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .ok_or(ProbeError::NoTags)?;

    Ok(PartialTags::new(
        tag.artist().map(|s| s.to_string()),
        tag.title().map(|s| s.to_string()),
        tag.album().map(|s| s.to_string()),
    ))
}

/// Metadata derived from the path alone: artist from the parent folder name,
/// title from the file name without extension.
pub fn path_metadata(path: &Path) -> Metadata {
    let artist = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string());
    let title = path.file_stem().map(|s| s.to_string_lossy().to_string());

    Metadata {
        artist: non_blank(artist).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        title: non_blank(title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        album: String::new(),
    }
}

/// One place metadata can come from, in the order the resolver should try it.
#[derive(Debug)]
pub enum MetadataSource {
    /// Tags read in-process with lofty.
    EmbeddedTags,
    /// Tags reported by an external probe program.
    ExternalProbe(ExternalProbe),
    /// Folder and file names. Always succeeds, so it terminates every chain.
    PathHeuristic,
}

impl MetadataSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmbeddedTags => "tags",
            Self::ExternalProbe(_) => "probe",
            Self::PathHeuristic => "path",
        }
    }

    pub fn read(&self, path: &Path) -> Result<PartialTags, ProbeError> {
        match self {
            Self::EmbeddedTags => read_embedded_tags(path),
            Self::ExternalProbe(probe) => probe.read(path),
            Self::PathHeuristic => {
                let m = path_metadata(path);
                Ok(PartialTags::new(Some(m.artist), Some(m.title), None))
            }
        }
    }
}

/// Resolves metadata field by field through an ordered chain of sources.
#[derive(Debug)]
pub struct MetadataResolver {
    sources: Vec<MetadataSource>,
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new(vec![MetadataSource::ExternalProbe(ExternalProbe::new(
            "ffprobe",
            Duration::from_secs(10),
        ))])
    }
}

impl MetadataResolver {
    /// Build a resolver from `sources` in priority order. `PathHeuristic` is
    /// appended if the chain doesn't already end with it; anything listed after
    /// it would never be consulted and is dropped.
    pub fn new(sources: Vec<MetadataSource>) -> Self {
        let mut chain = Vec::with_capacity(sources.len() + 1);
        for source in sources {
            let terminal = matches!(source, MetadataSource::PathHeuristic);
            chain.push(source);
            if terminal {
                break;
            }
        }
        if !matches!(chain.last(), Some(MetadataSource::PathHeuristic)) {
            chain.push(MetadataSource::PathHeuristic);
        }
        Self { sources: chain }
    }

    /// Resolver that only looks at file and folder names.
    pub fn path_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve metadata for `path`. Never fails: each field comes from the first
    /// source that yields a non-blank value, falling back to the path.
    pub fn resolve(&self, path: &Path) -> Metadata {
        let mut tags = PartialTags::default();
        for source in &self.sources {
            match source.read(path) {
                Ok(found) => tags.merge_missing(found),
                Err(e) => log::debug!("{} source failed for {}: {}", source.name(), path.display(), e),
            }
            if tags.is_complete() {
                break;
            }
        }

        // The chain ends with PathHeuristic, so artist and title are filled by now
        Metadata {
            artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            title: tags.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            album: tags.album.unwrap_or_default(),
        }
    }
}
