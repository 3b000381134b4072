use crate::queries::Query;
use crate::scanner::metadata::{Metadata, MetadataResolver};
use crate::scanner::{self, AudioFile, ScanError};
use crate::similarity;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::borrow::Borrow;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Minimum similarity scores (0-100) a file must reach to match a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub artist: u8,
    pub song: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            artist: 80,
            song: 50,
        }
    }
}

/// First stage: does the file's artist resemble the query's artist closely enough?
#[derive(Debug, Clone, Copy)]
pub struct ArtistGate {
    threshold: f64,
}

impl ArtistGate {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: f64::from(threshold),
        }
    }

    /// The artist score if it clears the threshold.
    pub fn admit(&self, metadata: &Metadata, query: &Query) -> Option<f64> {
        let score = similarity::score(&metadata.artist, &query.artist);
        (score >= self.threshold).then_some(score)
    }
}

/// Second stage: does the file's title resemble the query's song closely enough?
#[derive(Debug, Clone, Copy)]
pub struct TitleGate {
    threshold: f64,
}

impl TitleGate {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: f64::from(threshold),
        }
    }

    /// The song score if it clears the threshold.
    pub fn admit(&self, metadata: &Metadata, query: &Query) -> Option<f64> {
        let score = similarity::score(&metadata.title, &query.song);
        (score >= self.threshold).then_some(score)
    }
}

/// A library file together with its resolved metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub file: AudioFile,
    pub metadata: Metadata,
}

/// A file that cleared both gates for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub file: AudioFile,
    pub metadata: Metadata,
    pub artist_score: f64,
    pub song_score: f64,
}

impl Candidate {
    pub fn total(&self) -> f64 {
        self.artist_score + self.song_score
    }
}

/// The accepted candidate for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub query: Query,
    pub candidate: Candidate,
}

impl Match {
    pub fn path(&self) -> &Path {
        &self.candidate.file.path
    }

    pub fn artist(&self) -> &str {
        &self.candidate.metadata.artist
    }

    pub fn title(&self) -> &str {
        &self.candidate.metadata.title
    }
}

/// Outcome of running every query: matches and misses, both in query order.
#[derive(Debug, Default)]
pub struct MatchReport {
    pub matches: Vec<Match>,
    pub missing: Vec<Query>,
}

/// Score `entries` against `query` and return the best candidate, if any.
///
/// The artist gate runs first; entries that fail it are dropped without scoring
/// the title. Among accepted candidates the highest `artist + song` total wins,
/// and on a tie the one encountered first is kept.
pub fn evaluate<E>(
    query: &Query,
    entries: impl IntoIterator<Item = E>,
    thresholds: Thresholds,
) -> Option<Candidate>
where
    E: Borrow<LibraryEntry>,
{
    let artist_gate = ArtistGate::new(thresholds.artist);
    let title_gate = TitleGate::new(thresholds.song);

    let accepted = entries.into_iter().filter_map(|entry| {
        let entry = entry.borrow();
        let artist_score = artist_gate.admit(&entry.metadata, query)?;
        let song_score = title_gate.admit(&entry.metadata, query)?;
        Some(Candidate {
            file: entry.file.clone(),
            metadata: entry.metadata.clone(),
            artist_score,
            song_score,
        })
    });

    select_best(accepted)
}

/// Highest total wins; ties go to the earliest candidate.
pub fn select_best(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        log::trace!(
            "  candidate {} (artist {:.2}, song {:.2})",
            candidate.file.path.display(),
            candidate.artist_score,
            candidate.song_score
        );
        let better = best.as_ref().is_none_or(|b| candidate.total() > b.total());
        if better {
            best = Some(candidate);
        }
    }
    best
}

/// Find the best file for `query` with a fresh scan of `root`, resolving
/// metadata for every file as it is encountered.
pub fn find_best(
    query: &Query,
    root: &Path,
    thresholds: Thresholds,
    resolver: &MetadataResolver,
) -> Result<Option<Match>, ScanError> {
    let entries = scanner::scan(root)?.map(|file| {
        let metadata = resolver.resolve(&file.path);
        LibraryEntry { file, metadata }
    });

    Ok(evaluate(query, entries, thresholds).map(|candidate| Match {
        query: query.clone(),
        candidate,
    }))
}

/// A library scanned once with metadata resolved up front, reused across queries.
///
/// Entries keep scan order, so matching against a `Library` picks the same file
/// as `find_best` would.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    entries: Vec<LibraryEntry>,
}

impl Library {
    /// Scan `root` and resolve metadata for every file on a pool of `workers` threads.
    pub fn load(root: &Path, resolver: &MetadataResolver, workers: usize) -> Result<Self, LibraryError> {
        let files: Vec<AudioFile> = scanner::scan(root)?.collect();
        log::info!("Found {} audio files under {}", files.len(), root.display());

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({per_sec}) ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Reading metadata...");

        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;

        // par_iter + collect keeps the input order
        let entries: Vec<LibraryEntry> = pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    let metadata = resolver.resolve(&file.path);
                    pb.inc(1);
                    LibraryEntry { file, metadata }
                })
                .collect()
        });

        pb.finish_with_message("Metadata ready");

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<LibraryEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_best(&self, query: &Query, thresholds: Thresholds) -> Option<Match> {
        evaluate(query, &self.entries, thresholds).map(|candidate| Match {
            query: query.clone(),
            candidate,
        })
    }
}

/// Run every query against `library` in order.
pub fn match_all(library: &Library, queries: &[Query], thresholds: Thresholds) -> MatchReport {
    let mut report = MatchReport::default();

    for query in queries {
        match library.find_best(query, thresholds) {
            Some(m) => {
                log::info!(
                    "Matched \"{}\" by {} => {} (artist {:.2}, song {:.2})",
                    query.song,
                    query.artist,
                    m.path().display(),
                    m.candidate.artist_score,
                    m.candidate.song_score
                );
                report.matches.push(m);
            }
            None => {
                log::info!("No match for \"{}\" by {}", query.song, query.artist);
                report.missing.push(query.clone());
            }
        }
    }

    report
}
