use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playmatch::config::AppConfig;
use playmatch::matcher::{self, Library, MatchReport, Thresholds};
use playmatch::playlist::{self, PathMode, PlaylistFormat, WriteOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "playmatch", version, about = "Build playlists by fuzzy-matching a song list against a music library")]
struct Cli {
    /// Config file (defaults to ~/.config/playmatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a CSV of (song, artist) rows against the library and write a playlist
    Match {
        /// Header-less CSV: song in the first column, artist in the second
        queries: PathBuf,

        /// Music library root (defaults to config source_root)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory for the playlist and manifest (defaults to config dest_root)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Playlist name, used as the output file name
        #[arg(short, long)]
        name: Option<String>,

        /// Playlist format
        #[arg(short, long, value_enum)]
        format: Option<PlaylistFormat>,

        /// How file paths are written into the playlist
        #[arg(long, value_enum)]
        path_mode: Option<PathMode>,

        /// Minimum artist similarity (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        artist_threshold: Option<u8>,

        /// Minimum song title similarity (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        song_threshold: Option<u8>,

        /// Number of parallel metadata workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Dry run — report matches without writing any files
        #[arg(long)]
        dry_run: bool,
    },

    /// List every audio file in the library with its resolved metadata
    Scan {
        /// Music library root (defaults to config source_root)
        path: Option<PathBuf>,

        /// Number of parallel metadata workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,
    },

    /// Print the similarity score of two strings
    Score {
        /// Library-side value (e.g. a tag)
        a: String,
        /// Query-side value
        b: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Match {
            queries,
            source,
            dest,
            name,
            format,
            path_mode,
            artist_threshold,
            song_threshold,
            jobs,
            dry_run,
        } => {
            let source_root = resolve_source(source, &config)?;
            let thresholds = Thresholds {
                artist: artist_threshold.unwrap_or(config.thresholds().artist),
                song: song_threshold.unwrap_or(config.thresholds().song),
            };
            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };

            playmatch::scanner::check_root(&source_root)
                .context("Failed to scan music library")?;

            let queries = playmatch::queries::read_queries(&queries)
                .context("Failed to read query list")?;
            if queries.is_empty() {
                println!("No queries with both a song and an artist. Nothing to do.");
                return Ok(());
            }

            let resolver = config.metadata_resolver();
            log::info!("Metadata sources: {}", resolver.source_names().join(" -> "));
            let library = Library::load(&source_root, &resolver, workers)
                .context("Failed to scan music library")?;

            let report = matcher::match_all(&library, &queries, thresholds);
            print_report(&report, &source_root);

            if dry_run {
                println!();
                println!("(dry run — re-run without --dry-run to write the playlist)");
                return Ok(());
            }

            let dest_root = dest
                .or(config.dest_root.clone())
                .context("No output directory. Pass --dest or set dest_root in config.")?;
            let name = name.unwrap_or_else(|| config.playlist_name.clone());
            let opts = WriteOptions {
                output_dir: &dest_root,
                name: &name,
                format: format.unwrap_or(config.format),
                source_root: &source_root,
                path_mode: path_mode.unwrap_or(config.path_mode),
            };
            let written = playlist::write(&report.matches, &opts)
                .context("Failed to write playlist")?;

            println!();
            println!("Playlist: {}", written.playlist.display());
            println!("Manifest: {}", written.manifest.display());
        }

        Commands::Scan { path, jobs } => {
            let source_root = resolve_source(path, &config)?;
            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };
            let library = Library::load(&source_root, &config.metadata_resolver(), workers)
                .context("Failed to scan music library")?;

            if library.is_empty() {
                println!("No audio files under {}.", source_root.display());
                return Ok(());
            }

            println!("{:<30} {:<40} {}", "Artist", "Title", "Path");
            println!("{}", "-".repeat(100));
            for entry in library.entries() {
                println!(
                    "{:<30} {:<40} {}",
                    truncate(&entry.metadata.artist, 30),
                    truncate(&entry.metadata.title, 40),
                    playlist::paths::resolve(&entry.file.path, &source_root, PathMode::Relative),
                );
            }
            println!();
            println!("{} files", library.len());
        }

        Commands::Score { a, b } => {
            println!("{:.2}", playmatch::similarity::score(&a, &b));
        }
    }

    Ok(())
}

/// Library root: CLI > config source_root.
fn resolve_source(cli: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    match cli.or(config.source_root.clone()) {
        Some(root) => Ok(root),
        None => anyhow::bail!(
            "No music library given. Pass --source or set source_root in config."
        ),
    }
}

/// Print matched and missing queries.
fn print_report(report: &MatchReport, source_root: &Path) {
    let total = report.matches.len() + report.missing.len();
    println!("Matched {} of {} songs", report.matches.len(), total);
    println!();

    if !report.matches.is_empty() {
        println!(
            "{:<35} {:>6} {:>6}  {}",
            "Query", "Artist", "Song", "File"
        );
        println!("{}", "-".repeat(100));
        for m in &report.matches {
            let label = format!("{} - {}", m.query.artist, m.query.song);
            println!(
                "{:<35} {:>6.2} {:>6.2}  {}",
                truncate(&label, 35),
                m.candidate.artist_score,
                m.candidate.song_score,
                playlist::paths::resolve(m.path(), source_root, PathMode::Relative),
            );
        }
    }

    if !report.missing.is_empty() {
        println!();
        println!("Not found:");
        for q in &report.missing {
            println!("  {} - {}", q.artist, q.song);
        }
    }
}

/// Truncate long labels for table display.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
