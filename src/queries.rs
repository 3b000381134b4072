use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to open query list {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed query list: {0}")]
    Csv(#[from] csv::Error),
}

/// One song to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub song: String,
    pub artist: String,
}

/// Read the query list at `path`.
pub fn read_queries(path: &Path) -> Result<Vec<Query>, QueryError> {
    let file = std::fs::File::open(path).map_err(|source| QueryError::Open {
        path: path.display().to_string(),
        source,
    })?;
    parse_queries(file)
}

/// Parse a header-less CSV whose first two columns are song and artist.
///
/// Extra columns are ignored. Rows with a blank song or artist are skipped.
pub fn parse_queries<R: Read>(input: R) -> Result<Vec<Query>, QueryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut queries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let song = record.get(0).unwrap_or("");
        let artist = record.get(1).unwrap_or("");
        if song.is_empty() || artist.is_empty() {
            log::debug!("Skipping query row {}: missing song or artist", line + 1);
            continue;
        }
        queries.push(Query {
            song: song.to_string(),
            artist: artist.to_string(),
        });
    }

    log::info!("Loaded {} queries", queries.len());
    Ok(queries)
}
