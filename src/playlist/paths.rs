use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;

/// How a matched file's path is written into the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Relative to the library root; files outside the root stay absolute.
    #[default]
    Relative,
    /// The file's full path, unchanged.
    Absolute,
}

/// Render `file` as a playlist entry path.
///
/// In `Relative` mode the root prefix is matched case-insensitively and removed
/// together with any leading separators. A file that doesn't live under the
/// root is returned unchanged.
pub fn resolve(file: &Path, source_root: &Path, mode: PathMode) -> String {
    let full = file.to_string_lossy();
    match mode {
        PathMode::Absolute => full.into_owned(),
        PathMode::Relative => {
            let root = source_root.to_string_lossy();
            match strip_prefix_ignore_case(&full, &root) {
                Some(rest) => rest.trim_start_matches(['/', '\\']).to_string(),
                None => full.into_owned(),
            }
        }
    }
}

/// `text` with `prefix` removed, comparing case-insensitively.
///
/// Stricter than a plain string prefix on purpose: the prefix must end on a
/// path component boundary, so `/music` doesn't claim `/musicals`.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }

    let mut rest = text.char_indices();
    let mut end = 0;
    for p in prefix.chars() {
        let (i, t) = rest.next()?;
        if !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
        end = i + t.len_utf8();
    }

    let remainder = &text[end..];
    let on_boundary = remainder.is_empty()
        || remainder.starts_with(['/', '\\'])
        || prefix.ends_with(['/', '\\']);
    on_boundary.then_some(remainder)
}
