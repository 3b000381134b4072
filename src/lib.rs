pub mod config;
pub mod matcher;
pub mod playlist;
pub mod queries;
pub mod scanner;
pub mod similarity;

/// Audio file extensions we recognize as library entries
pub const SUPPORTED_EXTENSIONS: &[&str] = &["flac", "mp3", "wav", "aac", "ogg", "wma"];

/// Application name for XDG paths and the WPL generator tag
pub const APP_NAME: &str = "playmatch";
