use clap::ValueEnum;
use serde::Deserialize;

/// One line item of a playlist: what to show and where the file is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// `<Artist> - <Title>`
    pub display: String,
    /// Path as it should appear in the playlist (relative or absolute).
    pub path: String,
}

/// Turns an ordered list of entries into playlist file contents.
pub trait PlaylistEncoder {
    fn encode(&self, name: &str, entries: &[PlaylistEntry]) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistFormat {
    #[default]
    M3u,
    Pls,
    Wpl,
}

impl PlaylistFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::M3u => "m3u",
            Self::Pls => "pls",
            Self::Wpl => "wpl",
        }
    }

    pub fn encoder(&self) -> &'static dyn PlaylistEncoder {
        match self {
            Self::M3u => &M3u,
            Self::Pls => &Pls,
            Self::Wpl => &Wpl,
        }
    }

    pub fn encode(&self, name: &str, entries: &[PlaylistEntry]) -> String {
        self.encoder().encode(name, entries)
    }
}

/// Extended M3U.
pub struct M3u;

impl PlaylistEncoder for M3u {
    fn encode(&self, _name: &str, entries: &[PlaylistEntry]) -> String {
        let mut lines = vec!["#EXTM3U".to_string()];
        for entry in entries {
            lines.push(format!("#EXTINF:-1,{}", entry.display));
            lines.push(entry.path.clone());
        }
        join_lines(lines)
    }
}

/// PLS version 2.
pub struct Pls;

impl PlaylistEncoder for Pls {
    fn encode(&self, _name: &str, entries: &[PlaylistEntry]) -> String {
        let mut lines = vec!["[playlist]".to_string()];
        for (i, entry) in entries.iter().enumerate() {
            let n = i + 1;
            lines.push(format!("File{n}={}", entry.path));
            lines.push(format!("Title{n}={}", entry.display));
            lines.push(format!("Length{n}=-1"));
        }
        lines.push(format!("NumberOfEntries={}", entries.len()));
        lines.push("Version=2".to_string());
        join_lines(lines)
    }
}

/// Windows Media Player playlist (SMIL-based XML).
pub struct Wpl;

impl PlaylistEncoder for Wpl {
    fn encode(&self, name: &str, entries: &[PlaylistEntry]) -> String {
        let mut lines = vec![
            r#"<?wpl version="1.0"?>"#.to_string(),
            "<smil>".to_string(),
            "<head>".to_string(),
            format!(r#"<meta name="Generator" content="{}"/>"#, crate::APP_NAME),
            format!("<title>{}</title>", xml_escape(name)),
            "</head>".to_string(),
            "<body>".to_string(),
            "<seq>".to_string(),
        ];
        for entry in entries {
            lines.push(format!(r#"<media src="{}"/>"#, xml_escape(&entry.path)));
        }
        lines.extend(["</seq>", "</body>", "</smil>"].map(String::from));
        join_lines(lines)
    }
}

/// `\n`-terminated lines.
fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
