//! Output helpers shared by the lenses and the command line

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default width of note text in list tables
pub const DEFAULT_NOTE_PREVIEW_LEN: usize = 48;

/// Output format for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Rounded table (default)
    #[default]
    Table,
    Markdown,
    /// One JSON array on a single line
    Json,
    JsonPretty,
    /// One JSON object per line
    JsonLine,
    /// Pipe-separated values with a header line
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "json-line", "psv"]
    }

    /// Render rows in this format
    ///
    /// JSON variants use the rows' `Serialize` form, the others their `Tabled` form.
    #[cfg(feature = "display")]
    pub fn render<T>(&self, rows: &[T]) -> anyhow::Result<String>
    where
        T: Serialize + tabled::Tabled,
    {
        use tabled::settings::Style;
        use tabled::Table;

        let out = match self {
            Self::Table => Table::new(rows).with(Style::rounded()).to_string(),
            Self::Markdown => Table::new(rows).with(Style::markdown()).to_string(),
            Self::Json => serde_json::to_string(rows)?,
            Self::JsonPretty => serde_json::to_string_pretty(rows)?,
            Self::JsonLine => rows
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join("\n"),
            Self::Psv => {
                let mut lines = vec![T::headers().join("|")];
                lines.extend(rows.iter().map(|row| row.fields().join("|")));
                lines.join("\n")
            }
        };
        Ok(out)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::JsonLine => "json-line",
            Self::Psv => "psv",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonl" => Ok(Self::JsonLine),
            "psv" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Shorten text to `max_len` characters, ending in "..." when cut
///
/// Line breaks are folded to spaces so note text stays on one table row.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_len {
        flat
    } else {
        let kept: String = flat.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// SQLite timestamp to minute precision, `-` when missing
pub fn short_timestamp(ts: Option<&str>) -> String {
    match ts {
        Some(ts) if !ts.is_empty() => ts.chars().take(16).collect(),
        _ => "-".to_string(),
    }
}
