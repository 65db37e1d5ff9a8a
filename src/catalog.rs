#![forbid(unsafe_code)]

//! Tab-separated catalog cache format and the normalizer that turns it into
//! [`RemoteVideoRecord`]s.
//!
//! Every line holds one published video with six fields in a fixed order:
//! `id`, `title`, `upload_date`, `duration`, `description`, `url`. The
//! duration column is raw text because different yt-dlp modes report it as
//! plain seconds (`125`, `125.4`) or as a clock string (`2:05`, `1:02:03`).

/// Number of tab-separated columns in a catalog line.
pub const FIELD_COUNT: usize = 6;

/// One video published on the channel, normalized from a catalog line.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVideoRecord {
    pub id: String,
    pub title: String,
    /// Passed through exactly as the scraper reported it (usually `YYYYMMDD`).
    pub upload_date: String,
    /// `None` when the raw duration could not be understood. Such records
    /// never match anything.
    pub duration_seconds: Option<f64>,
    pub description: String,
    pub url: String,
}

/// Raw catalog row as produced by a fetcher, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: String,
    pub title: String,
    pub upload_date: String,
    pub duration: String,
    pub description: String,
    pub url: String,
}

impl CatalogRow {
    /// Serializes the row as a single catalog line (without the newline).
    pub fn to_line(&self) -> String {
        let fields: [&String; FIELD_COUNT] = [
            &self.id,
            &self.title,
            &self.upload_date,
            &self.duration,
            &self.description,
            &self.url,
        ];
        fields
            .iter()
            .map(|value| sanitize_field(value))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Renders rows into the newline-terminated text stored in the cache.
pub fn render_catalog(rows: &[CatalogRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.to_line());
        out.push('\n');
    }
    out
}

/// Collapses newlines, tabs and whitespace runs into single spaces so a
/// field can never break the line/column layout.
pub fn sanitize_field(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a whole catalog file. Blank lines are skipped, everything else
/// yields exactly one record in file order.
pub fn parse_catalog(text: &str) -> Vec<RemoteVideoRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_catalog_line)
        .collect()
}

/// Parses a single catalog line.
///
/// Short lines are padded with empty fields and extra fields past the sixth
/// are ignored, so a damaged line still produces a record.
pub fn parse_catalog_line(line: &str) -> RemoteVideoRecord {
    // Tabs are delimiters: trimming them would shift an empty leading id.
    let line = line.trim_matches(|c: char| c != '\t' && c.is_whitespace());
    let mut fields = line.split('\t').take(FIELD_COUNT).map(str::trim);
    let mut next = || fields.next().unwrap_or_default().to_string();

    let id = next();
    let title = next();
    let upload_date = next();
    let duration = next();
    let description = next();
    let url = next();

    RemoteVideoRecord {
        id,
        title,
        upload_date,
        duration_seconds: parse_duration(&duration),
        description,
        url,
    }
}

/// Converts a raw duration into seconds.
///
/// Accepts a plain number of seconds or a `MM:SS` / `HH:MM:SS` clock string
/// whose components may be fractional. Anything else (including empty
/// strings, yt-dlp's `NA`, negative and non-finite values) is `None`.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if !raw.contains(':') {
        return parse_component(raw);
    }

    let parts = raw
        .split(':')
        .map(parse_component)
        .collect::<Option<Vec<f64>>>()?;

    match parts.as_slice() {
        [minutes, seconds] => Some(minutes * 60.0 + seconds),
        [hours, minutes, seconds] => Some(hours * 3600.0 + minutes * 60.0 + seconds),
        _ => None,
    }
}

fn parse_component(value: &str) -> Option<f64> {
    let value = value.trim();
    // Rust's float parser accepts "inf", "NaN" and signs; none of them are
    // durations.
    if value.is_empty() || !value.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
}
