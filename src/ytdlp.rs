#![forbid(unsafe_code)]

//! yt-dlp backed metadata fetching.
//!
//! Two modes are used: a flat-playlist dump (fast, one JSON object per entry,
//! fields may be missing) and a detailed per-video dump (slow, complete).
//! Both end up as [`CatalogRow`]s ready to be written to the cache.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::catalog::CatalogRow;

/// The two catalogs kept per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Videos,
    Shorts,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::Videos, CatalogKind::Shorts];

    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Videos => "videos",
            CatalogKind::Shorts => "shorts",
        }
    }
}

/// Source of channel metadata. Implemented by [`YtDlp`]; tests use fakes.
pub trait MetadataSource: Send + Sync {
    /// Flat-playlist fetch returning every entry of a list.
    fn list_entries(&self, list_url: &str) -> Result<Vec<CatalogRow>>;

    /// Flat-playlist fetch returning only the ids of a list.
    fn list_ids(&self, list_url: &str) -> Result<Vec<String>>;

    /// Detailed fetch for one video.
    fn video_details(&self, video_id: &str) -> Result<CatalogRow>;
}

/// Watch URL for a single video id.
pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Normalizes a channel URL so we don't double-append `/videos` or `/shorts`.
pub fn build_channel_list_url(channel_url: &str, kind: CatalogKind) -> String {
    let (without_fragment, fragment) = match channel_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (channel_url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };

    let base = base.trim_end_matches('/');
    let base = base
        .strip_suffix("/videos")
        .or_else(|| base.strip_suffix("/shorts"))
        .unwrap_or(base);
    let mut result = format!("{base}/{}", kind.label());

    if let Some(query) = query {
        result.push('?');
        result.push_str(query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }

    result
}

/// yt-dlp reports durations as numbers, but some extractors only fill the
/// clock-style `duration_string`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(f64),
    Text(String),
}

/// Subset of yt-dlp's JSON dump that feeds the catalog. Every field is
/// optional because flat-playlist entries routinely omit most of them.
#[derive(Debug, Deserialize)]
struct EntryJson {
    id: Option<String>,
    title: Option<String>,
    upload_date: Option<String>,
    duration: Option<RawDuration>,
    duration_string: Option<String>,
    description: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl EntryJson {
    fn into_row(self) -> CatalogRow {
        let id = self.id.unwrap_or_default();
        let duration = match self.duration {
            Some(RawDuration::Seconds(seconds)) => seconds.to_string(),
            Some(RawDuration::Text(text)) => text,
            None => self.duration_string.unwrap_or_default(),
        };
        let url = self
            .webpage_url
            .or(self.url)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| if id.is_empty() { String::new() } else { video_url(&id) });

        CatalogRow {
            title: self.title.unwrap_or_default(),
            upload_date: self.upload_date.unwrap_or_default(),
            duration,
            description: self.description.unwrap_or_default(),
            url,
            id,
        }
    }
}

fn parse_entry(raw: &str) -> Result<CatalogRow> {
    let entry: EntryJson = serde_json::from_str(raw).context("deserializing yt-dlp JSON")?;
    Ok(entry.into_row())
}

/// Parses `--dump-json` output: one JSON object per line. Lines that fail to
/// parse are logged and skipped.
fn parse_entry_lines(stdout: &str) -> Vec<CatalogRow> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match parse_entry(line) {
            Ok(row) => Some(row),
            Err(err) => {
                warn!("skipping unreadable yt-dlp entry: {err:#}");
                None
            }
        })
        .collect()
}

/// Shells out to the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    cookies: Option<PathBuf>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::with_program("yt-dlp")
    }
}

impl YtDlp {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies: None,
        }
    }

    /// Passes `--cookies <path>` to every invocation when the file exists.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("--no-warnings").arg("--no-progress");
        if let Some(cookies) = self.cookies.as_deref().filter(|path| path.exists()) {
            command.arg("--cookies").arg(cookies);
        }
        command
    }

    fn run(&self, mut command: Command, target: &str) -> Result<String> {
        debug!(target_url = target, "running {:?}", command);
        let output = command
            .output()
            .with_context(|| format!("running {} for {}", self.program.display(), target))?;

        if !output.status.success() {
            bail!(
                "{} failed for {} (status {}): {}",
                self.program.display(),
                target,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8(output.stdout).context("parsing yt-dlp output as UTF-8")
    }
}

impl MetadataSource for YtDlp {
    fn list_entries(&self, list_url: &str) -> Result<Vec<CatalogRow>> {
        let mut command = self.command();
        command
            .arg("--flat-playlist")
            .arg("--dump-json")
            .arg("--ignore-errors")
            .arg(list_url);
        let stdout = self.run(command, list_url)?;
        Ok(parse_entry_lines(&stdout))
    }

    fn list_ids(&self, list_url: &str) -> Result<Vec<String>> {
        let mut command = self.command();
        command
            .arg("--flat-playlist")
            .arg("--get-id")
            .arg("--ignore-errors")
            .arg(list_url);
        let stdout = self.run(command, list_url)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn video_details(&self, video_id: &str) -> Result<CatalogRow> {
        let url = video_url(video_id);
        let mut command = self.command();
        command
            .arg("--dump-json")
            .arg("--skip-download")
            .arg("--no-playlist")
            .arg(&url);
        let stdout = self.run(command, &url)?;
        let mut row = parse_entry(stdout.trim())
            .with_context(|| format!("reading metadata for {video_id}"))?;
        if row.id.is_empty() {
            row.id = video_id.to_owned();
        }
        Ok(row)
    }
}
