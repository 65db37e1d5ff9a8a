#![forbid(unsafe_code)]

//! Tells which videos in the local camera-roll dump are already on the
//! channel and could therefore be deleted.
//!
//! Steps: make sure the catalog cache exists (fetching it with yt-dlp when
//! missing), load it, probe every local video with ffprobe, then print one
//! table row per file. Nothing is ever deleted.

use anyhow::{Result, bail};
use camroll_tools::cache::{CatalogCache, RefreshPolicy};
use camroll_tools::config::{CleanerSettings, SettingsOverrides, resolve_settings};
use camroll_tools::logging;
use camroll_tools::matcher::match_local_file;
use camroll_tools::probe::{DurationProbe, Ffprobe};
use camroll_tools::process::ensure_program_available;
use camroll_tools::report::render_report;
use camroll_tools::scan::scan_local_videos;
use camroll_tools::sync::{SyncOptions, refresh_catalogs};
use camroll_tools::ytdlp::{CatalogKind, MetadataSource, YtDlp};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
struct CleanerArgs {
    overrides: SettingsOverrides,
    refresh: bool,
}

impl CleanerArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(env::args().skip(1))
    }

    #[cfg(test)]
    fn from_slice(values: &[&str]) -> Result<Self> {
        Self::from_iter(values.iter().map(|value| value.to_string()))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut overrides = SettingsOverrides::default();
        let mut refresh = false;
        let mut args = iter.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };
            let mut value = |name: &str| -> Result<String> {
                match inline.clone().or_else(|| args.next()) {
                    Some(value) => Ok(value),
                    None => bail!("{name} requires a value"),
                }
            };

            match flag.as_str() {
                "--scan-dir" => overrides.scan_dir = Some(PathBuf::from(value("--scan-dir")?)),
                "--cache-dir" => overrides.cache_dir = Some(PathBuf::from(value("--cache-dir")?)),
                "--env-file" => overrides.env_path = Some(PathBuf::from(value("--env-file")?)),
                "--channel-url" => overrides.channel_url = Some(value("--channel-url")?),
                "--tolerance" => {
                    let raw = value("--tolerance")?;
                    let tolerance = raw
                        .parse::<f64>()
                        .ok()
                        .filter(|tolerance| tolerance.is_finite() && *tolerance >= 0.0);
                    match tolerance {
                        Some(tolerance) => overrides.tolerance = Some(tolerance),
                        None => bail!("invalid --tolerance value: {raw}"),
                    }
                }
                "--refresh" if inline.is_none() => refresh = true,
                _ => bail!(
                    "unknown argument: {arg}\nUsage: camera_roll_cleaner [--scan-dir <path>] [--cache-dir <path>] [--channel-url <url>] [--tolerance <seconds>] [--env-file <path>] [--refresh]"
                ),
            }
        }

        Ok(Self { overrides, refresh })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let CleanerArgs { overrides, refresh } = CleanerArgs::parse()?;
    let settings = resolve_settings(overrides)?;
    let policy = if refresh {
        RefreshPolicy::Force
    } else {
        RefreshPolicy::IfMissing
    };

    let cache = CatalogCache::new(&settings.cache_dir);
    let ytdlp = YtDlp::default().with_cookies(settings.cookies.clone());
    if needs_fetch(&cache, policy) {
        ensure_program_available(ytdlp.program())?;
    }
    let source: Arc<dyn MetadataSource> = Arc::new(ytdlp);

    let ffprobe = Ffprobe::default();
    ensure_program_available(ffprobe.program())?;

    let stdout = io::stdout();
    run(&settings, &cache, source, &ffprobe, policy, &mut stdout.lock()).await
}

/// Whether the refresh step will need to talk to yt-dlp at all.
fn needs_fetch(cache: &CatalogCache, policy: RefreshPolicy) -> bool {
    CatalogKind::ALL
        .into_iter()
        .any(|kind| cache.needs_refresh(kind, policy))
}

async fn run(
    settings: &CleanerSettings,
    cache: &CatalogCache,
    source: Arc<dyn MetadataSource>,
    probe: &dyn DurationProbe,
    policy: RefreshPolicy,
    out: &mut impl Write,
) -> Result<()> {
    let mut options = SyncOptions::new(settings.channel_url.clone());
    options.policy = policy;
    options.max_workers = settings.max_workers;
    options.shorts_limit = settings.shorts_limit;
    refresh_catalogs(cache, source, &options).await;

    let Some(catalog) = cache.load_catalog()? else {
        bail!(
            "no channel metadata found in {}; run fetch_catalog (or check the yt-dlp errors above) before scanning",
            cache.dir().display()
        );
    };
    if catalog.is_empty() {
        warn!("channel catalog is empty; nothing can be matched");
    }

    let local_videos = scan_local_videos(&settings.scan_dir, probe)?;
    let rows: Vec<_> = local_videos
        .into_iter()
        .map(|file| {
            let result = match_local_file(&file, &catalog, settings.tolerance);
            (file, result)
        })
        .collect();

    render_report(out, &rows)?;
    Ok(())
}
