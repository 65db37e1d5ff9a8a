#![forbid(unsafe_code)]

//! Re-fetches the channel catalogs (long-form videos and shorts) and rewrites
//! the tab-separated cache files the cleaner reads.

use anyhow::{Result, bail};
use camroll_tools::cache::{CatalogCache, RefreshPolicy};
use camroll_tools::config::{SettingsOverrides, resolve_settings};
use camroll_tools::logging;
use camroll_tools::process::ensure_program_available;
use camroll_tools::sync::{SyncOptions, SyncOutcome, SyncSummary, refresh_catalogs};
use camroll_tools::ytdlp::YtDlp;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn parse_args<I>(iter: I) -> Result<SettingsOverrides>
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = SettingsOverrides::default();
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
            "--cache-dir" => overrides.cache_dir = Some(PathBuf::from(value("--cache-dir")?)),
            "--env-file" => overrides.env_path = Some(PathBuf::from(value("--env-file")?)),
            "--channel-url" => overrides.channel_url = Some(value("--channel-url")?),
            _ => bail!(
                "unknown argument: {arg}\nUsage: fetch_catalog [--cache-dir <path>] [--channel-url <url>] [--env-file <path>]"
            ),
        }
    }

    Ok(overrides)
}

fn describe(label: &str, outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Cached => format!("{label}: cached"),
        SyncOutcome::Fetched { path, rows } => {
            format!("{label}: {rows} entries saved to {}", path.display())
        }
        SyncOutcome::Failed(err) => format!("{label}: failed ({err})"),
    }
}

fn all_failed(summary: &SyncSummary) -> bool {
    matches!(summary.videos, SyncOutcome::Failed(_))
        && matches!(summary.shorts, SyncOutcome::Failed(_))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let settings = resolve_settings(parse_args(env::args().skip(1))?)?;
    let ytdlp = YtDlp::default().with_cookies(settings.cookies.clone());
    ensure_program_available(ytdlp.program())?;

    println!("Channel: {}", settings.channel_url);
    println!("Cache directory: {}", settings.cache_dir.display());
    println!();

    let cache = CatalogCache::new(&settings.cache_dir);
    let mut options = SyncOptions::new(settings.channel_url.clone());
    options.policy = RefreshPolicy::Force;
    options.max_workers = settings.max_workers;
    options.shorts_limit = settings.shorts_limit;
    let summary = refresh_catalogs(&cache, Arc::new(ytdlp), &options).await;

    println!();
    println!("{}", describe("Videos", &summary.videos));
    println!("{}", describe("Shorts", &summary.shorts));

    if all_failed(&summary) {
        bail!("could not fetch any catalog for {}", settings.channel_url);
    }
    Ok(())
}
