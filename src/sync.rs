#![forbid(unsafe_code)]

//! Refreshes the catalog cache from the channel.
//!
//! Long-form uploads come from a single flat-playlist dump. Shorts listings
//! lack durations, so their ids are listed first and each one is fetched in
//! detail through [`fanout::fetch_details`].

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CatalogCache, RefreshPolicy};
use crate::catalog::CatalogRow;
use crate::fanout::{self, DEFAULT_MAX_WORKERS};
use crate::ytdlp::{CatalogKind, MetadataSource, build_channel_list_url};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub channel_url: String,
    pub policy: RefreshPolicy,
    pub max_workers: usize,
    /// Only the first `n` shorts are fetched in detail when set.
    pub shorts_limit: Option<usize>,
}

impl SyncOptions {
    pub fn new(channel_url: impl Into<String>) -> Self {
        Self {
            channel_url: channel_url.into(),
            policy: RefreshPolicy::IfMissing,
            max_workers: DEFAULT_MAX_WORKERS,
            shorts_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Cache reused without contacting the channel.
    Cached,
    Fetched { path: PathBuf, rows: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub videos: SyncOutcome,
    pub shorts: SyncOutcome,
}

/// Brings both catalogs up to date according to `options.policy`.
///
/// A failure on one catalog is logged and reported in the summary; it never
/// prevents the other one from being fetched.
pub async fn refresh_catalogs(
    cache: &CatalogCache,
    source: Arc<dyn MetadataSource>,
    options: &SyncOptions,
) -> SyncSummary {
    let mut outcomes = Vec::with_capacity(CatalogKind::ALL.len());
    for kind in CatalogKind::ALL {
        let outcome = if cache.needs_refresh(kind, options.policy) {
            let list_url = build_channel_list_url(&options.channel_url, kind);
            info!("Fetching metadata for {} ...", list_url);
            match fetch_rows(kind, source.clone(), &list_url, options)
                .await
                .and_then(|rows| {
                    let path = cache.store(kind, &rows)?;
                    Ok((path, rows.len()))
                }) {
                Ok((path, rows)) => {
                    info!("Saved {} {} to {}", rows, kind.label(), path.display());
                    SyncOutcome::Fetched { path, rows }
                }
                Err(err) => {
                    warn!("Failed to fetch metadata for {}: {err:#}", list_url);
                    SyncOutcome::Failed(format!("{err:#}"))
                }
            }
        } else {
            info!(
                "Using cached {} metadata from {}",
                kind.label(),
                cache.path(kind).display()
            );
            SyncOutcome::Cached
        };
        outcomes.push(outcome);
    }

    let shorts = outcomes.pop().unwrap_or(SyncOutcome::Cached);
    let videos = outcomes.pop().unwrap_or(SyncOutcome::Cached);
    SyncSummary { videos, shorts }
}

async fn fetch_rows(
    kind: CatalogKind,
    source: Arc<dyn MetadataSource>,
    list_url: &str,
    options: &SyncOptions,
) -> Result<Vec<CatalogRow>> {
    match kind {
        CatalogKind::Videos => {
            let url = list_url.to_owned();
            tokio::task::spawn_blocking(move || source.list_entries(&url))
                .await
                .context("flat-playlist task panicked")?
        }
        CatalogKind::Shorts => {
            let url = list_url.to_owned();
            let lister = source.clone();
            let mut ids = tokio::task::spawn_blocking(move || lister.list_ids(&url))
                .await
                .context("id listing task panicked")??;
            if let Some(limit) = options.shorts_limit {
                ids.truncate(limit);
            }
            let requested = ids.len();
            info!("Found {} shorts, fetching details", requested);
            let report = fanout::fetch_details(source, ids, options.max_workers).await;
            // An empty result after a non-empty listing is missing data, not
            // an empty catalog, and must not be cached.
            if requested > 0 && report.rows.is_empty() {
                bail!("all {requested} detailed fetches failed");
            }
            Ok(report.rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeSource {
        fail_videos: bool,
        fail_details: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MetadataSource for FakeSource {
        fn list_entries(&self, list_url: &str) -> Result<Vec<CatalogRow>> {
            self.record(format!("entries {list_url}"));
            if self.fail_videos {
                bail!("HTTP Error 429: Too Many Requests");
            }
            Ok(vec![CatalogRow {
                id: "v1".into(),
                duration: "120".into(),
                upload_date: "20240101".into(),
                url: "https://www.youtube.com/watch?v=v1".into(),
                ..CatalogRow::default()
            }])
        }

        fn list_ids(&self, list_url: &str) -> Result<Vec<String>> {
            self.record(format!("ids {list_url}"));
            Ok(vec!["s1".into(), "s2".into(), "s3".into()])
        }

        fn video_details(&self, video_id: &str) -> Result<CatalogRow> {
            self.record(format!("details {video_id}"));
            if self.fail_details || video_id == "s2" {
                bail!("private video");
            }
            Ok(CatalogRow {
                id: video_id.into(),
                duration: "0:45".into(),
                url: format!("https://www.youtube.com/shorts/{video_id}"),
                ..CatalogRow::default()
            })
        }
    }

    #[tokio::test]
    async fn fetches_missing_catalogs() {
        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        let source = Arc::new(FakeSource::default());
        let options = SyncOptions::new("https://www.youtube.com/@someone");

        let summary = refresh_catalogs(&cache, source.clone(), &options).await;

        assert!(matches!(summary.videos, SyncOutcome::Fetched { rows: 1, .. }));
        assert!(matches!(summary.shorts, SyncOutcome::Fetched { rows: 2, .. }));
        let records = cache.load_catalog().unwrap().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "v1");
        assert!(
            records[1..]
                .iter()
                .all(|record| record.duration_seconds == Some(45.0))
        );

        let calls = source.calls.lock().unwrap();
        assert!(calls.contains(&"entries https://www.youtube.com/@someone/videos".to_string()));
        assert!(calls.contains(&"ids https://www.youtube.com/@someone/shorts".to_string()));
    }

    #[tokio::test]
    async fn reuses_cache_unless_forced() {
        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        cache.store(CatalogKind::Videos, &[]).unwrap();
        cache.store(CatalogKind::Shorts, &[]).unwrap();

        let source = Arc::new(FakeSource::default());
        let mut options = SyncOptions::new("https://www.youtube.com/@someone");
        let summary = refresh_catalogs(&cache, source.clone(), &options).await;
        assert_eq!(summary.videos, SyncOutcome::Cached);
        assert_eq!(summary.shorts, SyncOutcome::Cached);
        assert!(source.calls.lock().unwrap().is_empty());

        options.policy = RefreshPolicy::Force;
        let summary = refresh_catalogs(&cache, source.clone(), &options).await;
        assert!(matches!(summary.videos, SyncOutcome::Fetched { .. }));
        assert!(matches!(summary.shorts, SyncOutcome::Fetched { .. }));
    }

    #[tokio::test]
    async fn one_failing_catalog_does_not_block_the_other() {
        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        let source = Arc::new(FakeSource {
            fail_videos: true,
            ..FakeSource::default()
        });
        let options = SyncOptions::new("https://www.youtube.com/@someone");

        let summary = refresh_catalogs(&cache, source, &options).await;

        let SyncOutcome::Failed(message) = &summary.videos else {
            panic!("expected failure, got {:?}", summary.videos);
        };
        assert!(message.contains("429"));
        assert!(!cache.is_fresh(CatalogKind::Videos));
        assert!(cache.is_fresh(CatalogKind::Shorts));
    }

    #[tokio::test]
    async fn shorts_limit_caps_detailed_fetches() {
        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        let source = Arc::new(FakeSource::default());
        let mut options = SyncOptions::new("https://www.youtube.com/@someone");
        options.shorts_limit = Some(1);

        let summary = refresh_catalogs(&cache, source.clone(), &options).await;

        assert!(matches!(summary.shorts, SyncOutcome::Fetched { rows: 1, .. }));
        let calls = source.calls.lock().unwrap();
        let details: Vec<_> = calls.iter().filter(|c| c.starts_with("details")).collect();
        assert_eq!(details, ["details s1"]);
    }

    #[tokio::test]
    async fn shorts_are_not_cached_when_every_detail_fetch_fails() {
        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        let source = Arc::new(FakeSource {
            fail_videos: true,
            fail_details: true,
            ..FakeSource::default()
        });
        let options = SyncOptions::new("https://www.youtube.com/@someone");

        let summary = refresh_catalogs(&cache, source.clone(), &options).await;

        let SyncOutcome::Failed(message) = &summary.shorts else {
            panic!("expected failure, got {:?}", summary.shorts);
        };
        assert!(message.contains("all 3 detailed fetches failed"));
        assert!(!cache.is_fresh(CatalogKind::Shorts));
        assert!(cache.load_catalog().unwrap().is_none());

        // The next run tries again instead of trusting an empty file.
        let summary = refresh_catalogs(&cache, source, &options).await;
        assert!(matches!(summary.shorts, SyncOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn empty_shorts_listing_is_a_valid_empty_catalog() {
        struct NoShorts;

        impl MetadataSource for NoShorts {
            fn list_entries(&self, _list_url: &str) -> Result<Vec<CatalogRow>> {
                Ok(Vec::new())
            }

            fn list_ids(&self, _list_url: &str) -> Result<Vec<String>> {
                Ok(Vec::new())
            }

            fn video_details(&self, video_id: &str) -> Result<CatalogRow> {
                bail!("unexpected details call for {video_id}")
            }
        }

        let dir = tempdir().unwrap();
        let cache = CatalogCache::new(dir.path());
        let options = SyncOptions::new("https://www.youtube.com/@someone");

        let summary = refresh_catalogs(&cache, Arc::new(NoShorts), &options).await;

        assert!(matches!(summary.shorts, SyncOutcome::Fetched { rows: 0, .. }));
        assert!(cache.is_fresh(CatalogKind::Shorts));
    }
}
