#![forbid(unsafe_code)]

//! Bounded fan-out for detailed per-video metadata fetches.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::catalog::CatalogRow;
use crate::ytdlp::MetadataSource;

/// Concurrency used when none is configured.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Aggregate of a fan-out run.
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Successfully fetched rows, in completion order.
    pub rows: Vec<CatalogRow>,
    /// Ids whose fetch failed.
    pub failed: Vec<String>,
}

/// Fetches details for every id with at most `max_workers` blocking calls in
/// flight. One failing id never stops the others.
pub async fn fetch_details(
    source: Arc<dyn MetadataSource>,
    ids: Vec<String>,
    max_workers: usize,
) -> FanoutReport {
    let total = ids.len();
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks = JoinSet::new();

    for video_id in ids {
        let source = source.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    let id = video_id.clone();
                    tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        info!(video_id = %id, "fetching metadata");
                        source.video_details(&id)
                    })
                    .await
                    .map_err(anyhow::Error::from)
                    .and_then(|result| result)
                }
                Err(err) => Err(anyhow::Error::from(err)),
            };
            (video_id, outcome)
        });
    }

    let mut report = FanoutReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((video_id, Ok(row))) => {
                report.rows.push(row);
                info!("[{}/{}] Finished: {}", report.rows.len(), total, video_id);
            }
            Ok((video_id, Err(err))) => {
                warn!(video_id = %video_id, "failed to fetch metadata: {err:#}");
                report.failed.push(video_id);
            }
            Err(err) => {
                warn!("metadata task aborted: {err}");
            }
        }
    }

    info!(
        "All tasks completed. {}/{} videos fetched successfully.",
        report.rows.len(),
        total
    );
    report
}
