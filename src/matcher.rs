#![forbid(unsafe_code)]

//! Duration based matching between local camera-roll files and the channel
//! catalog. Everything here is pure so it can be tested without touching the
//! filesystem or spawning processes.

use std::fmt;
use std::path::PathBuf;

use crate::catalog::RemoteVideoRecord;

/// Maximum difference, in seconds, for two durations to count as the same
/// video.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// A video file found in the local scan directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVideoFile {
    pub filename: String,
    pub path: PathBuf,
    /// `None` when probing failed; such files are never reported as deletable.
    pub duration_seconds: Option<f64>,
}

/// A catalog entry whose duration matched a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvidence {
    pub url: String,
    pub upload_date: String,
}

impl fmt::Display for MatchEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uploaded {})", self.url, self.upload_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    /// Every matching catalog entry, in catalog order.
    Matched(Vec<MatchEvidence>),
    NoMatch,
    InvalidLocalDuration,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::Matched(evidence) => {
                let joined = evidence
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Matched by duration: {joined}")
            }
            MatchReason::NoMatch => f.write_str("No duration match"),
            MatchReason::InvalidLocalDuration => f.write_str("invalid local duration"),
        }
    }
}

/// Outcome of matching one local file against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub deletable: bool,
    pub reason: MatchReason,
}

impl MatchResult {
    fn from_reason(reason: MatchReason) -> Self {
        Self {
            deletable: matches!(reason, MatchReason::Matched(_)),
            reason,
        }
    }
}

/// Inclusive, symmetric tolerance check.
pub fn durations_match(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Decides whether `local` is already on the channel.
///
/// All matching entries are reported; several uploads with the same length
/// are surfaced rather than picking one.
pub fn match_local_file(
    local: &LocalVideoFile,
    catalog: &[RemoteVideoRecord],
    tolerance: f64,
) -> MatchResult {
    let Some(local_duration) = local.duration_seconds.filter(|value| value.is_finite()) else {
        return MatchResult::from_reason(MatchReason::InvalidLocalDuration);
    };

    let evidence: Vec<MatchEvidence> = catalog
        .iter()
        .filter(|remote| {
            remote
                .duration_seconds
                .is_some_and(|remote_duration| {
                    durations_match(local_duration, remote_duration, tolerance)
                })
        })
        .map(|remote| MatchEvidence {
            url: remote.url.clone(),
            upload_date: remote.upload_date.clone(),
        })
        .collect();

    if evidence.is_empty() {
        MatchResult::from_reason(MatchReason::NoMatch)
    } else {
        MatchResult::from_reason(MatchReason::Matched(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(duration: Option<f64>) -> LocalVideoFile {
        LocalVideoFile {
            filename: "VID_0001.mp4".into(),
            path: PathBuf::from("temp/VID_0001.mp4"),
            duration_seconds: duration,
        }
    }

    fn remote(id: &str, duration: Option<f64>) -> RemoteVideoRecord {
        RemoteVideoRecord {
            id: id.into(),
            title: format!("title {id}"),
            upload_date: format!("2024010{}", id.len()),
            duration_seconds: duration,
            description: String::new(),
            url: format!("https://www.youtube.com/watch?v={id}"),
        }
    }

    #[test]
    fn matches_within_tolerance_only() {
        let catalog = vec![remote("a", Some(125.0)), remote("bb", Some(130.0))];
        let result = match_local_file(&local(Some(125.3)), &catalog, DEFAULT_TOLERANCE);
        assert!(result.deletable);
        assert_eq!(
            result.reason.to_string(),
            "Matched by duration: https://www.youtube.com/watch?v=a (uploaded 20240101)"
        );
    }

    #[test]
    fn reports_every_match_in_catalog_order() {
        let catalog = vec![
            remote("zz", Some(60.2)),
            remote("a", Some(90.0)),
            remote("bb", Some(59.8)),
        ];
        let result = match_local_file(&local(Some(60.0)), &catalog, DEFAULT_TOLERANCE);
        assert!(result.deletable);
        let MatchReason::Matched(evidence) = &result.reason else {
            panic!("expected a match, got {:?}", result.reason);
        };
        let urls: Vec<_> = evidence.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://www.youtube.com/watch?v=zz",
                "https://www.youtube.com/watch?v=bb"
            ]
        );
        assert_eq!(
            result.reason.to_string(),
            "Matched by duration: https://www.youtube.com/watch?v=zz (uploaded 20240102), \
             https://www.youtube.com/watch?v=bb (uploaded 20240102)"
        );
    }

    #[test]
    fn tolerance_is_inclusive() {
        let catalog = vec![remote("a", Some(10.0))];
        let result = match_local_file(&local(Some(10.5)), &catalog, 0.5);
        assert!(result.deletable);
        let result = match_local_file(&local(Some(10.75)), &catalog, 0.5);
        assert!(!result.deletable);
    }

    #[test]
    fn durations_match_is_symmetric() {
        for (a, b) in [(1.0, 1.4), (100.0, 99.5), (3.0, 4.0), (0.0, 0.0)] {
            assert_eq!(
                durations_match(a, b, DEFAULT_TOLERANCE),
                durations_match(b, a, DEFAULT_TOLERANCE)
            );
        }
    }

    #[test]
    fn unknown_local_duration_is_never_deletable() {
        let catalog = vec![remote("a", Some(0.0)), remote("b", None)];
        for duration in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            let result = match_local_file(&local(duration), &catalog, DEFAULT_TOLERANCE);
            assert!(!result.deletable);
            assert_eq!(result.reason, MatchReason::InvalidLocalDuration);
            assert_eq!(result.reason.to_string(), "invalid local duration");
        }

        let result = match_local_file(&local(None), &[], DEFAULT_TOLERANCE);
        assert_eq!(result.reason.to_string(), "invalid local duration");
    }

    #[test]
    fn empty_catalog_yields_no_match() {
        let result = match_local_file(&local(Some(12.0)), &[], DEFAULT_TOLERANCE);
        assert!(!result.deletable);
        assert_eq!(result.reason.to_string(), "No duration match");
    }

    #[test]
    fn unusable_remote_durations_are_skipped() {
        let catalog = vec![remote("a", None), remote("b", None)];
        let result = match_local_file(&local(Some(0.0)), &catalog, DEFAULT_TOLERANCE);
        assert!(!result.deletable);
        assert_eq!(result.reason, MatchReason::NoMatch);
    }

    #[test]
    fn matching_is_repeatable() {
        let catalog = vec![remote("a", Some(30.0)), remote("b", Some(30.4))];
        let first = match_local_file(&local(Some(30.1)), &catalog, DEFAULT_TOLERANCE);
        let second = match_local_file(&local(Some(30.1)), &catalog, DEFAULT_TOLERANCE);
        assert_eq!(first, second);
        assert_eq!(first.reason.to_string(), second.reason.to_string());
    }
}
