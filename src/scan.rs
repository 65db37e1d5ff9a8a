#![forbid(unsafe_code)]

//! Lists the local camera-roll dump and probes each video's duration.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::matcher::LocalVideoFile;
use crate::probe::DurationProbe;

/// Extensions (lowercase, without the dot) treated as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "mkv", "webm"];

/// Case-insensitive check on the file name suffix.
pub fn is_video_file(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && VIDEO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
}

/// Scans `dir` (not recursively) for videos, sorted by file name.
///
/// A file whose duration cannot be probed is still returned, with
/// `duration_seconds` left empty.
pub fn scan_local_videos(dir: &Path, probe: &dyn DurationProbe) -> Result<Vec<LocalVideoFile>> {
    if !dir.is_dir() {
        bail!("scan directory {} does not exist", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !is_video_file(&filename) {
            debug!(file = %filename, "skipping non-video file");
            continue;
        }

        let path = entry.into_path();
        let duration_seconds = match probe.probe_duration(&path) {
            Ok(seconds) => Some(seconds),
            Err(err) => {
                warn!(file = %filename, "could not determine duration: {err:#}");
                None
            }
        };

        files.push(LocalVideoFile {
            filename,
            path,
            duration_seconds,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    struct FakeProbe {
        durations: HashMap<String, f64>,
    }

    impl DurationProbe for FakeProbe {
        fn probe_duration(&self, path: &Path) -> Result<f64> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.durations
                .get(&name)
                .copied()
                .ok_or_else(|| anyhow!("corrupt file {name}"))
        }
    }

    #[test]
    fn is_video_file_matches_known_extensions() {
        assert!(is_video_file("VID_20240101.mp4"));
        assert!(is_video_file("clip.MP4"));
        assert!(is_video_file("holiday.Mov"));
        assert!(!is_video_file("photo.jpg"));
        assert!(!is_video_file("mp4"));
        assert!(!is_video_file(".mp4"));
        assert!(!is_video_file("notes.mp4.txt"));
    }

    #[test]
    fn scan_filters_sorts_and_probes() {
        let dir = tempdir().unwrap();
        for name in ["b.mp4", "a.MOV", "broken.mp4", "photo.jpg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let probe = FakeProbe {
            durations: HashMap::from([("a.MOV".to_string(), 12.5), ("b.mp4".to_string(), 30.0)]),
        };
        let files = scan_local_videos(dir.path(), &probe).unwrap();

        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, ["a.MOV", "b.mp4", "broken.mp4"]);
        assert_eq!(files[0].duration_seconds, Some(12.5));
        assert_eq!(files[1].duration_seconds, Some(30.0));
        assert_eq!(files[2].duration_seconds, None);
        assert_eq!(files[1].path, dir.path().join("b.mp4"));
    }

    #[test]
    fn scan_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let probe = FakeProbe {
            durations: HashMap::new(),
        };
        let err = scan_local_videos(&dir.path().join("missing"), &probe).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
