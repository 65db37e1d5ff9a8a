#![forbid(unsafe_code)]

//! On-disk catalog cache: one tab-separated text file per [`CatalogKind`].

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{CatalogRow, RemoteVideoRecord, parse_catalog, render_catalog};
use crate::ytdlp::CatalogKind;

/// Whether an existing cache file may be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Fetch only when the cache file is absent. There is no expiry.
    IfMissing,
    /// Always fetch, replacing whatever is cached.
    Force,
}

#[derive(Debug, Clone)]
pub struct CatalogCache {
    dir: PathBuf,
}

impl CatalogCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: CatalogKind) -> PathBuf {
        let file_name = match kind {
            CatalogKind::Videos => "yt_videos_metadata.txt",
            CatalogKind::Shorts => "yt_shorts_metadata.txt",
        };
        self.dir.join(file_name)
    }

    pub fn is_fresh(&self, kind: CatalogKind) -> bool {
        self.path(kind).is_file()
    }

    pub fn needs_refresh(&self, kind: CatalogKind, policy: RefreshPolicy) -> bool {
        match policy {
            RefreshPolicy::Force => true,
            RefreshPolicy::IfMissing => !self.is_fresh(kind),
        }
    }

    /// Replaces the cache file for `kind` atomically.
    pub fn store(&self, kind: CatalogKind, rows: &[CatalogRow]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path(kind);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, render_catalog(rows))
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(path)
    }

    /// Loads one catalog, `None` when it was never fetched.
    pub fn load(&self, kind: CatalogKind) -> Result<Option<Vec<RemoteVideoRecord>>> {
        let path = self.path(kind);
        if !path.is_file() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(parse_catalog(&text)))
    }

    /// Videos followed by shorts. `None` when no catalog exists at all, which
    /// is different from an empty channel.
    pub fn load_catalog(&self) -> Result<Option<Vec<RemoteVideoRecord>>> {
        let mut found = false;
        let mut records = Vec::new();
        for kind in CatalogKind::ALL {
            if let Some(mut loaded) = self.load(kind)? {
                found = true;
                records.append(&mut loaded);
            }
        }
        Ok(found.then_some(records))
    }
}
