#![forbid(unsafe_code)]

//! Media duration probing through `ffprobe`.

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Anything that can tell how long a media file is, in seconds.
pub trait DurationProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// Calls the `ffprobe` binary once per file.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: PathBuf,
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::with_program("ffprobe")
    }
}

impl Ffprobe {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl DurationProbe for Ffprobe {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .with_context(|| format!("running {} on {}", self.program.display(), path.display()))?;

        if !output.status.success() {
            bail!(
                "{} failed for {} (status {}): {}",
                self.program.display(),
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("reading duration of {}", path.display()))
    }
}

/// Extracts the duration from ffprobe's bare `<seconds>` output.
fn parse_probe_output(stdout: &str) -> Result<f64> {
    let value = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| anyhow!("ffprobe printed no duration"))?;
    let seconds: f64 = value
        .parse()
        .with_context(|| format!("unexpected ffprobe output {value:?}"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("ffprobe reported an invalid duration {value:?}");
    }
    Ok(seconds)
}
