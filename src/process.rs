#![forbid(unsafe_code)]

use anyhow::{Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs `<program> --version` to fail loudly when a dependency such as yt-dlp
/// or ffprobe is missing.
pub fn ensure_program_available(program: &Path) -> Result<()> {
    let status = Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!(
            "{} is installed but returned a failure status",
            program.display()
        ),
        Err(err) => bail!(
            "{} is not installed or not in PATH: {}",
            program.display(),
            err
        ),
    }
}
