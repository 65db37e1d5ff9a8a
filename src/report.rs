#![forbid(unsafe_code)]

//! Plain-text table printed by the cleaner.

use std::io::{self, Write};

use crate::matcher::{LocalVideoFile, MatchResult};

const FILENAME_WIDTH: usize = 40;
const VERDICT_HEADER: &str = "Can Delete";
const RULE_WIDTH: usize = 80;

/// Writes one row per local file, in the order given.
pub fn render_report<W: Write>(
    out: &mut W,
    rows: &[(LocalVideoFile, MatchResult)],
) -> io::Result<()> {
    writeln!(
        out,
        "{:<FILENAME_WIDTH$} | {VERDICT_HEADER} | Reason",
        "Filename"
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for (file, result) in rows {
        let verdict = if result.deletable { "Y" } else { "N" };
        writeln!(
            out,
            "{:<FILENAME_WIDTH$} | {:<width$} | {}",
            file.filename,
            verdict,
            result.reason,
            width = VERDICT_HEADER.len()
        )?;
    }
    Ok(())
}
