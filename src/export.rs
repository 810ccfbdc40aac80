//! JSON and CSV export of result snapshots.

use crate::model::{ResultSnapshot, ResultSummary};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 7] = ["identity", "average", "min", "max", "count", "errors", "last"];

/// Write a snapshot as pretty JSON.
pub fn export_json(path: &Path, snapshot: &ResultSnapshot) -> Result<()> {
    let body = serde_json::to_string_pretty(snapshot).context("serialize snapshot")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

/// Write result rows as CSV, one line per identity in store order.
pub fn export_csv(path: &Path, rows: &[ResultSummary]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(CSV_HEADER).context("write CSV header")?;
    for r in rows {
        writer
            .write_record([
                r.identity.clone(),
                format!("{:.6}", r.average),
                format!("{:.6}", r.min),
                format!("{:.6}", r.max),
                r.count.to_string(),
                r.errors.to_string(),
                r.last.clone(),
            ])
            .with_context(|| format!("write CSV row for {}", r.identity))?;
    }
    writer.flush().context("flush CSV")?;
    Ok(())
}

/// Default file name for an export taken from the UI, based on the capture time.
pub fn default_export_path(snapshot: &ResultSnapshot, extension: &str) -> Result<PathBuf> {
    let stamp = snapshot.captured_utc.replace(':', "-").replace('T', "_");
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(format!("grinder-results-{stamp}.{extension}")))
}

/// Write text that came from the runner (config, CSV report) to a file or stdout.
pub fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(p) => std::fs::write(p, text).with_context(|| format!("write {}", p.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
