//! Text summary builder for CLI output.
//!
//! This module formats human-readable lines for text mode.

use crate::metrics;
use crate::model::{ResultSnapshot, ResultSummary};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One-line progress update for a snapshot.
pub(crate) fn progress_line(snapshot: &ResultSnapshot) -> String {
    let totals = metrics::compute_totals(&snapshot.results);
    format!(
        "[{}] {} steps, {} samples, {} errors, watermark {}",
        snapshot.run_state.label(),
        totals.identities,
        totals.samples,
        totals.errors,
        if snapshot.watermark.is_empty() {
            "-"
        } else {
            snapshot.watermark.as_str()
        }
    )
}

fn fmt_row(identity: &str, width: usize, r: &ResultSummary) -> String {
    format!(
        "{identity:<width$}  {:>12.3}  {:>12.3}  {:>12.3}  {:>8}  {:>6}",
        r.average, r.min, r.max, r.count, r.errors
    )
}

/// Build the final result table.
pub(crate) fn build_text_summary(snapshot: &ResultSnapshot) -> TextSummary {
    let mut lines = Vec::new();
    if snapshot.results.is_empty() {
        lines.push("No results.".to_string());
        return TextSummary { lines };
    }

    let width = snapshot
        .results
        .iter()
        .map(|r| r.identity.chars().count())
        .max()
        .unwrap_or(0)
        .max("identity".len());
    lines.push(format!(
        "{:<width$}  {:>12}  {:>12}  {:>12}  {:>8}  {:>6}",
        "identity", "avg", "min", "max", "count", "errors"
    ));
    for r in &snapshot.results {
        lines.push(fmt_row(&r.identity, width, r));
    }

    let totals = metrics::compute_totals(&snapshot.results);
    let avg = totals
        .weighted_average
        .map(|v| format!("{v:.3}"))
        .unwrap_or_else(|| "-".into());
    lines.push(format!(
        "Total: {} samples over {} steps, weighted avg {}, errors {} ({:.1}%)",
        totals.samples,
        totals.identities,
        avg,
        totals.errors,
        totals.error_rate() * 100.0
    ));
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunState;

    fn snapshot(results: Vec<ResultSummary>) -> ResultSnapshot {
        ResultSnapshot {
            captured_utc: "2016-01-12T10:00:00Z".into(),
            run_state: RunState::Running,
            watermark: "0816".into(),
            results,
        }
    }

    #[test]
    fn empty_snapshot() {
        let s = build_text_summary(&snapshot(vec![]));
        assert_eq!(s.lines, vec!["No results."]);
    }

    #[test]
    fn table_has_header_rows_and_total() {
        let s = build_text_summary(&snapshot(vec![ResultSummary {
            identity: "01_01_teststep".into(),
            average: 100.5,
            min: 100.0,
            max: 101.0,
            count: 18,
            errors: 0,
            last: "0816".into(),
        }]));
        assert_eq!(s.lines.len(), 3);
        assert!(s.lines[0].starts_with("identity      "));
        assert!(s.lines[1].starts_with("01_01_teststep"));
        assert!(s.lines[1].contains("100.500"));
        assert!(s.lines[2].starts_with("Total: 18 samples over 1 steps"));
    }

    #[test]
    fn progress_line_shows_state_and_watermark() {
        let line = progress_line(&snapshot(vec![]));
        assert_eq!(line, "[running] 0 steps, 0 samples, 0 errors, watermark 0816");
    }
}
