//! Post-run processing utilities.
//!
//! Handles the exports requested on the command line once the runner reports
//! that a run has finished.

use crate::export;
use crate::model::ResultSnapshot;
use std::path::PathBuf;

/// Files to write whenever a run finishes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExportTargets {
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

impl ExportTargets {
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.csv.is_none()
    }
}

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub export_messages: Vec<String>,
    pub failed: bool,
}

/// Process a finished run: write the requested exports and collect status lines.
pub(crate) fn process_run_completion(
    targets: &ExportTargets,
    snapshot: &ResultSnapshot,
) -> ProcessedRun {
    let mut export_messages = Vec::new();
    let mut failed = false;
    if let Some(path) = targets.json.as_deref() {
        match export::export_json(path, snapshot) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => {
                failed = true;
                export_messages.push(format!("Export JSON failed: {e:#}"));
            }
        }
    }
    if let Some(path) = targets.csv.as_deref() {
        match export::export_csv(path, &snapshot.results) {
            Ok(_) => export_messages.push(format!("Exported CSV: {}", path.display())),
            Err(e) => {
                failed = true;
                export_messages.push(format!("Export CSV failed: {e:#}"));
            }
        }
    }
    ProcessedRun {
        export_messages,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultSummary, RunState};

    fn snapshot() -> ResultSnapshot {
        ResultSnapshot {
            captured_utc: "2016-01-12T10:00:00Z".into(),
            run_state: RunState::Stopped,
            watermark: "0816".into(),
            results: vec![ResultSummary {
                identity: "01_01_teststep".into(),
                average: 100.2,
                min: 100.1,
                max: 100.3,
                count: 18,
                errors: 0,
                last: "0816".into(),
            }],
        }
    }

    #[test]
    fn no_targets_no_messages() {
        let processed = process_run_completion(&ExportTargets::default(), &snapshot());
        assert!(processed.export_messages.is_empty());
        assert!(!processed.failed);
    }

    #[test]
    fn writes_both_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let targets = ExportTargets {
            json: Some(dir.path().join("run.json")),
            csv: Some(dir.path().join("run.csv")),
        };
        let processed = process_run_completion(&targets, &snapshot());
        assert!(!processed.failed);
        assert_eq!(processed.export_messages.len(), 2);
        assert!(dir.path().join("run.json").exists());
        assert!(dir.path().join("run.csv").exists());
    }

    #[test]
    fn export_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let targets = ExportTargets {
            // a directory cannot be overwritten with a file
            json: Some(dir.path().to_path_buf()),
            csv: None,
        };
        let processed = process_run_completion(&targets, &snapshot());
        assert!(processed.failed);
        assert!(processed.export_messages[0].starts_with("Export JSON failed"));
    }
}
