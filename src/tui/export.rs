use crate::model::ResultSnapshot;
use anyhow::Result;
use std::path::PathBuf;

use super::state::UiState;

fn export_with(
    state: &mut UiState,
    extension: &str,
    write: impl FnOnce(&std::path::Path, &ResultSnapshot) -> Result<()>,
) -> Option<PathBuf> {
    if state.snapshot.results.is_empty() {
        state.info = "Nothing to export yet".into();
        return None;
    }
    let res = crate::export::default_export_path(&state.snapshot, extension)
        .and_then(|path| write(&path, &state.snapshot).map(|()| path));
    match res {
        Ok(path) => {
            state.info = format!("Exported: {}", path.display());
            Some(path)
        }
        Err(e) => {
            state.info = format!("Export failed: {e:#}");
            None
        }
    }
}

/// Export the rows on screen as JSON into the working directory.
pub fn export_snapshot_json(state: &mut UiState) -> Option<PathBuf> {
    export_with(state, "json", crate::export::export_json)
}

/// Export the rows on screen as CSV into the working directory.
pub fn export_snapshot_csv(state: &mut UiState) -> Option<PathBuf> {
    export_with(state, "csv", |path, snapshot| {
        crate::export::export_csv(path, &snapshot.results)
    })
}
