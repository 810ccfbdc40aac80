//! In-memory result set keyed by identity.
//!
//! Rows keep the order in which their identity was first seen; merges replace
//! rows in place. The store never performs I/O.

use crate::model::{ResultSnapshot, ResultSummary, RunState, EMPTY_WATERMARK};
use std::cmp::Ordering;
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Default)]
pub struct ResultStore {
    rows: Vec<ResultSummary>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins merge: every incoming row fully supersedes the stored row
    /// for its identity.
    pub fn merge<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = ResultSummary>,
    {
        for summary in batch {
            match self.index.get(&summary.identity) {
                Some(&pos) => self.rows[pos] = summary,
                None => {
                    self.index.insert(summary.identity.clone(), self.rows.len());
                    self.rows.push(summary);
                }
            }
        }
    }

    /// Largest `last` token across all rows, or the empty token.
    pub fn high_water_mark(&self) -> &str {
        self.rows
            .iter()
            .map(|r| r.last.as_str())
            .max_by(|a, b| compare_tokens(a, b))
            .unwrap_or(EMPTY_WATERMARK)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, identity: &str) -> Option<&ResultSummary> {
        self.index.get(identity).map(|&pos| &self.rows[pos])
    }

    pub fn rows(&self) -> &[ResultSummary] {
        &self.rows
    }

    pub fn snapshot(&self, run_state: RunState) -> ResultSnapshot {
        ResultSnapshot {
            captured_utc: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            run_state,
            watermark: self.high_water_mark().to_string(),
            results: self.rows().to_vec(),
        }
    }
}

/// Order watermark tokens. RFC 3339 timestamps compare as instants because the
/// runner trims trailing fractional zeros (`...:05Z` sorts after `...:05.5Z`
/// as text); anything else compares as plain text.
pub fn compare_tokens(a: &str, b: &str) -> Ordering {
    match (
        OffsetDateTime::parse(a, &Rfc3339),
        OffsetDateTime::parse(b, &Rfc3339),
    ) {
        (Ok(ta), Ok(tb)) => ta.cmp(&tb).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(identity: &str, average: f64, last: &str) -> ResultSummary {
        ResultSummary {
            identity: identity.to_string(),
            average,
            min: average,
            max: average,
            count: 1,
            errors: 0,
            last: last.to_string(),
        }
    }

    fn identities(store: &ResultStore) -> Vec<&str> {
        store.rows().iter().map(|r| r.identity.as_str()).collect()
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let batch = vec![row("01", 1.0, "0815"), row("02", 2.0, "0815")];
        let mut once = ResultStore::new();
        once.merge(batch.clone());
        let mut twice = ResultStore::new();
        twice.merge(batch.clone());
        twice.merge(batch);
        assert_eq!(once.rows(), twice.rows());
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn disjoint_batches_union() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "1"), row("b", 1.0, "1")]);
        store.merge(vec![row("c", 1.0, "2")]);
        assert_eq!(store.len(), 3);
        assert_eq!(identities(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn overlapping_identity_is_replaced_in_place() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "1"), row("b", 1.0, "1"), row("c", 1.0, "1")]);
        store.merge(vec![row("b", 9.0, "2"), row("d", 4.0, "2")]);
        assert_eq!(store.len(), 4);
        assert_eq!(identities(&store), vec!["a", "b", "c", "d"]);
        assert_eq!(store.get("b").map(|r| r.average), Some(9.0));
        assert_eq!(store.get("b").map(|r| r.last.as_str()), Some("2"));
    }

    #[test]
    fn replacement_does_not_aggregate() {
        let mut store = ResultStore::new();
        let mut first = row("a", 10.0, "1");
        first.count = 5;
        store.merge(vec![first]);
        let mut second = row("a", 2.0, "2");
        second.count = 6;
        store.merge(vec![second.clone()]);
        assert_eq!(store.get("a"), Some(&second));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut store = ResultStore::new();
        store.merge(Vec::new());
        assert!(store.is_empty());
        store.merge(vec![row("a", 1.0, "1")]);
        let before = store.rows().to_vec();
        store.merge(Vec::new());
        assert_eq!(store.rows(), before.as_slice());
    }

    #[test]
    fn duplicate_identity_inside_one_batch_keeps_the_later_row() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "1"), row("a", 3.0, "2")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").map(|r| r.average), Some(3.0));
    }

    #[test]
    fn watermark_tracks_the_largest_token() {
        let mut store = ResultStore::new();
        assert_eq!(store.high_water_mark(), "");
        store.merge(vec![row("01", 1.0, "0815")]);
        assert_eq!(store.high_water_mark(), "0815");
        store.merge(vec![row("02", 1.0, "0816")]);
        assert_eq!(store.high_water_mark(), "0816");
    }

    #[test]
    fn watermark_does_not_depend_on_insertion_order() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "0900"), row("b", 1.0, "0815")]);
        assert_eq!(store.high_water_mark(), "0900");
        // replacing the newest row with an older token lowers the mark
        store.merge(vec![row("a", 1.0, "0800")]);
        assert_eq!(store.high_water_mark(), "0815");
    }

    #[test]
    fn rfc3339_tokens_compare_as_instants() {
        let whole = "2016-01-12T10:00:05Z";
        let fraction = "2016-01-12T10:00:05.5Z";
        assert_eq!(compare_tokens(whole, fraction), Ordering::Less);
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, whole), row("b", 1.0, fraction)]);
        assert_eq!(store.high_water_mark(), fraction);
    }

    #[test]
    fn clear_empties_rows_and_watermark() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "1")]);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get("a").is_none());
        assert_eq!(store.high_water_mark(), "");
        store.merge(vec![row("b", 1.0, "2")]);
        assert_eq!(identities(&store), vec!["b"]);
    }

    #[test]
    fn snapshot_copies_rows_and_state() {
        let mut store = ResultStore::new();
        store.merge(vec![row("a", 1.0, "0816")]);
        let snap = store.snapshot(RunState::Running);
        assert_eq!(snap.run_state, RunState::Running);
        assert_eq!(snap.watermark, "0816");
        assert_eq!(snap.results.len(), 1);
        assert!(!snap.captured_utc.is_empty());
    }
}
