use crate::model::{MonitorEvent, ResultSnapshot, ResultSummary, RunState};
use std::path::PathBuf;

/// Row order of the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Order in which identities first appeared.
    #[default]
    Arrival,
    Identity,
    Slowest,
    Busiest,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            SortOrder::Arrival => SortOrder::Identity,
            SortOrder::Identity => SortOrder::Slowest,
            SortOrder::Slowest => SortOrder::Busiest,
            SortOrder::Busiest => SortOrder::Arrival,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Arrival => "arrival",
            SortOrder::Identity => "name",
            SortOrder::Slowest => "slowest avg",
            SortOrder::Busiest => "most samples",
        }
    }

    pub fn sorted(self, rows: &[ResultSummary]) -> Vec<&ResultSummary> {
        let mut out: Vec<&ResultSummary> = rows.iter().collect();
        match self {
            SortOrder::Arrival => {}
            SortOrder::Identity => out.sort_by(|a, b| a.identity.cmp(&b.identity)),
            SortOrder::Slowest => out.sort_by(|a, b| {
                b.average
                    .total_cmp(&a.average)
                    .then_with(|| a.identity.cmp(&b.identity))
            }),
            SortOrder::Busiest => out.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.identity.cmp(&b.identity))
            }),
        }
        out
    }
}

#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub runner_url: String,
    pub log_file: Option<PathBuf>,
    pub run_state: RunState,
    pub snapshot: ResultSnapshot,
    pub info: String,
    pub last_poll_utc: Option<String>,
    // Consecutive failures; reset by the next successful poll.
    pub poll_failures: u32,
    pub last_error: Option<String>,
    pub sort: SortOrder,
    pub scroll: usize,
    pub finished_runs: u32,
    // Set when a poll flips the state from Running to Stopped.
    pub(super) run_ended: bool,
}

impl UiState {
    /// Fold a controller event into the view state. Returns the final snapshot
    /// when the event marks the end of a run.
    pub fn apply_event(&mut self, ev: MonitorEvent) -> Option<Box<ResultSnapshot>> {
        match ev {
            MonitorEvent::RunStateChanged { state } => {
                if self.run_state == RunState::Running && state == RunState::Stopped {
                    self.run_ended = true;
                }
                self.run_state = state;
                self.info = match state {
                    RunState::Running => "Test running".into(),
                    RunState::Stopped => "Test stopped".into(),
                };
                None
            }
            MonitorEvent::Snapshot { snapshot } => {
                self.poll_failures = 0;
                self.last_error = None;
                self.last_poll_utc = Some(snapshot.captured_utc.clone());
                self.run_state = snapshot.run_state;
                self.snapshot = *snapshot;
                self.clamp_scroll();
                None
            }
            MonitorEvent::PollFailed { error, running } => {
                self.poll_failures += 1;
                self.info = if running {
                    format!("Poll failed, retrying: {error}")
                } else {
                    format!("Runner unreachable: {error}")
                };
                self.last_error = Some(error);
                None
            }
            MonitorEvent::RunFinished { snapshot } => {
                if !std::mem::take(&mut self.run_ended) {
                    // Refresh of an idle runner: nothing new has ended.
                    self.info = format!("Runner idle: {} test step(s)", snapshot.results.len());
                    return None;
                }
                self.finished_runs += 1;
                self.info = format!("Run finished: {} test step(s)", snapshot.results.len());
                Some(snapshot)
            }
            MonitorEvent::Info(info) => {
                self.info = info.to_message();
                None
            }
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll += 1;
        self.clamp_scroll();
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self
            .scroll
            .min(self.snapshot.results.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InfoEvent;

    fn row(identity: &str, average: f64, count: u64) -> ResultSummary {
        ResultSummary {
            identity: identity.into(),
            average,
            min: average,
            max: average,
            count,
            errors: 0,
            last: "1".into(),
        }
    }

    fn snapshot(rows: Vec<ResultSummary>, run_state: RunState) -> Box<ResultSnapshot> {
        Box::new(ResultSnapshot {
            captured_utc: "2026-01-01T00:00:00Z".into(),
            run_state,
            watermark: "1".into(),
            results: rows,
        })
    }

    #[test]
    fn sort_orders_cycle_and_order_rows() {
        let rows = vec![row("b", 5.0, 10), row("c", 9.0, 1), row("a", 5.0, 30)];
        let ids = |order: SortOrder| -> Vec<String> {
            order
                .sorted(&rows)
                .into_iter()
                .map(|r| r.identity.clone())
                .collect()
        };
        assert_eq!(ids(SortOrder::Arrival), ["b", "c", "a"]);
        assert_eq!(ids(SortOrder::Identity), ["a", "b", "c"]);
        assert_eq!(ids(SortOrder::Slowest), ["c", "a", "b"]);
        assert_eq!(ids(SortOrder::Busiest), ["a", "b", "c"]);

        let mut order = SortOrder::default();
        for _ in 0..4 {
            order = order.next();
        }
        assert_eq!(order, SortOrder::Arrival);
    }

    #[test]
    fn snapshot_resets_failure_streak() {
        let mut state = UiState::default();
        state.apply_event(MonitorEvent::PollFailed {
            error: "timeout".into(),
            running: true,
        });
        state.apply_event(MonitorEvent::PollFailed {
            error: "timeout".into(),
            running: true,
        });
        assert_eq!(state.poll_failures, 2);
        assert_eq!(state.last_error.as_deref(), Some("timeout"));
        assert!(state.info.contains("retrying"));

        let finished = state.apply_event(MonitorEvent::Snapshot {
            snapshot: snapshot(vec![row("a", 1.0, 1)], RunState::Running),
        });
        assert!(finished.is_none());
        assert_eq!(state.poll_failures, 0);
        assert!(state.last_error.is_none());
        assert_eq!(state.run_state, RunState::Running);
        assert_eq!(state.snapshot.results.len(), 1);
    }

    #[test]
    fn run_finished_hands_back_the_snapshot() {
        let mut state = UiState::default();
        state.apply_event(MonitorEvent::RunStateChanged {
            state: RunState::Running,
        });
        state.apply_event(MonitorEvent::RunStateChanged {
            state: RunState::Stopped,
        });
        let done = state.apply_event(MonitorEvent::RunFinished {
            snapshot: snapshot(vec![row("a", 1.0, 1), row("b", 2.0, 2)], RunState::Stopped),
        });
        assert_eq!(done.map(|s| s.results.len()), Some(2));
        assert_eq!(state.finished_runs, 1);
        assert_eq!(state.info, "Run finished: 2 test step(s)");
    }

    #[test]
    fn refreshing_an_idle_runner_does_not_finish_a_run_again() {
        let mut state = UiState::default();
        state.apply_event(MonitorEvent::RunStateChanged {
            state: RunState::Running,
        });
        state.apply_event(MonitorEvent::RunStateChanged {
            state: RunState::Stopped,
        });
        let finished = || MonitorEvent::RunFinished {
            snapshot: snapshot(vec![row("a", 1.0, 1)], RunState::Stopped),
        };
        assert!(state.apply_event(finished()).is_some());

        for _ in 0..3 {
            assert!(state.apply_event(finished()).is_none());
        }
        assert_eq!(state.finished_runs, 1);
        assert_eq!(state.info, "Runner idle: 1 test step(s)");
    }

    #[test]
    fn attaching_to_an_idle_runner_is_not_a_finished_run() {
        let mut state = UiState::default();
        let done = state.apply_event(MonitorEvent::RunFinished {
            snapshot: snapshot(vec![], RunState::Stopped),
        });
        assert!(done.is_none());
        assert_eq!(state.finished_runs, 0);
    }

    #[test]
    fn info_events_replace_the_status_line() {
        let mut state = UiState::default();
        state.apply_event(MonitorEvent::Info(InfoEvent::StopIgnored));
        assert_eq!(state.info, "No test is running");
    }

    #[test]
    fn scroll_stays_within_rows() {
        let mut state = UiState::default();
        state.apply_event(MonitorEvent::Snapshot {
            snapshot: snapshot(vec![row("a", 1.0, 1), row("b", 1.0, 1)], RunState::Running),
        });
        for _ in 0..5 {
            state.scroll_down();
        }
        assert_eq!(state.scroll, 1);
        state.scroll_up();
        state.scroll_up();
        assert_eq!(state.scroll, 0);

        state.scroll = 1;
        state.apply_event(MonitorEvent::Snapshot {
            snapshot: snapshot(vec![], RunState::Running),
        });
        assert_eq!(state.scroll, 0);
    }
}
