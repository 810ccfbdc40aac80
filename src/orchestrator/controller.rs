//! Poll controller.
//!
//! Owns the run state and the result store, drives the fetch-merge-reschedule
//! loop and forwards lifecycle commands to the runner. Presentation layers talk
//! to it through `UiCommand`s and receive `MonitorEvent`s back.

use crate::model::{InfoEvent, MonitorEvent, RunState};
use crate::runner::{RunnerApi, RunnerCommand};
use crate::store::ResultStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Start,
    Stop,
    Terminate,
    Refresh,
    Quit,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// Not running; nothing fetched and nothing scheduled.
    Idle,
    Merged { rows: usize, running: bool },
    Failed,
}

pub(crate) struct PollController<A: RunnerApi> {
    api: Arc<A>,
    store: ResultStore,
    run_state: RunState,
    next_tick: Option<Instant>,
    poll_interval: Duration,
    event_tx: UnboundedSender<MonitorEvent>,
    commands: JoinSet<()>,
}

impl<A: RunnerApi> PollController<A> {
    pub(crate) fn new(
        api: Arc<A>,
        poll_interval: Duration,
        event_tx: UnboundedSender<MonitorEvent>,
    ) -> Self {
        Self {
            api,
            store: ResultStore::new(),
            run_state: RunState::Stopped,
            next_tick: None,
            poll_interval,
            event_tx,
            commands: JoinSet::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn run_state(&self) -> RunState {
        self.run_state
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &ResultStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    fn emit(&self, ev: MonitorEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn set_run_state(&mut self, state: RunState) {
        if self.run_state != state {
            info!(from = self.run_state.label(), to = state.label(), "run state changed");
            self.run_state = state;
            self.emit(MonitorEvent::RunStateChanged { state });
        }
    }

    /// Begin a fresh run. Returns false when a run is already active.
    pub(crate) fn start(&mut self) -> bool {
        if self.run_state.is_running() {
            debug!("start ignored: already running");
            self.emit(MonitorEvent::Info(InfoEvent::StartIgnored));
            return false;
        }
        self.store.clear();
        self.set_run_state(RunState::Running);
        self.dispatch(RunnerCommand::BeginRun);
        // The runner reports `running: false` until the begin request lands.
        self.next_tick = Some(Instant::now() + self.poll_interval);
        true
    }

    /// Ask the runner to end the run. The local state only changes once a poll
    /// reports `running: false`.
    pub(crate) fn stop(&mut self) -> bool {
        if !self.run_state.is_running() {
            debug!("stop ignored: not running");
            self.emit(MonitorEvent::Info(InfoEvent::StopIgnored));
            return false;
        }
        self.dispatch(RunnerCommand::EndRun);
        true
    }

    /// Ask the runner process to exit. No local state change.
    pub(crate) fn terminate(&mut self) {
        self.dispatch(RunnerCommand::Shutdown);
    }

    /// Send a lifecycle request without waiting for its outcome.
    fn dispatch(&mut self, command: RunnerCommand) {
        info!(command = command.label(), "sending runner command");
        let api = Arc::clone(&self.api);
        let event_tx = self.event_tx.clone();
        self.commands.spawn(async move {
            let ev = match api.send_command(command).await {
                Ok(()) => {
                    debug!(command = command.label(), "runner command accepted");
                    InfoEvent::CommandSent {
                        command: command.label(),
                    }
                }
                Err(e) => {
                    warn!(command = command.label(), error = %e, "runner command failed");
                    InfoEvent::CommandFailed {
                        command: command.label(),
                        error: e.to_string(),
                    }
                }
            };
            let _ = event_tx.send(MonitorEvent::Info(ev));
        });
    }

    /// One tick of the poll loop.
    pub(crate) async fn poll_once(&mut self) -> PollOutcome {
        if !self.run_state.is_running() {
            self.next_tick = None;
            return PollOutcome::Idle;
        }
        let outcome = self.fetch_and_merge().await;
        self.reschedule();
        outcome
    }

    /// Fetch once regardless of the run state and adopt the runner's answer.
    pub(crate) async fn refresh(&mut self) -> PollOutcome {
        let outcome = self.fetch_and_merge().await;
        self.reschedule();
        outcome
    }

    fn reschedule(&mut self) {
        self.next_tick = if self.run_state.is_running() {
            Some(Instant::now() + self.poll_interval)
        } else {
            None
        };
    }

    async fn fetch_and_merge(&mut self) -> PollOutcome {
        let since = self.store.high_water_mark().to_string();
        debug!(since = %since, "fetching statistics");
        match self.api.fetch_statistics(&since).await {
            Ok(batch) => {
                let rows = batch.results.len();
                self.store.merge(batch.results);
                self.set_run_state(RunState::from_running(batch.running));
                debug!(
                    rows,
                    total = self.store.len(),
                    watermark = self.store.high_water_mark(),
                    running = batch.running,
                    "statistics merged"
                );
                let snapshot = Box::new(self.store.snapshot(self.run_state));
                if batch.running {
                    self.emit(MonitorEvent::Snapshot { snapshot });
                } else {
                    self.emit(MonitorEvent::Snapshot {
                        snapshot: snapshot.clone(),
                    });
                    self.emit(MonitorEvent::RunFinished { snapshot });
                }
                PollOutcome::Merged {
                    rows,
                    running: batch.running,
                }
            }
            Err(e) => {
                warn!(error = %e, malformed = e.is_malformed(), "statistics poll failed");
                self.emit(MonitorEvent::PollFailed {
                    error: e.to_string(),
                    running: self.run_state.is_running(),
                });
                PollOutcome::Failed
            }
        }
    }

    /// Wait for every outstanding fire-and-forget request to finish.
    pub(crate) async fn settle(&mut self) {
        while let Some(res) = self.commands.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "runner command task failed");
            }
        }
    }

    pub(crate) async fn handle(&mut self, cmd: UiCommand) {
        match cmd {
            UiCommand::Start => {
                self.start();
            }
            UiCommand::Stop => {
                self.stop();
            }
            UiCommand::Terminate => self.terminate(),
            UiCommand::Refresh => {
                self.refresh().await;
            }
            UiCommand::Quit => {}
        }
    }

    /// Drive the controller until `Quit` arrives or every command sender is gone.
    pub(crate) async fn run(mut self, mut cmd_rx: UnboundedReceiver<UiCommand>) -> Result<()> {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(UiCommand::Quit) | None => break,
                        Some(cmd) => self.handle(cmd).await,
                    }
                }
                // The fetch is awaited inside this branch, so at most one is in flight
                // and commands queue in the channel until it resolves.
                _ = wait_for_tick(self.next_tick) => {
                    self.poll_once().await;
                }
                Some(res) = self.commands.join_next(), if !self.commands.is_empty() => {
                    if let Err(e) = res {
                        warn!(error = %e, "runner command task failed");
                    }
                }
            }
        }
        // Let pending requests (e.g. a final shutdown) reach the runner before exit.
        self.settle().await;
        Ok(())
    }
}

async fn wait_for_tick(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => futures::future::pending().await,
    }
}
