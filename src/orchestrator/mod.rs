//! Application-level orchestration utilities.
//!
//! This module owns the poll controller (run lifecycle and incremental result
//! fetching) and post-run processing such as exports. UI/CLI layers call into
//! this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{PollController, UiCommand};
pub(crate) use post_process::{process_run_completion, ExportTargets};

use crate::model::{InfoEvent, MonitorConfig, MonitorEvent};
use crate::runner::RunnerClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Build the HTTP-backed controller for a session and queue the launch commands.
pub(crate) fn spawn_session(
    cfg: &MonitorConfig,
    event_tx: UnboundedSender<MonitorEvent>,
    cmd_tx: &UnboundedSender<UiCommand>,
    cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<tokio::task::JoinHandle<Result<()>>> {
    let client = RunnerClient::new(cfg).context("build runner client")?;
    tracing::info!(runner = %client.base_url(), interval = ?cfg.poll_interval, "monitor session starting");
    let _ = event_tx.send(MonitorEvent::Info(InfoEvent::Message(format!(
        "Connected to {}",
        client.base_url()
    ))));
    let controller = PollController::new(Arc::new(client), cfg.poll_interval, event_tx);

    if cfg.start_on_launch {
        let _ = cmd_tx.send(UiCommand::Start);
    } else if cfg.attach_on_launch {
        let _ = cmd_tx.send(UiCommand::Refresh);
    }

    Ok(tokio::spawn(controller.run(cmd_rx)))
}
