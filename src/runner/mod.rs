//! Remote test-runner seam.
//!
//! `RunnerApi` is the surface the poll controller depends on; `RunnerClient`
//! implements it over HTTP and also carries the one-shot endpoints used by the
//! CLI subcommands.

mod client;
mod error;

pub use client::RunnerClient;
pub use error::RunnerError;

use crate::model::StatisticsBatch;
use async_trait::async_trait;

/// Lifecycle requests sent to the runner. All are fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerCommand {
    /// `POST /test`
    BeginRun,
    /// `DELETE /test`
    EndRun,
    /// `DELETE /stop`
    Shutdown,
}

impl RunnerCommand {
    pub fn label(self) -> &'static str {
        match self {
            RunnerCommand::BeginRun => "start test",
            RunnerCommand::EndRun => "stop test",
            RunnerCommand::Shutdown => "shut down runner",
        }
    }

    pub fn method(self) -> reqwest::Method {
        match self {
            RunnerCommand::BeginRun => reqwest::Method::POST,
            RunnerCommand::EndRun | RunnerCommand::Shutdown => reqwest::Method::DELETE,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            RunnerCommand::BeginRun | RunnerCommand::EndRun => "test",
            RunnerCommand::Shutdown => "stop",
        }
    }
}

#[async_trait]
pub trait RunnerApi: Send + Sync + 'static {
    /// `GET /statistics?since=<token>`
    async fn fetch_statistics(&self, since: &str) -> Result<StatisticsBatch, RunnerError>;

    async fn send_command(&self, command: RunnerCommand) -> Result<(), RunnerError>;
}
