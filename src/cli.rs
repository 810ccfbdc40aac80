use crate::config;
use crate::export;
use crate::model::{MonitorConfig, MonitorEvent, ResultSnapshot, RunState};
use crate::orchestrator::{self, ExportTargets, UiCommand};
use crate::runner::{RunnerApi, RunnerClient, RunnerCommand};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "grinder-monitor",
    version,
    about = "Live status monitor and run controller for a remote load-test runner"
)]
pub struct Cli {
    /// Base URL of the runner's HTTP interface [default: http://localhost:3000]
    #[arg(long, env = "GRINDER_MONITOR_URL")]
    pub base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "GRINDER_MONITOR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// JSON config file (default: <config dir>/grinder-monitor/config.json if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Delay between statistics polls while a run is active [default: 1s]
    #[arg(long)]
    pub poll_interval: Option<humantime::Duration>,

    /// Timeout for each request to the runner [default: 5s]
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// Start a new test run on launch (discards previous results)
    #[arg(long)]
    pub start: bool,

    /// Do not fetch the runner's current state on launch
    #[arg(long)]
    pub no_attach: bool,

    /// Print the final results as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print progress and a result table and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Export the final results as JSON when the run finishes
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the final results as CSV when the run finishes
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. info, grinder_monitor=debug)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Read or replace the runner's test configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Download the runner's CSV report
    Csv {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Shut down the runner process
    Terminate,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ConfigAction {
    /// Print the current configuration document
    Get {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload a configuration document (JSON)
    Put { file: PathBuf },
}

impl Cli {
    /// Whether this invocation runs the interactive terminal UI.
    pub fn uses_tui(&self) -> bool {
        cfg!(feature = "tui") && self.command.is_none() && !self.json && !self.text
    }

    pub(crate) fn export_targets(&self) -> ExportTargets {
        ExportTargets {
            json: self.export_json.clone(),
            csv: self.export_csv.clone(),
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let file = config::load_file_config(args.config.as_deref())?;
    let cfg = config::build_config(&args, file)?;

    if let Some(command) = args.command.clone() {
        return run_oneshot(&cfg, command).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, cfg).await;
        }
    }

    run_headless(args, cfg).await
}

/// One request against an auxiliary runner endpoint.
async fn run_oneshot(cfg: &MonitorConfig, command: Command) -> Result<()> {
    let client = RunnerClient::new(cfg)?;
    match command {
        Command::Config {
            action: ConfigAction::Get { out },
        } => {
            let remote = client.fetch_config().await.context("fetch runner config")?;
            tracing::info!(mtime = %remote.mtime, "fetched runner config");
            let text = serde_json::to_string_pretty(&remote.config)?;
            export::write_text(out.as_deref(), &text)?;
        }
        Command::Config {
            action: ConfigAction::Put { file },
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            serde_json::from_str::<serde_json::Value>(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            client.put_config(raw).await.context("upload runner config")?;
            eprintln!("Uploaded {}", file.display());
        }
        Command::Csv { out } => {
            let csv = client.fetch_csv().await.context("fetch runner CSV")?;
            export::write_text(out.as_deref(), &csv)?;
        }
        Command::Terminate => {
            client
                .send_command(RunnerCommand::Shutdown)
                .await
                .context("shut down runner")?;
            eprintln!("Runner shutdown requested");
        }
    }
    Ok(())
}

/// Text and JSON modes: follow one run to completion, then print it.
async fn run_headless(args: Cli, cfg: MonitorConfig) -> Result<()> {
    if !cfg.start_on_launch && !cfg.attach_on_launch {
        anyhow::bail!("nothing to follow: use --start, or drop --no-attach to attach to the runner");
    }
    let json = args.json;
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<MonitorEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = orchestrator::spawn_session(&cfg, event_tx, &cmd_tx, cmd_rx)?;

    let outcome: Result<ResultSnapshot> = loop {
        tokio::select! {
            ev = event_rx.recv() => {
                match ev {
                    Some(MonitorEvent::Snapshot { snapshot }) => {
                        if !json && snapshot.run_state == RunState::Running {
                            let line = crate::text_summary::progress_line(&snapshot);
                            let _ = out_tx.send(OutputLine::Stderr(line));
                        }
                    }
                    Some(MonitorEvent::RunFinished { snapshot }) => break Ok(*snapshot),
                    Some(MonitorEvent::PollFailed { error, running }) => {
                        if !running {
                            break Err(anyhow::anyhow!("runner unreachable: {error}"));
                        }
                        let _ = out_tx.send(OutputLine::Stderr(format!("Poll failed: {error}")));
                    }
                    Some(MonitorEvent::RunStateChanged { state }) => {
                        let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", state.label())));
                    }
                    Some(MonitorEvent::Info(info)) => {
                        let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                    }
                    None => break Err(anyhow::anyhow!("controller stopped unexpectedly")),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break Err(anyhow::anyhow!("interrupted"));
            }
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    controller
        .await
        .context("controller task failed")?
        .context("controller failed")?;

    let snapshot = match outcome {
        Ok(s) => s,
        Err(e) => {
            drop(out_tx);
            let _ = out_handle.await;
            return Err(e);
        }
    };

    if json {
        let out = serde_json::to_string_pretty(&snapshot)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&snapshot);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    let processed = orchestrator::process_run_completion(&args.export_targets(), &snapshot);
    for msg in processed.export_messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }

    drop(out_tx);
    let _ = out_handle.await;
    if processed.failed {
        anyhow::bail!("export failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_text_conflict() {
        let res = Cli::try_parse_from(["grinder-monitor", "--json", "--text"]);
        assert!(res.is_err());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["grinder-monitor", "config", "put", "load.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Put { ref file }
            }) if file == &PathBuf::from("load.json")
        ));
        assert!(!cli.uses_tui());

        let cli = Cli::try_parse_from(["grinder-monitor", "csv", "--out", "r.csv"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Csv { out: Some(_) })));
    }

    #[test]
    fn durations_use_humantime() {
        let cli =
            Cli::try_parse_from(["grinder-monitor", "--text", "--poll-interval", "1500ms"]).unwrap();
        assert_eq!(
            cli.poll_interval.map(std::time::Duration::from),
            Some(std::time::Duration::from_millis(1500))
        );
        assert!(!cli.uses_tui());
    }
}
