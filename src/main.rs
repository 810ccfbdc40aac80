mod cli;
mod config;
mod export;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod runner;
mod store;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_tui = args.uses_tui();

    if let Some(path) = logging::init(&args.log_level, is_tui)? {
        tracing::debug!(path = %path.display(), "logging to file");
    }

    match cli::run(args).await {
        Ok(()) => {
            // Exit right away in headless modes instead of waiting on the runtime.
            if !is_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "grinder-monitor failed");
            Err(e)
        }
    }
}
