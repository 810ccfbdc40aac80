mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::metrics::compute_totals;
use crate::model::{MonitorConfig, MonitorEvent, ResultSnapshot, RunState};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: MonitorConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<MonitorEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Build the client before touching the terminal so config errors print plainly.
    let controller = orchestrator::spawn_session(&cfg, event_tx, &cmd_tx, cmd_rx)?;

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let runner_url = cfg.base_url.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(args, runner_url, event_rx, cmd_tx));

    let res = controller
        .await
        .context("controller task failed")
        .and_then(|r| r);

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread. The controller stops once this
/// returns and the command sender is dropped.
fn run_threaded(
    args: Cli,
    runner_url: String,
    mut event_rx: UnboundedReceiver<MonitorEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState {
        runner_url,
        log_file: Some(crate::logging::log_file_path()),
        info: "Connecting…".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            if let Some(snapshot) = state.apply_event(ev) {
                handle_run_finished(&args, &mut state, &snapshot);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('s')) => {
                        state.info = "Start requested…".into();
                        state.scroll = 0;
                        let _ = cmd_tx.send(UiCommand::Start);
                    }
                    (_, KeyCode::Char('x')) => {
                        state.info = "Stop requested…".into();
                        let _ = cmd_tx.send(UiCommand::Stop);
                    }
                    (_, KeyCode::Char('T')) => {
                        state.info = "Terminate requested…".into();
                        let _ = cmd_tx.send(UiCommand::Terminate);
                    }
                    (_, KeyCode::Char('r')) => {
                        state.info = "Refreshing…".into();
                        let _ = cmd_tx.send(UiCommand::Refresh);
                    }
                    (_, KeyCode::Char('o')) => {
                        state.sort = state.sort.next();
                        state.scroll = 0;
                        state.info = format!("Sorted by {}", state.sort.label());
                    }
                    (_, KeyCode::Char('e')) => {
                        export::export_snapshot_json(&mut state);
                    }
                    (_, KeyCode::Char('c')) => {
                        export::export_snapshot_csv(&mut state);
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.scroll_down(),
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.scroll_up(),
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 2;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 1;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Write the exports requested on the command line for a finished run.
fn handle_run_finished(args: &Cli, state: &mut UiState, snapshot: &ResultSnapshot) {
    let targets = args.export_targets();
    if targets.is_empty() {
        return;
    }
    let processed = orchestrator::process_run_completion(&targets, snapshot);
    if !processed.export_messages.is_empty() {
        state.info = processed.export_messages.join(" | ");
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Results"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("grinder-monitor"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_results(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f, state.log_file.as_deref()),
    }
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(6), // Runner status and totals
                Constraint::Min(0),    // Result table
                Constraint::Length(4), // Info line and key hints
            ]
            .as_ref(),
        )
        .split(area);

    draw_status(main[0], f, state);
    draw_table(main[1], f, state);

    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Magenta));
    let info = Paragraph::new(vec![
        Line::from(state.info.clone()),
        Line::from(vec![
            key("s"),
            Span::raw(" start  "),
            key("x"),
            Span::raw(" stop  "),
            key("T"),
            Span::raw(" terminate  "),
            key("r"),
            Span::raw(" refresh  "),
            key("o"),
            Span::raw(" sort  "),
            key("e/c"),
            Span::raw(" export  "),
            key("?"),
            Span::raw(" help  "),
            key("q"),
            Span::raw(" quit"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(info, main[2]);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::Cyan);
    let state_style = match state.run_state {
        RunState::Running => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        RunState::Stopped => Style::default().fg(Color::DarkGray),
    };
    let totals = compute_totals(&state.snapshot.results);
    let avg = totals
        .weighted_average
        .map(|v| format!("{v:.2} ms"))
        .unwrap_or_else(|| "-".into());
    let watermark = if state.snapshot.watermark.is_empty() {
        "-".to_string()
    } else {
        state.snapshot.watermark.clone()
    };
    let failures_style = if state.poll_failures > 0 {
        Style::default().fg(Color::Red)
    } else {
        value
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Runner: ", label),
            Span::styled(state.runner_url.clone(), value),
            Span::raw("   "),
            Span::styled("State: ", label),
            Span::styled(state.run_state.label(), state_style),
        ]),
        Line::from(vec![
            Span::styled("Steps: ", label),
            Span::styled(totals.identities.to_string(), value),
            Span::styled("  Samples: ", label),
            Span::styled(totals.samples.to_string(), value),
            Span::styled("  Errors: ", label),
            Span::styled(
                format!("{} ({:.2}%)", totals.errors, totals.error_rate() * 100.0),
                value,
            ),
            Span::styled("  Avg: ", label),
            Span::styled(avg, value),
        ]),
        Line::from(vec![
            Span::styled("Watermark: ", label),
            Span::styled(watermark, value),
            Span::styled("  Last poll: ", label),
            Span::styled(
                state.last_poll_utc.clone().unwrap_or_else(|| "-".into()),
                value,
            ),
            Span::styled("  Poll failures: ", label),
            Span::styled(state.poll_failures.to_string(), failures_style),
        ]),
        Line::from(vec![
            Span::styled("Runs finished: ", label),
            Span::styled(state.finished_runs.to_string(), value),
            Span::styled("  Last error: ", label),
            match &state.last_error {
                Some(e) => Span::styled(e.clone(), Style::default().fg(Color::Red)),
                None => Span::styled("-", value),
            },
        ]),
    ];
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_table(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let header = Row::new(vec![
        Cell::from("Test step"),
        Cell::from("Avg ms"),
        Cell::from("Min ms"),
        Cell::from("Max ms"),
        Cell::from("Count"),
        Cell::from("Errors"),
        Cell::from("Last"),
    ])
    .style(Style::default().fg(Color::Yellow));

    let rows: Vec<Row> = state
        .sort
        .sorted(&state.snapshot.results)
        .into_iter()
        .skip(state.scroll)
        .map(|r| {
            let style = if r.errors > 0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(r.identity.clone()),
                Cell::from(format!("{:.2}", r.average)),
                Cell::from(format!("{:.2}", r.min)),
                Cell::from(format!("{:.2}", r.max)),
                Cell::from(r.count.to_string()),
                Cell::from(r.errors.to_string()),
                Cell::from(r.last.clone()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(30),
    ];
    let title = format!(
        "Results ({} steps, sorted by {})",
        state.snapshot.results.len(),
        state.sort.label()
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}
