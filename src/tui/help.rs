use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::path::Path;

const KEYBINDS: [(&str, &str); 10] = [
    ("s", "Start a new test (clears results)"),
    ("x", "Stop the running test"),
    ("T", "Terminate the runner process"),
    ("r", "Refresh from the runner"),
    ("o", "Cycle sort order"),
    ("e", "Export results as JSON"),
    ("c", "Export results as CSV"),
    ("↑/↓ j/k", "Scroll results"),
    ("tab", "Switch tabs"),
    ("?", "Show this help"),
];

fn key_line(key: &str, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(action.to_string()),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, log_file: Option<&Path>) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
    ];
    lines.extend(KEYBINDS.iter().map(|(k, a)| key_line(k, a)));
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Results stay on screen after a run ends; starting a new test clears them.",
    ));
    if let Some(path) = log_file {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Log file: "),
            Span::styled(
                path.display().to_string(),
                Style::default().fg(Color::Cyan),
            ),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
