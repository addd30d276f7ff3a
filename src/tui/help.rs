use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, base_url: &str, log_path: Option<&str>) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("p", 11, "Run the pipeline (disabled while running)"),
        key_line("r", 11, "Refresh preview and stats"),
        key_line("d", 11, "Download the cleaned Parquet file"),
        key_line("tab", 9, "Switch between preview and distributions"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Move in the preview table"),
        ]),
        key_line("g/G", 9, "First / last preview row"),
        key_line("?", 11, "Toggle this help"),
        Line::from(""),
        Line::from(vec![
            Span::raw("Backend: "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ];
    if let Some(path) = log_path {
        lines.push(Line::from(vec![
            Span::raw("Log file: "),
            Span::styled(path.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
