mod charts;
mod help;
mod state;
mod table;

use crate::api::ApiClient;
use crate::model::{DashboardConfig, DashboardEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::{KeyAction, UiState, TAB_DISTRIBUTIONS};
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: DashboardConfig, log_path: Option<PathBuf>) -> Result<()> {
    let api = Arc::new(ApiClient::new(&cfg)?);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashboardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let ui_state = UiState {
        base_url: cfg.base_url.clone(),
        log_path: log_path.map(|p| p.display().to_string()),
        ..Default::default()
    };

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(ui_state, event_rx, cmd_tx));

    let res = orchestrator::run_controller(api, &cfg, event_tx, cmd_rx).await;

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

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<DashboardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain snapshots without blocking; only the latest one matters for drawing.
        match event_rx.try_recv() {
            Ok(ev) => {
                state.apply_event(ev);
                continue;
            }
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("controller stopped; closing UI");
                break Ok(());
            }
            Err(TryRecvError::Empty) => {}
        }

        if last_tick.elapsed() >= tick_rate {
            state.tick();
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match state.handle_key(k.modifiers, k.code) {
                    KeyAction::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Preview"), Line::from("Distributions")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("OpenFoodFacts pipeline dashboard"),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_status(chunks[1], f, state);
    draw_kpis(chunks[2], f, state);

    if state.tab == TAB_DISTRIBUTIONS {
        draw_distributions(chunks[3], f, state);
    } else {
        table::draw_preview_table(f, chunks[3], &state.dashboard.preview, state.selected);
    }

    draw_footer(chunks[4], f, state);

    if state.show_help {
        help::draw_help(
            centered(area, 70, 70),
            f,
            &state.base_url,
            state.log_path.as_deref(),
        );
    }
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = Vec::new();
    if state.dashboard.loading {
        spans.push(Span::styled(
            format!("{} ", state.spinner()),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::styled(
            state.dashboard.message.clone(),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        spans.push(Span::raw(state.dashboard.message.clone()));
    }
    if let Some(notice) = state.notice.as_deref() {
        spans.push(Span::styled(
            format!("  ({notice})"),
            Style::default().fg(Color::Gray),
        ));
    }

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_kpis(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(area);

    let d = &state.dashboard;
    let cards = [
        ("Cleaned rows", d.total_rows().to_string()),
        ("Preview", format!("{} rows", d.preview_len())),
        ("Distinct Nutri-Score", d.distinct_nutriscore().to_string()),
        ("Distinct NOVA", d.distinct_nova_groups().to_string()),
    ];
    for (i, (title, value)) in cards.into_iter().enumerate() {
        let p = Paragraph::new(Span::styled(
            value,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, cols[i]);
    }
}

fn draw_distributions(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);
    charts::draw_distribution(
        f,
        halves[0],
        "Nutri-Score distribution",
        &state.dashboard.stats.nutriscore,
    );
    charts::draw_distribution(
        f,
        halves[1],
        "NOVA distribution",
        &state.dashboard.stats.nova_group,
    );
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let key = Style::default().fg(Color::Magenta);
    let disabled = Style::default().fg(Color::DarkGray);
    let busy = state.dashboard.loading;
    let (run_style, refresh_style) = if busy { (disabled, disabled) } else { (key, key) };
    let run_label = if busy { " running  " } else { " run  " };

    let line = Line::from(vec![
        Span::styled("p", run_style),
        Span::styled(run_label, if busy { disabled } else { Style::default() }),
        Span::styled("r", refresh_style),
        Span::styled(" refresh  ", if busy { disabled } else { Style::default() }),
        Span::styled("d", key),
        Span::raw(" download  "),
        Span::styled("tab", key),
        Span::raw(" view  "),
        Span::styled("?", key),
        Span::raw(" help  "),
        Span::styled("q", key),
        Span::raw(" quit"),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// A rectangle of `pct_x` x `pct_y` percent centered in `area`.
fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - pct_y) / 2),
                Constraint::Percentage(pct_y),
                Constraint::Percentage((100 - pct_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - pct_x) / 2),
                Constraint::Percentage(pct_x),
                Constraint::Percentage((100 - pct_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
