use crate::model::{PreviewRow, PREVIEW_COLUMNS};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

/// Column widths, in PREVIEW_COLUMNS order. The product name takes the slack.
const COLUMN_WIDTHS: [Constraint; 10] = [
    Constraint::Length(13),
    Constraint::Min(12),
    Constraint::Length(12),
    Constraint::Length(11),
    Constraint::Length(5),
    Constraint::Length(11),
    Constraint::Length(9),
    Constraint::Length(10),
    Constraint::Length(9),
    Constraint::Length(12),
];

/// Cell texts for each row, one entry per preview column.
pub fn table_cells(rows: &[PreviewRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            PREVIEW_COLUMNS
                .iter()
                .map(|(key, _)| row.cell_text(key))
                .collect()
        })
        .collect()
}

pub fn draw_preview_table(f: &mut Frame, area: Rect, rows: &[PreviewRow], selected: usize) {
    let title = Line::from(format!("Data preview (first {} rows)", rows.len()));
    let block = Block::default().borders(Borders::ALL).title(title);

    if rows.is_empty() {
        let empty = Paragraph::new("No preview rows yet. Press p to run the pipeline or r to refresh.")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(
        PREVIEW_COLUMNS
            .iter()
            .map(|(_, label)| Cell::from(*label)),
    )
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let body = table_cells(rows)
        .into_iter()
        .map(|cells| Row::new(cells.into_iter().map(Cell::from)));

    let table = Table::new(body, COLUMN_WIDTHS)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(selected));
    f.render_stateful_widget(table, area, &mut table_state);
}
