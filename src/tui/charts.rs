use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};
use std::collections::BTreeMap;

const EMPTY_TEXT: &str = "No data";
const BAR_COLOR: Color = Color::Blue;

/// Label/count pairs in chart order.
pub fn chart_series(data: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    data.iter().map(|(label, count)| (label.as_str(), *count)).collect()
}

/// Bar width that spreads `n` bars over `inner_width` columns with a gap of one.
fn bar_width(inner_width: u16, n: usize) -> u16 {
    if n == 0 {
        return 1;
    }
    let n = n as u16;
    (inner_width.saturating_sub(n.saturating_sub(1)) / n).clamp(1, 9)
}

/// Render one distribution as a bar chart, or an empty-state message.
pub fn draw_distribution(f: &mut Frame, area: Rect, title: &str, data: &BTreeMap<String, u64>) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let series = chart_series(data);

    if series.is_empty() {
        let empty = Paragraph::new(EMPTY_TEXT)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let max = series.iter().map(|(_, v)| *v).max().unwrap_or(1).max(1);
    let bars: Vec<Bar> = series
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .value(*value)
                .label(Line::from(label.to_string()))
                .text_value(value.to_string())
                .style(Style::default().fg(BAR_COLOR))
                .value_style(Style::default().fg(Color::Black).bg(BAR_COLOR))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(area.width.saturating_sub(2), bars.len()))
        .bar_gap(1)
        .max(max);
    f.render_widget(chart, area);
}
