//! Text summary builder for headless output.
//!
//! Formats a dashboard snapshot the way the TUI shows it: status, KPI figures,
//! both distributions and the preview rows.

use crate::model::{DashboardState, PREVIEW_COLUMNS};
use std::collections::BTreeMap;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn distribution_line(name: &str, data: &BTreeMap<String, u64>) -> String {
    if data.is_empty() {
        return format!("{name}: no data");
    }
    let parts: Vec<String> = data.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{name} ({} distinct): {}", data.len(), parts.join(" "))
}

pub(crate) fn build_text_summary(state: &DashboardState) -> TextSummary {
    let mut lines = vec![
        format!("Status: {}", state.message),
        format!("Cleaned rows: {}", state.total_rows()),
        format!("Preview: {} rows", state.preview_len()),
        distribution_line("Nutri-Score", &state.stats.nutriscore),
        distribution_line("NOVA", &state.stats.nova_group),
    ];

    if !state.preview.is_empty() {
        lines.push(String::new());
        let header: Vec<&str> = PREVIEW_COLUMNS.iter().map(|(_, label)| *label).collect();
        lines.push(header.join(" | "));
        for row in &state.preview {
            let cells: Vec<String> = PREVIEW_COLUMNS
                .iter()
                .map(|(key, _)| row.cell_text(key))
                .collect();
            lines.push(cells.join(" | "));
        }
    }

    TextSummary { lines }
}
