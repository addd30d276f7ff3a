use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Message shown before anything has happened in the session.
pub const READY_MESSAGE: &str = "Ready to run the pipeline";
pub const RUNNING_MESSAGE: &str = "Pipeline running...";

/// Number of rows requested for the preview table unless overridden.
pub const DEFAULT_PREVIEW_LIMIT: u32 = 50;

/// Fixed (field key, display label) column definitions for the preview table.
pub const PREVIEW_COLUMNS: [(&str, &str); 10] = [
    ("code", "Code"),
    ("product_name", "Product"),
    ("brands", "Brands"),
    ("nutriscore_grade", "Nutri-Score"),
    ("nova_group", "NOVA"),
    ("energy_100g", "Energy/100g"),
    ("fat_100g", "Fat/100g"),
    ("sugars_100g", "Sugars/100g"),
    ("salt_100g", "Salt/100g"),
    ("proteins_100g", "Proteins/100g"),
];

/// Session configuration, fixed once the process has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub preview_limit: u32,
    pub refresh_on_launch: bool,
    pub user_agent: String,
}

/// Acknowledgment returned by `POST /run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub rows: u64,
}

/// One cleaned product as sent by the backend.
///
/// The row is kept as the raw JSON object (in server key order) and handed to the
/// table view untouched; nothing here validates or coerces field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewRow(pub serde_json::Map<String, serde_json::Value>);

impl PreviewRow {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Render one cell for display. Absent and null fields render empty.
    pub fn cell_text(&self, key: &str) -> String {
        match self.get(key) {
            None => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub preview: Vec<PreviewRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nutriscore: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nova_group: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_rows: u64,
}

// FastAPI happily serializes `None` for empty frames, so null and missing mean the same thing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The single source of truth for rendering, owned by the dashboard controller.
///
/// Presentation layers only ever receive clones of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub loading: bool,
    pub preview: Vec<PreviewRow>,
    pub stats: StatsResponse,
    pub message: String,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            loading: false,
            preview: Vec::new(),
            stats: StatsResponse::default(),
            message: READY_MESSAGE.to_string(),
        }
    }
}

impl DashboardState {
    pub fn preview_len(&self) -> usize {
        self.preview.len()
    }

    pub fn distinct_nutriscore(&self) -> usize {
        self.stats.nutriscore.len()
    }

    pub fn distinct_nova_groups(&self) -> usize {
        self.stats.nova_group.len()
    }

    pub fn total_rows(&self) -> u64 {
        self.stats.total_rows
    }
}

/// Events published by the controller for presentation layers.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// Whole-state snapshot taken right after a mutation.
    State(Box<DashboardState>),
}
