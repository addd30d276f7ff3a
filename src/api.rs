//! Backend client.
//!
//! [`DashboardApi`] is the seam the controller consumes; [`ApiClient`] is the
//! reqwest implementation talking to the pipeline service.

use crate::error::{FetchError, PipelineError, RequestFailure};
use crate::model::{DashboardConfig, PipelineRunResult, PreviewResponse, StatsResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `POST /run`. Long running: returns once the pipeline has finished.
    async fn trigger_pipeline(&self) -> Result<PipelineRunResult, PipelineError>;

    /// `GET /preview?limit=<limit>`.
    async fn fetch_preview(&self, limit: u32) -> Result<PreviewResponse, FetchError>;

    /// `GET /stats`.
    async fn fetch_stats(&self) -> Result<StatsResponse, FetchError>;

    /// Hand `GET /download` to the system browser.
    ///
    /// Best-effort and unverified: nothing is reported back, the browser's own
    /// download UI is the only place a failure shows up.
    fn request_download(&self);
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(cfg: &DashboardConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn download_url(&self) -> String {
        self.url("/download")
    }

    /// `GET /health`, returning the reported status string.
    pub async fn health(&self) -> Result<String, FetchError> {
        let body: serde_json::Value = send_json(self.http.get(self.url("/health"))).await?;
        Ok(body
            .get("status")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()))
    }
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn trigger_pipeline(&self) -> Result<PipelineRunResult, PipelineError> {
        tracing::info!(url = %self.url("/run"), "triggering pipeline");
        let res: PipelineRunResult = send_json(self.http.post(self.url("/run"))).await?;
        tracing::info!(rows = res.rows, "pipeline finished");
        Ok(res)
    }

    async fn fetch_preview(&self, limit: u32) -> Result<PreviewResponse, FetchError> {
        let req = self
            .http
            .get(self.url("/preview"))
            .query(&[("limit", limit)]);
        let res: PreviewResponse = send_json(req).await?;
        tracing::debug!(rows = res.preview.len(), "preview fetched");
        Ok(res)
    }

    async fn fetch_stats(&self) -> Result<StatsResponse, FetchError> {
        let res: StatsResponse = send_json(self.http.get(self.url("/stats"))).await?;
        tracing::debug!(total_rows = res.total_rows, "stats fetched");
        Ok(res)
    }

    fn request_download(&self) {
        let url = self.download_url();
        tracing::info!(%url, "opening download");
        if let Err(e) = open::that_detached(&url) {
            tracing::warn!(%url, error = %e, "failed to hand download to the browser");
        }
    }
}

/// Send a request and decode a JSON body, mapping every failure to a [`RequestFailure`].
async fn send_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, RequestFailure> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        // The body is only read for its detail; an unreadable one just means no detail.
        let body = resp.bytes().await.unwrap_or_default();
        let detail = extract_detail(&body);
        tracing::debug!(status = status.as_u16(), ?detail, "backend returned an error");
        return Err(RequestFailure::Status {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(resp.json::<T>().await?)
}

/// Pull the `detail` field out of an error body.
///
/// Strings are used as is, anything else (validation error lists) as compact JSON.
fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
