//! Dashboard state owner and its two workflows.
//!
//! Refresh pulls preview and stats together and swaps them in as one mutation;
//! Run Pipeline triggers the backend job, reports the outcome in the status
//! message and refreshes on success. `loading` is raised for the duration of a
//! run and always lowered again before the workflow returns.

use crate::api::DashboardApi;
use crate::error::{FetchError, PipelineError};
use crate::model::{DashboardEvent, DashboardState, RUNNING_MESSAGE};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// How a Run Pipeline request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { rows: u64 },
    Failed(PipelineError),
    /// A run was already in flight; nothing was sent to the backend.
    Rejected,
}

pub struct Dashboard<A: DashboardApi> {
    api: Arc<A>,
    state: DashboardState,
    preview_limit: u32,
    events: Option<UnboundedSender<DashboardEvent>>,
}

impl<A: DashboardApi> Dashboard<A> {
    pub fn new(api: Arc<A>, preview_limit: u32) -> Self {
        Self {
            api,
            state: DashboardState::default(),
            preview_limit,
            events: None,
        }
    }

    /// Publish a snapshot to `tx` after every visible mutation.
    pub fn with_events(mut self, tx: UnboundedSender<DashboardEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub(crate) fn publish(&self) {
        if let Some(tx) = &self.events {
            let _ = tx.send(DashboardEvent::State(Box::new(self.state.clone())));
        }
    }

    /// Fetch preview and stats concurrently and replace both, or neither.
    ///
    /// On failure the previous preview/stats stay in place. When both requests
    /// fail, the preview error is returned.
    pub async fn refresh(&mut self) -> Result<(), FetchError> {
        let (preview, stats) = futures::future::join(
            self.api.fetch_preview(self.preview_limit),
            self.api.fetch_stats(),
        )
        .await;
        let (preview, stats) = (preview?, stats?);

        self.state.preview = preview.preview;
        self.state.stats = stats;
        tracing::debug!(
            preview_rows = self.state.preview_len(),
            total_rows = self.state.total_rows(),
            "dashboard refreshed"
        );
        self.publish();
        Ok(())
    }

    /// Session-start refresh. A failure leaves the empty dashboard as is.
    pub async fn initial_refresh(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::debug!(error = %e, "initial refresh failed; keeping empty dashboard");
        }
    }

    /// Refresh asked for by the user; failures replace the status message.
    pub async fn refresh_requested(&mut self) {
        if self.state.loading {
            tracing::info!("refresh ignored while the pipeline is running");
            return;
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh failed");
            self.state.message = format!("Refresh failed: {}", e.describe());
            self.publish();
        }
    }

    pub async fn run_pipeline(&mut self) -> RunOutcome {
        if self.state.loading {
            tracing::warn!("pipeline run rejected: a run is already in flight");
            return RunOutcome::Rejected;
        }

        self.state.loading = true;
        self.state.message = RUNNING_MESSAGE.to_string();
        self.publish();

        let outcome = self.trigger_and_refresh().await;

        // Single release point for every outcome of the run.
        self.state.loading = false;
        self.publish();
        outcome
    }

    async fn trigger_and_refresh(&mut self) -> RunOutcome {
        match self.api.trigger_pipeline().await {
            Ok(res) => {
                self.state.message = format!("Pipeline completed: {} rows", res.rows);
                self.publish();
                // The completed message stands even if pulling the new data fails.
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "refresh after pipeline run failed");
                }
                RunOutcome::Completed { rows: res.rows }
            }
            Err(e) => {
                tracing::warn!(error = %e, "pipeline run failed");
                self.state.message = e.describe();
                RunOutcome::Failed(e)
            }
        }
    }

    /// Open the cleaned dataset download. Never touches dashboard state.
    pub fn request_download(&self) {
        self.api.request_download();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::RequestFailure;
    use crate::model::{PipelineRunResult, PreviewResponse, StatsResponse, READY_MESSAGE};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::{Barrier, Notify};

    /// Scripted backend: every call returns the currently configured response.
    pub(crate) struct FakeApi {
        pub preview: Mutex<Result<PreviewResponse, FetchError>>,
        pub stats: Mutex<Result<StatsResponse, FetchError>>,
        pub trigger: Mutex<Result<PipelineRunResult, PipelineError>>,
        /// When set, the trigger blocks until notified.
        pub gate: Option<Arc<Notify>>,
        /// When set, the next `fetch_preview` blocks until notified.
        pub fetch_gate: Mutex<Option<Arc<Notify>>>,
        /// When set, both fetches wait on it before answering.
        pub fetch_barrier: Option<Arc<Barrier>>,
        pub trigger_calls: AtomicUsize,
        pub preview_calls: AtomicUsize,
        pub download_calls: AtomicUsize,
        pub preview_limits: Mutex<Vec<u32>>,
    }

    impl FakeApi {
        pub fn new() -> Self {
            Self {
                preview: Mutex::new(Ok(PreviewResponse::default())),
                stats: Mutex::new(Ok(StatsResponse::default())),
                trigger: Mutex::new(Ok(PipelineRunResult { rows: 0 })),
                gate: None,
                fetch_gate: Mutex::new(None),
                fetch_barrier: None,
                trigger_calls: AtomicUsize::new(0),
                preview_calls: AtomicUsize::new(0),
                download_calls: AtomicUsize::new(0),
                preview_limits: Mutex::new(Vec::new()),
            }
        }

        pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn with_fetch_gate(self, gate: Arc<Notify>) -> Self {
            *self.fetch_gate.lock().unwrap() = Some(gate);
            self
        }

        pub fn with_fetch_barrier(mut self, barrier: Arc<Barrier>) -> Self {
            self.fetch_barrier = Some(barrier);
            self
        }

        pub fn set_preview(&self, r: Result<PreviewResponse, FetchError>) {
            *self.preview.lock().unwrap() = r;
        }

        pub fn set_stats(&self, r: Result<StatsResponse, FetchError>) {
            *self.stats.lock().unwrap() = r;
        }

        pub fn set_trigger(&self, r: Result<PipelineRunResult, PipelineError>) {
            *self.trigger.lock().unwrap() = r;
        }
    }

    #[async_trait]
    impl DashboardApi for FakeApi {
        async fn trigger_pipeline(&self) -> Result<PipelineRunResult, PipelineError> {
            self.trigger_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.trigger.lock().unwrap().clone()
        }

        async fn fetch_preview(&self, limit: u32) -> Result<PreviewResponse, FetchError> {
            self.preview_calls.fetch_add(1, Ordering::SeqCst);
            self.preview_limits.lock().unwrap().push(limit);
            let gate = self.fetch_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Some(barrier) = &self.fetch_barrier {
                barrier.wait().await;
            }
            self.preview.lock().unwrap().clone()
        }

        async fn fetch_stats(&self) -> Result<StatsResponse, FetchError> {
            if let Some(barrier) = &self.fetch_barrier {
                barrier.wait().await;
            }
            self.stats.lock().unwrap().clone()
        }

        fn request_download(&self) {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn cereal_preview() -> PreviewResponse {
        serde_json::from_str(
            r#"{"preview":[{"code":"123","product_name":"Cereal","nutriscore_grade":"a"}]}"#,
        )
        .unwrap()
    }

    pub(crate) fn cereal_stats() -> StatsResponse {
        StatsResponse {
            nutriscore: BTreeMap::from([("a".to_string(), 1)]),
            nova_group: BTreeMap::from([("1".to_string(), 1)]),
            total_rows: 1,
        }
    }

    pub(crate) fn fetch_failure() -> FetchError {
        FetchError(RequestFailure::Transport("connection refused".into()))
    }

    /// Dashboard already holding the cereal data from a previous refresh.
    async fn loaded_dashboard(api: Arc<FakeApi>) -> Dashboard<FakeApi> {
        api.set_preview(Ok(cereal_preview()));
        api.set_stats(Ok(cereal_stats()));
        let mut dashboard = Dashboard::new(api, 50);
        dashboard.refresh().await.unwrap();
        dashboard
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<DashboardEvent>) -> Vec<DashboardState> {
        let mut out = Vec::new();
        while let Ok(DashboardEvent::State(s)) = rx.try_recv() {
            out.push(*s);
        }
        out
    }

    #[tokio::test]
    async fn refresh_replaces_preview_and_stats_verbatim() {
        let api = Arc::new(FakeApi::new());
        api.set_preview(Ok(cereal_preview()));
        api.set_stats(Ok(cereal_stats()));
        let mut dashboard = Dashboard::new(api.clone(), 50);

        dashboard.refresh().await.unwrap();

        let state = dashboard.state();
        assert_eq!(state.preview, cereal_preview().preview);
        assert_eq!(state.stats, cereal_stats());
        assert_eq!(state.preview_len(), 1);
        assert_eq!(state.distinct_nutriscore(), 1);
        assert_eq!(*api.preview_limits.lock().unwrap(), vec![50]);
    }

    #[tokio::test]
    async fn refresh_issues_both_fetches_concurrently() {
        // Each fetch waits for the other to start, so awaiting them in turn never finishes.
        let api = Arc::new(FakeApi::new().with_fetch_barrier(Arc::new(Barrier::new(2))));
        api.set_preview(Ok(cereal_preview()));
        api.set_stats(Ok(cereal_stats()));
        let mut dashboard = Dashboard::new(api, 50);

        tokio::time::timeout(Duration::from_secs(2), dashboard.refresh())
            .await
            .expect("fetches did not overlap")
            .unwrap();
        assert_eq!(dashboard.state().preview_len(), 1);
        assert_eq!(dashboard.state().total_rows(), 1);
    }

    #[tokio::test]
    async fn preview_without_rows_refreshes_to_empty() {
        let api = Arc::new(FakeApi::new());
        api.set_preview(Ok(serde_json::from_str("{}").unwrap()));
        api.set_stats(Ok(cereal_stats()));
        let mut dashboard = Dashboard::new(api, 50);

        dashboard.refresh().await.unwrap();
        assert!(dashboard.state().preview.is_empty());
        assert_eq!(dashboard.state().total_rows(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_data() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = loaded_dashboard(api.clone()).await;
        let before = dashboard.state().clone();

        // Stats fails, preview would have changed: nothing may be applied.
        api.set_preview(Ok(PreviewResponse::default()));
        api.set_stats(Err(fetch_failure()));
        assert!(dashboard.refresh().await.is_err());
        assert_eq!(dashboard.state(), &before);

        api.set_preview(Err(fetch_failure()));
        api.set_stats(Ok(StatsResponse::default()));
        assert!(dashboard.refresh().await.is_err());
        assert_eq!(dashboard.state(), &before);
    }

    #[tokio::test]
    async fn refresh_issues_both_requests_even_when_one_fails() {
        let api = Arc::new(FakeApi::new());
        api.set_stats(Err(fetch_failure()));
        let mut dashboard = Dashboard::new(api.clone(), 50);

        assert!(dashboard.refresh().await.is_err());
        assert_eq!(api.preview_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initial_refresh_failure_is_silent() {
        let api = Arc::new(FakeApi::new());
        api.set_preview(Err(fetch_failure()));
        let mut dashboard = Dashboard::new(api, 50);

        dashboard.initial_refresh().await;
        assert_eq!(dashboard.state(), &DashboardState::default());
        assert_eq!(dashboard.state().message, READY_MESSAGE);
    }

    #[tokio::test]
    async fn requested_refresh_failure_updates_message() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = loaded_dashboard(api.clone()).await;
        api.set_stats(Err(FetchError(RequestFailure::Status {
            status: 404,
            detail: Some("No parquet file yet".into()),
        })));

        dashboard.refresh_requested().await;
        assert_eq!(dashboard.state().message, "Refresh failed: No parquet file yet");
        assert_eq!(dashboard.state().preview, cereal_preview().preview);
    }

    #[tokio::test]
    async fn successful_run_reports_rows_and_refreshes() {
        let api = Arc::new(FakeApi::new());
        api.set_trigger(Ok(PipelineRunResult { rows: 42 }));
        api.set_preview(Ok(cereal_preview()));
        api.set_stats(Ok(cereal_stats()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut dashboard = Dashboard::new(api, 50).with_events(tx);

        let outcome = dashboard.run_pipeline().await;

        assert_eq!(outcome, RunOutcome::Completed { rows: 42 });
        let state = dashboard.state();
        assert!(state.message.contains("42"), "{}", state.message);
        assert!(!state.loading);
        assert_eq!(state.preview_len(), 1);

        let snapshots = drain(&mut rx);
        let (last, during) = snapshots.split_last().unwrap();
        assert!(!last.loading);
        assert!(!during.is_empty());
        assert!(during.iter().all(|s| s.loading));
        assert_eq!(during[0].message, RUNNING_MESSAGE);
    }

    #[tokio::test]
    async fn failed_run_shows_server_detail_and_keeps_data() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = loaded_dashboard(api.clone()).await;
        let before = dashboard.state().clone();
        api.set_trigger(Err(PipelineError(RequestFailure::Status {
            status: 500,
            detail: Some("pipeline busy".into()),
        })));
        let preview_calls = api.preview_calls.load(Ordering::SeqCst);

        let outcome = dashboard.run_pipeline().await;

        assert!(matches!(outcome, RunOutcome::Failed(_)));
        let state = dashboard.state();
        assert_eq!(state.message, "pipeline busy");
        assert!(!state.loading);
        assert_eq!(state.preview, before.preview);
        assert_eq!(state.stats, before.stats);
        // No refresh after a failed trigger.
        assert_eq!(api.preview_calls.load(Ordering::SeqCst), preview_calls);
    }

    #[tokio::test]
    async fn failed_run_without_detail_uses_transport_text() {
        let api = Arc::new(FakeApi::new());
        api.set_trigger(Err(PipelineError(RequestFailure::Timeout)));
        let mut dashboard = Dashboard::new(api, 50);

        dashboard.run_pipeline().await;
        assert_eq!(dashboard.state().message, "request timed out");
        assert!(!dashboard.state().loading);
    }

    #[tokio::test]
    async fn nested_refresh_failure_keeps_completed_message() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = loaded_dashboard(api.clone()).await;
        let before = dashboard.state().clone();
        api.set_trigger(Ok(PipelineRunResult { rows: 7 }));
        api.set_stats(Err(fetch_failure()));

        let outcome = dashboard.run_pipeline().await;

        assert_eq!(outcome, RunOutcome::Completed { rows: 7 });
        assert_eq!(dashboard.state().message, "Pipeline completed: 7 rows");
        assert!(!dashboard.state().loading);
        assert_eq!(dashboard.state().preview, before.preview);
        assert_eq!(dashboard.state().stats, before.stats);
    }

    #[tokio::test]
    async fn run_is_rejected_while_loading() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = Dashboard::new(api.clone(), 50);
        dashboard.state.loading = true;

        assert_eq!(dashboard.run_pipeline().await, RunOutcome::Rejected);
        assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 0);
        assert!(dashboard.state().loading);
    }

    #[tokio::test]
    async fn requested_refresh_is_ignored_while_loading() {
        let api = Arc::new(FakeApi::new());
        let mut dashboard = Dashboard::new(api.clone(), 50);
        dashboard.state.loading = true;

        dashboard.refresh_requested().await;
        assert_eq!(api.preview_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn download_never_mutates_state() {
        let api = Arc::new(FakeApi::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut dashboard = loaded_dashboard(api.clone()).await.with_events(tx);
        for loading in [false, true] {
            dashboard.state.loading = loading;
            let before = dashboard.state().clone();
            dashboard.request_download();
            assert_eq!(dashboard.state(), &before);
        }
        assert_eq!(api.download_calls.load(Ordering::SeqCst), 2);
        assert!(drain(&mut rx).is_empty());
    }
}
