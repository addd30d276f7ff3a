//! Command loop around the dashboard.
//!
//! Receives UI commands, drives the dashboard workflows and keeps listening
//! while one is in flight so downloads and quit stay responsive.

use super::dashboard::Dashboard;
use crate::api::DashboardApi;
use crate::model::{DashboardConfig, DashboardEvent};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    RunPipeline,
    Refresh,
    Download,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    /// Keep serving; the command, if any, was held back while busy.
    Continue(Option<UiCommand>),
    Quit,
}

/// What `drive` is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Busy {
    Run,
    Refresh,
}

/// Own the dashboard for the session and serve UI commands until quit.
pub(crate) async fn run_controller<A: DashboardApi>(
    api: Arc<A>,
    cfg: &DashboardConfig,
    event_tx: UnboundedSender<DashboardEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut dashboard = Dashboard::new(api.clone(), cfg.preview_limit).with_events(event_tx);
    dashboard.publish();

    let mut pending = None;
    if cfg.refresh_on_launch {
        match drive(dashboard.initial_refresh(), Busy::Refresh, api.as_ref(), &mut cmd_rx).await {
            Flow::Continue(next) => pending = next,
            Flow::Quit => return Ok(()),
        }
    }

    loop {
        let cmd = match pending.take() {
            Some(cmd) => cmd,
            None => match cmd_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };
        tracing::debug!(?cmd, "command received");
        let flow = match cmd {
            UiCommand::RunPipeline => {
                let run = async {
                    let outcome = dashboard.run_pipeline().await;
                    tracing::info!(?outcome, "pipeline workflow settled");
                };
                drive(run, Busy::Run, api.as_ref(), &mut cmd_rx).await
            }
            UiCommand::Refresh => {
                drive(dashboard.refresh_requested(), Busy::Refresh, api.as_ref(), &mut cmd_rx).await
            }
            UiCommand::Download => {
                dashboard.request_download();
                Flow::Continue(None)
            }
            UiCommand::Quit => Flow::Quit,
        };
        match flow {
            Flow::Continue(next) => pending = next,
            Flow::Quit => break,
        }
    }

    Ok(())
}

/// Await `work` while still serving commands that do not need the dashboard.
///
/// While a run is in flight, run and refresh requests are dropped. While a
/// refresh is in flight the latest one is held and handed back once it
/// settles, except that a held run is never replaced by a refresh. Quit (or a
/// closed command channel) abandons `work`.
async fn drive<A: DashboardApi, F: Future<Output = ()>>(
    work: F,
    busy: Busy,
    api: &A,
    cmd_rx: &mut UnboundedReceiver<UiCommand>,
) -> Flow {
    tokio::pin!(work);
    let mut held = None;
    loop {
        tokio::select! {
            _ = &mut work => return Flow::Continue(held),
            cmd = cmd_rx.recv() => match cmd {
                Some(UiCommand::Download) => api.request_download(),
                Some(cmd @ (UiCommand::RunPipeline | UiCommand::Refresh)) => {
                    if busy == Busy::Run {
                        tracing::info!(?cmd, "ignored: the pipeline is running");
                    } else if held != Some(UiCommand::RunPipeline) {
                        tracing::debug!(?cmd, "held until the refresh settles");
                        held = Some(cmd);
                    }
                }
                Some(UiCommand::Quit) | None => return Flow::Quit,
            },
        }
    }
}
