use crate::model::{DashboardEvent, DashboardState};
use crate::orchestrator::UiCommand;
use crossterm::event::{KeyCode, KeyModifiers};

pub const TAB_PREVIEW: usize = 0;
pub const TAB_DISTRIBUTIONS: usize = 1;
pub const TAB_COUNT: usize = 2;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Presentation state of the UI thread.
///
/// `dashboard` is the latest snapshot from the controller and is never
/// mutated here; everything else is view-local.
pub struct UiState {
    pub tab: usize,
    pub show_help: bool,
    pub dashboard: DashboardState,
    pub selected: usize,
    /// Note about the last UI action, cleared by the next snapshot.
    pub notice: Option<String>,
    pub base_url: String,
    pub log_path: Option<String>,
    pub spinner_frame: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_PREVIEW,
            show_help: false,
            dashboard: DashboardState::default(),
            selected: 0,
            notice: None,
            base_url: String::new(),
            log_path: None,
            spinner_frame: 0,
        }
    }
}

/// What a key press asks the event loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Send(UiCommand),
    Quit,
}

impl UiState {
    pub fn apply_event(&mut self, ev: DashboardEvent) {
        match ev {
            DashboardEvent::State(snapshot) => {
                self.notice = None;
                self.dashboard = *snapshot;
                let len = self.dashboard.preview_len();
                if self.selected >= len {
                    self.selected = len.saturating_sub(1);
                }
            }
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    pub fn handle_key(&mut self, modifiers: KeyModifiers, code: KeyCode) -> KeyAction {
        match (modifiers, code) {
            (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyAction::Quit,
            (_, KeyCode::Esc) if self.show_help => {
                self.show_help = false;
                KeyAction::None
            }
            (_, KeyCode::Char('?')) => {
                self.show_help = !self.show_help;
                KeyAction::None
            }
            (_, KeyCode::Char('p')) => {
                // The trigger stays disabled for the whole run.
                if self.dashboard.loading {
                    self.notice = Some("Pipeline already running".into());
                    KeyAction::None
                } else {
                    KeyAction::Send(UiCommand::RunPipeline)
                }
            }
            (_, KeyCode::Char('r')) => {
                if self.dashboard.loading {
                    self.notice = Some("Refresh is disabled while the pipeline runs".into());
                    KeyAction::None
                } else {
                    self.notice = Some("Refreshing...".into());
                    KeyAction::Send(UiCommand::Refresh)
                }
            }
            (_, KeyCode::Char('d')) => {
                self.notice = Some(format!("Download opened: {}/download", self.base_url));
                KeyAction::Send(UiCommand::Download)
            }
            (_, KeyCode::Tab) => {
                self.tab = (self.tab + 1) % TAB_COUNT;
                KeyAction::None
            }
            (_, KeyCode::BackTab) => {
                self.tab = (self.tab + TAB_COUNT - 1) % TAB_COUNT;
                KeyAction::None
            }
            (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                self.selected = self.selected.saturating_sub(1);
                KeyAction::None
            }
            (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                if self.selected + 1 < self.dashboard.preview_len() {
                    self.selected += 1;
                }
                KeyAction::None
            }
            (_, KeyCode::Home) | (_, KeyCode::Char('g')) => {
                self.selected = 0;
                KeyAction::None
            }
            (_, KeyCode::End) | (_, KeyCode::Char('G')) => {
                self.selected = self.dashboard.preview_len().saturating_sub(1);
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PreviewResponse, RUNNING_MESSAGE};

    fn press(state: &mut UiState, code: KeyCode) -> KeyAction {
        state.handle_key(KeyModifiers::NONE, code)
    }

    fn snapshot(loading: bool, rows: usize) -> DashboardEvent {
        let mut s = DashboardState {
            loading,
            ..Default::default()
        };
        let body = format!(
            r#"{{"preview":[{}]}}"#,
            vec![r#"{"code":"1"}"#; rows].join(",")
        );
        s.preview = serde_json::from_str::<PreviewResponse>(&body).unwrap().preview;
        if loading {
            s.message = RUNNING_MESSAGE.into();
        }
        DashboardEvent::State(Box::new(s))
    }

    #[test]
    fn run_and_refresh_are_disabled_while_loading() {
        let mut state = UiState::default();
        state.apply_event(snapshot(true, 0));

        assert_eq!(press(&mut state, KeyCode::Char('p')), KeyAction::None);
        assert_eq!(press(&mut state, KeyCode::Char('r')), KeyAction::None);
        assert_eq!(
            press(&mut state, KeyCode::Char('d')),
            KeyAction::Send(UiCommand::Download)
        );
    }

    #[test]
    fn run_is_sent_when_idle() {
        let mut state = UiState::default();
        assert_eq!(
            press(&mut state, KeyCode::Char('p')),
            KeyAction::Send(UiCommand::RunPipeline)
        );
        assert_eq!(
            press(&mut state, KeyCode::Char('r')),
            KeyAction::Send(UiCommand::Refresh)
        );
    }

    #[test]
    fn quit_keys() {
        let mut state = UiState::default();
        assert_eq!(press(&mut state, KeyCode::Char('q')), KeyAction::Quit);
        assert_eq!(
            state.handle_key(KeyModifiers::CONTROL, KeyCode::Char('c')),
            KeyAction::Quit
        );
    }

    #[test]
    fn selection_stays_within_preview() {
        let mut state = UiState::default();
        state.apply_event(snapshot(false, 3));

        press(&mut state, KeyCode::Char('G'));
        assert_eq!(state.selected, 2);
        press(&mut state, KeyCode::Down);
        assert_eq!(state.selected, 2);

        // A smaller refresh pulls the selection back in range.
        state.apply_event(snapshot(false, 1));
        assert_eq!(state.selected, 0);
        press(&mut state, KeyCode::Up);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn snapshot_clears_notice() {
        let mut state = UiState::default();
        assert_eq!(
            press(&mut state, KeyCode::Char('r')),
            KeyAction::Send(UiCommand::Refresh)
        );
        assert_eq!(state.notice.as_deref(), Some("Refreshing..."));
        state.apply_event(snapshot(false, 0));
        assert!(state.notice.is_none());
    }

    #[test]
    fn tab_cycles_views() {
        let mut state = UiState::default();
        press(&mut state, KeyCode::Tab);
        assert_eq!(state.tab, TAB_DISTRIBUTIONS);
        press(&mut state, KeyCode::Tab);
        assert_eq!(state.tab, TAB_PREVIEW);
        press(&mut state, KeyCode::BackTab);
        assert_eq!(state.tab, TAB_DISTRIBUTIONS);
    }
}
