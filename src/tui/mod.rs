pub mod catalog;
pub mod drop_list;
pub mod editor;
pub mod event;
pub mod targets;
pub mod ui;
pub mod view;

use crate::api::{DropletClient, DropletError};
use crate::models::UserInfo;
use drop_list::{DropList, ListOutcome};
use editor::{DropEditor, EditorEvent, EditorMode};
use ratatui::widgets::ListState as RListState;
use tokio::sync::oneshot;
use view::{View, ViewController};

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Everything the list screen can be asked to do. Keys map onto these in
/// `event`; `App::dispatch` is the only place they take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ShowView(View),
    ToggleView,
    Refresh,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    NewDrop,
    EditSelected,
    DeleteSelected,
    ConfirmDelete,
    CancelDelete,
    Logout,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    LoggedOut,
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDrop {
    pub drop_id: String,
    pub title: String,
}

// ─── List selection ──────────────────────────────────────────────────────────

/// Tracks logical selection plus a persistent ratatui scroll offset.
///
/// `inner` carries the ratatui scroll offset; the painter syncs
/// `inner.selected` before calling `render_stateful_widget`, so ratatui
/// adjusts the offset only when the cursor reaches a viewport edge.
pub struct ListState {
    pub inner: RListState,
    pub selected: usize,
    pub len: usize,
}

impl ListState {
    pub fn new() -> Self {
        let mut inner = RListState::default();
        inner.select(Some(0));
        Self { inner, selected: 0, len: 0 }
    }

    /// Move down, clamped at the last item.
    pub fn select_next(&mut self) {
        if self.len > 0 && self.selected + 1 < self.len {
            self.selected += 1;
        }
    }

    /// Move up, clamped at the first item.
    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_last(&mut self) {
        self.selected = self.len.saturating_sub(1);
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.selected >= len && len > 0 {
            self.selected = len - 1;
        }
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking read of a background result. The slot is cleared once the
/// task has reported or gone away.
pub(crate) fn take_ready<T>(slot: &mut Option<oneshot::Receiver<T>>) -> Option<T> {
    let rx = slot.as_mut()?;
    match rx.try_recv() {
        Ok(value) => {
            *slot = None;
            Some(value)
        }
        Err(oneshot::error::TryRecvError::Empty) => None,
        Err(oneshot::error::TryRecvError::Closed) => {
            *slot = None;
            None
        }
    }
}

// ─── App State ──────────────────────────────────────────────────────────────

pub struct App {
    pub client: DropletClient,
    pub user: UserInfo,
    pub running: bool,
    pub exit_reason: ExitReason,

    pub views: ViewController,
    pub list: DropList,
    pub editor: DropEditor,

    pub confirm_delete: Option<SelectedDrop>,
    delete_rx: Option<oneshot::Receiver<Result<(), DropletError>>>,

    // Status
    pub status_message: String,
    pub error_message: Option<String>,

    /// Set by the event handler; consumed by the main loop to launch $EDITOR
    /// for the content field.
    pub launch_editor: bool,

    // Incremented each frame; used to drive the loading spinner.
    pub frame_count: u64,
}

impl App {
    pub fn new(client: DropletClient, user: UserInfo) -> Self {
        let status_message = format!("Signed in as {}.", display_user(&user));
        Self {
            client,
            user,
            running: true,
            exit_reason: ExitReason::Quit,
            views: ViewController::default(),
            list: DropList::default(),
            editor: DropEditor::default(),
            confirm_delete: None,
            delete_rx: None,
            status_message,
            error_message: None,
            launch_editor: false,
            frame_count: 0,
        }
    }

    pub fn is_deleting(&self) -> bool {
        self.delete_rx.is_some()
    }

    /// Whether list-level triggers are currently accepted.
    fn list_triggers_enabled(&self) -> bool {
        !self.editor.is_open() && self.confirm_delete.is_none()
    }

    pub fn refresh(&mut self) {
        self.error_message = None;
        self.list.refresh(&self.client, self.views.active());
    }

    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => self.exit(ExitReason::Quit),
            Action::ConfirmDelete => self.confirm_pending_delete(),
            Action::CancelDelete => {
                if self.confirm_delete.take().is_some() {
                    self.status_message = "Delete cancelled.".into();
                }
            }
            _ if !self.list_triggers_enabled() => {}
            Action::ShowView(view) => self.show_view(view),
            Action::ToggleView => {
                let next = match self.views.active() {
                    View::Mine => View::All,
                    View::All => View::Mine,
                };
                self.show_view(next);
            }
            Action::Refresh => {
                if !self.list.is_loading() {
                    self.refresh();
                }
            }
            Action::SelectNext => self.list.state.select_next(),
            Action::SelectPrev => self.list.state.select_prev(),
            Action::SelectFirst => self.list.state.selected = 0,
            Action::SelectLast => self.list.state.select_last(),
            Action::NewDrop => {
                if self.editor.open_for_create() {
                    self.error_message = None;
                }
            }
            Action::EditSelected => {
                let Some(id) = self.manageable_selection().map(|d| d.drop_id) else {
                    return;
                };
                if self.editor.open_for_edit(&id, &self.client) {
                    self.error_message = None;
                }
            }
            Action::DeleteSelected => {
                if self.is_deleting() {
                    return;
                }
                self.confirm_delete = self.manageable_selection();
            }
            Action::Logout => self.exit(ExitReason::LoggedOut),
        }
    }

    fn show_view(&mut self, view: View) {
        if self.views.set_active_view(view) {
            self.refresh();
        }
    }

    /// The selected drop, if the current user may edit or delete it.
    fn manageable_selection(&mut self) -> Option<SelectedDrop> {
        let drop = self.list.selected_drop()?;
        if !self.user.can_manage(drop) {
            self.status_message = "You can only change your own drops.".into();
            return None;
        }
        Some(SelectedDrop {
            drop_id: drop.id.clone(),
            title: drop.title.clone(),
        })
    }

    fn confirm_pending_delete(&mut self) {
        let Some(pending) = self.confirm_delete.take() else {
            return;
        };
        let client = self.client.clone();
        let (tx, rx) = oneshot::channel();
        self.delete_rx = Some(rx);
        self.status_message = "Deleting…".into();
        tokio::spawn(async move {
            let result = client.delete_drop(&pending.drop_id).await;
            let _ = tx.send(result);
        });
    }

    fn apply_delete_result(&mut self, result: Result<(), DropletError>) {
        match result {
            Ok(()) => {
                self.status_message = "Drop deleted.".into();
                self.refresh();
            }
            Err(DropletError::SessionExpired) => self.end_session(),
            Err(DropletError::Forbidden { .. }) => {
                self.error_message =
                    Some("You do not have permission to delete this drop.".into());
            }
            Err(e) => {
                tracing::warn!("delete failed: {e}");
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Drain every finished background task without blocking.
    pub fn poll_tasks(&mut self) {
        if let Some(outcome) = self.list.poll() {
            match outcome {
                ListOutcome::Loaded(count) => {
                    self.status_message = format!(
                        "{count} drop{} loaded.",
                        if count == 1 { "" } else { "s" }
                    );
                }
                ListOutcome::Failed(message) => self.error_message = Some(message),
                ListOutcome::SessionExpired => self.end_session(),
            }
        }

        if let Some(event) = self.editor.poll() {
            match event {
                EditorEvent::Saved(mode) => {
                    self.status_message = match mode {
                        EditorMode::Create => "Drop created.".into(),
                        EditorMode::Edit => "Drop updated.".into(),
                    };
                    self.refresh();
                }
                EditorEvent::SessionExpired => self.end_session(),
            }
        }

        if let Some(result) = take_ready(&mut self.delete_rx) {
            self.apply_delete_result(result);
        }
    }

    /// 401 anywhere: drop all modal state and leave. The caller clears the
    /// stored session.
    pub fn end_session(&mut self) {
        tracing::info!("session expired");
        self.editor.close();
        self.confirm_delete = None;
        self.exit(ExitReason::SessionExpired);
    }

    fn exit(&mut self, reason: ExitReason) {
        self.exit_reason = reason;
        self.running = false;
    }
}

pub fn display_user(user: &UserInfo) -> String {
    let who = if user.email.is_empty() {
        user.id.as_str()
    } else {
        user.email.as_str()
    };
    if user.is_admin() {
        format!("{who} (admin)")
    } else {
        who.to_string()
    }
}
