//! The create/edit drop modal.
//!
//! One `DropEditor` lives for the whole run and is reused for every open.
//! Each open bumps `serial`; background results carry the serial they were
//! started under and are dropped if the modal has since been closed or
//! reopened.

use tokio::sync::oneshot;

use super::catalog::{CatalogLoader, CatalogState};
use super::targets::TargetSet;
use super::take_ready;
use crate::api::{DropletClient, DropletError};
use crate::format::{date_input_value, parse_date_input};
use crate::models::{DropPayload, DropRecord, TargetCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit,
}

/// Which drop the modal is working on. Neutral (`mode == None`) while closed,
/// while loading, and after a failed load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditorSession {
    pub mode: Option<EditorMode>,
    pub editing_drop_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorPhase {
    #[default]
    Closed,
    Loading,
    Open,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Title,
    Content,
    PostDate,
    ExpireDate,
    Category,
    Name,
    Targets,
}

impl Field {
    pub const ORDER: [Field; 7] = [
        Field::Title,
        Field::Content,
        Field::PostDate,
        Field::ExpireDate,
        Field::Category,
        Field::Name,
        Field::Targets,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Content => "Content",
            Self::PostDate => "Post date",
            Self::ExpireDate => "Expire date",
            Self::Category => "Target type",
            Self::Name => "Target",
            Self::Targets => "Targets",
        }
    }

    pub fn next(self) -> Field {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Field {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            Self::Title | Self::Content | Self::PostDate | Self::ExpireDate
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A drop needs a title or some content.")]
    EmptyDrop,
    #[error("Post date: {0}")]
    PostDate(String),
    #[error("Expire date: {0}")]
    ExpireDate(String),
}

/// Reported to the app when a background result needs action outside the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    Saved(EditorMode),
    SessionExpired,
}

type LoadResult = (u64, String, Result<DropRecord, DropletError>);
type SubmitResult = (u64, Result<(), DropletError>);

#[derive(Debug, Default)]
pub struct DropEditor {
    pub phase: EditorPhase,
    pub session: EditorSession,
    serial: u64,

    pub title: String,
    pub content: String,
    pub post_date: String,
    pub expire_date: String,
    pub focus: Field,

    pub catalog: CatalogLoader,
    pub targets: TargetSet,
    pub target_cursor: usize,

    /// Inline error: validation, target add, or failed submit.
    pub error: Option<String>,
    /// Set when the edit fetch failed; the form has nothing to submit.
    pub load_error: Option<String>,

    load_rx: Option<oneshot::Receiver<LoadResult>>,
    submit_rx: Option<oneshot::Receiver<SubmitResult>>,
}

impl DropEditor {
    pub fn is_open(&self) -> bool {
        self.phase != EditorPhase::Closed
    }

    pub fn heading(&self) -> &'static str {
        match (self.phase, self.session.mode) {
            (EditorPhase::Loading, _) => "Loading Drop…",
            _ if self.load_error.is_some() => "Error Loading Drop",
            (_, Some(EditorMode::Edit)) => "Edit Drop",
            _ => "New Drop",
        }
    }

    pub fn can_submit(&self) -> bool {
        self.phase == EditorPhase::Open && self.session.mode.is_some()
    }

    /// Returns `false` if a modal is already up.
    pub fn open_for_create(&mut self) -> bool {
        if self.is_open() {
            return false;
        }
        self.reset_form();
        self.serial += 1;
        self.session = EditorSession {
            mode: Some(EditorMode::Create),
            editing_drop_id: None,
        };
        self.phase = EditorPhase::Open;
        true
    }

    pub fn open_for_edit(&mut self, drop_id: &str, client: &DropletClient) -> bool {
        if self.is_open() {
            return false;
        }
        self.reset_form();
        self.serial += 1;
        self.phase = EditorPhase::Loading;

        let serial = self.serial;
        let id = drop_id.to_string();
        let client = client.clone();
        let (tx, rx) = oneshot::channel();
        self.load_rx = Some(rx);
        tokio::spawn(async move {
            let result = client.get_drop(&id).await;
            let _ = tx.send((serial, id, result));
        });
        true
    }

    /// Unconditional: back to the neutral closed state from any phase.
    pub fn close(&mut self) {
        self.reset_form();
        self.session = EditorSession::default();
        self.phase = EditorPhase::Closed;
    }

    /// User-initiated close; ignored while a submit is in flight.
    pub fn request_close(&mut self) -> bool {
        if self.phase == EditorPhase::Submitting {
            return false;
        }
        self.close();
        true
    }

    fn reset_form(&mut self) {
        self.title.clear();
        self.content.clear();
        self.post_date.clear();
        self.expire_date.clear();
        self.focus = Field::Title;
        self.catalog.reset();
        self.targets.reset();
        self.target_cursor = 0;
        self.error = None;
        self.load_error = None;
        self.load_rx = None;
        self.submit_rx = None;
    }

    // ── Results ─────────────────────────────────────────────────────────

    pub fn poll(&mut self) -> Option<EditorEvent> {
        if let Some((serial, id, result)) = take_ready(&mut self.load_rx) {
            if let Some(event) = self.apply_loaded(serial, id, result) {
                return Some(event);
            }
        }
        if let Some((serial, result)) = take_ready(&mut self.submit_rx) {
            if let Some(event) = self.apply_submitted(serial, result) {
                return Some(event);
            }
        }
        if self.catalog.poll() {
            return Some(EditorEvent::SessionExpired);
        }
        None
    }

    pub(crate) fn apply_loaded(
        &mut self,
        serial: u64,
        drop_id: String,
        result: Result<DropRecord, DropletError>,
    ) -> Option<EditorEvent> {
        if serial != self.serial || self.phase != EditorPhase::Loading {
            return None;
        }
        match result {
            Ok(drop) => {
                self.title = drop.title.clone();
                self.content = drop.content.clone();
                self.post_date = date_input_value(drop.post_date);
                self.expire_date = date_input_value(drop.expire_date);
                self.targets.load_from(&drop);
                self.session = EditorSession {
                    mode: Some(EditorMode::Edit),
                    editing_drop_id: Some(drop_id),
                };
                self.phase = EditorPhase::Open;
                None
            }
            Err(DropletError::SessionExpired) => Some(EditorEvent::SessionExpired),
            Err(e) => {
                tracing::warn!(%drop_id, "failed to load drop: {e}");
                self.load_error = Some(e.to_string());
                self.phase = EditorPhase::Open;
                None
            }
        }
    }

    pub(crate) fn apply_submitted(
        &mut self,
        serial: u64,
        result: Result<(), DropletError>,
    ) -> Option<EditorEvent> {
        if serial != self.serial || self.phase != EditorPhase::Submitting {
            return None;
        }
        match result {
            Ok(()) => {
                let mode = self.session.mode.unwrap_or(EditorMode::Create);
                self.close();
                Some(EditorEvent::Saved(mode))
            }
            Err(DropletError::SessionExpired) => Some(EditorEvent::SessionExpired),
            Err(e) => {
                self.error = Some(e.to_string());
                self.phase = EditorPhase::Open;
                None
            }
        }
    }

    // ── Submit ──────────────────────────────────────────────────────────

    pub fn build_payload(&self) -> Result<DropPayload, ValidationError> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() && content.is_empty() {
            return Err(ValidationError::EmptyDrop);
        }
        let post_date = parse_date_input(&self.post_date).map_err(ValidationError::PostDate)?;
        let expire_date =
            parse_date_input(&self.expire_date).map_err(ValidationError::ExpireDate)?;

        Ok(DropPayload {
            title: title.to_string(),
            content: content.to_string(),
            targets: self.targets.payload(),
            post_date,
            expire_date,
        })
    }

    /// Returns `true` when a request was started.
    pub fn submit(&mut self, client: &DropletClient) -> bool {
        if !self.can_submit() {
            return false;
        }
        let payload = match self.build_payload() {
            Ok(p) => p,
            Err(e) => {
                self.error = Some(e.to_string());
                return false;
            }
        };
        let target = match (self.session.mode, self.session.editing_drop_id.clone()) {
            (Some(EditorMode::Edit), Some(id)) => Some(id),
            (Some(EditorMode::Create), _) => None,
            _ => return false,
        };

        self.error = None;
        self.phase = EditorPhase::Submitting;
        let serial = self.serial;
        let client = client.clone();
        let (tx, rx) = oneshot::channel();
        self.submit_rx = Some(rx);
        tokio::spawn(async move {
            let result = match target {
                Some(id) => client.update_drop(&id, &payload).await,
                None => client.create_drop(&payload).await,
            };
            let _ = tx.send((serial, result));
        });
        true
    }

    // ── Form input ──────────────────────────────────────────────────────

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Title => Some(&mut self.title),
            Field::Content => Some(&mut self.content),
            Field::PostDate => Some(&mut self.post_date),
            Field::ExpireDate => Some(&mut self.expire_date),
            _ => None,
        }
    }

    pub fn input_char(&mut self, ch: char) {
        if self.phase != EditorPhase::Open {
            return;
        }
        if let Some(buf) = self.text_field_mut() {
            buf.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.phase != EditorPhase::Open {
            return;
        }
        if let Some(buf) = self.text_field_mut() {
            buf.pop();
        }
    }

    /// Newlines only go into the content body.
    pub fn newline(&mut self) {
        if self.phase == EditorPhase::Open && self.focus == Field::Content {
            self.content.push('\n');
        }
    }

    /// Step the category selector through "none" and each category.
    pub fn cycle_category(&mut self, forward: bool, client: &DropletClient) {
        if self.phase != EditorPhase::Open {
            return;
        }
        let choices: Vec<Option<TargetCategory>> = std::iter::once(None)
            .chain(TargetCategory::ALL.into_iter().map(Some))
            .collect();
        let current = choices
            .iter()
            .position(|c| *c == self.catalog.category())
            .unwrap_or(0);
        let len = choices.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.error = None;
        self.catalog.select_category(choices[next], client);
    }

    pub fn cycle_name(&mut self, forward: bool) {
        if forward {
            self.catalog.select_next();
        } else {
            self.catalog.select_prev();
        }
    }

    pub fn add_selected_target(&mut self) {
        if self.phase != EditorPhase::Open || self.catalog.state == CatalogState::Loading {
            return;
        }
        let category = self.catalog.category();
        let (id, name) = match self.catalog.selected() {
            Some(opt) if category != Some(TargetCategory::General) => {
                (Some(opt.id), opt.label.clone())
            }
            Some(opt) => (Some(opt.id), String::new()),
            None => (None, String::new()),
        };
        match self.targets.add(category, id, &name) {
            Ok(()) => {
                self.error = None;
                self.target_cursor = self.targets.len() - 1;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn remove_selected_target(&mut self) {
        if self.phase != EditorPhase::Open {
            return;
        }
        match self.targets.remove_at(self.target_cursor) {
            Ok(_) => {
                if self.target_cursor >= self.targets.len() && self.target_cursor > 0 {
                    self.target_cursor -= 1;
                }
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn target_cursor_next(&mut self) {
        if self.target_cursor + 1 < self.targets.len() {
            self.target_cursor += 1;
        }
    }

    pub fn target_cursor_prev(&mut self) {
        self.target_cursor = self.target_cursor.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    fn client() -> DropletClient {
        DropletClient::new("http://127.0.0.1:9").unwrap()
    }

    fn sample_drop() -> DropRecord {
        serde_json::from_value(json!({
            "id": "d7",
            "user_id": "u1",
            "title": "Sports day",
            "content": "Bring water",
            "post_date": "2026-10-20T00:00:00Z",
            "expire_date": "0001-01-01T00:00:00Z",
            "targets": [
                {"type": "YearGroup", "id": 4, "name": "Year 4"},
                {"type": "General", "id": 0}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn create_starts_empty_with_distinct_heading() {
        let mut ed = DropEditor::default();
        ed.targets.add(Some(TargetCategory::Class), Some(1), "leftover").unwrap();
        ed.title = "leftover".into();
        ed.catalog.select_category(Some(TargetCategory::General), &client());
        assert!(ed.catalog.is_enabled());

        assert!(ed.open_for_create());
        assert!(ed.targets.is_empty());
        assert!(ed.title.is_empty());
        assert_eq!(ed.catalog.category(), None);
        assert_eq!(ed.catalog.state, CatalogState::Idle);
        assert_eq!(ed.heading(), "New Drop");
        assert_eq!(ed.session.mode, Some(EditorMode::Create));
        assert!(ed.session.editing_drop_id.is_none());
        assert!(!ed.open_for_create(), "second open must be refused");
    }

    #[tokio::test]
    async fn edit_seeds_form_from_fetched_drop() {
        let mut ed = DropEditor::default();
        assert!(ed.open_for_edit("d7", &client()));
        assert_eq!(ed.heading(), "Loading Drop…");
        assert!(!ed.can_submit());

        let serial = ed.serial;
        assert!(ed.apply_loaded(serial, "d7".into(), Ok(sample_drop())).is_none());
        assert_eq!(ed.heading(), "Edit Drop");
        assert_eq!(ed.post_date, "2026-10-20");
        assert_eq!(ed.expire_date, "");
        assert_eq!(ed.session.editing_drop_id.as_deref(), Some("d7"));

        let got: HashSet<_> = ed.targets.entries().iter().map(|t| t.identity()).collect();
        let want: HashSet<_> = sample_drop()
            .targets
            .iter()
            .map(|t| (t.category, t.id))
            .collect();
        assert_eq!(got, want);
        assert_ne!(ed.heading(), "New Drop");
    }

    #[tokio::test]
    async fn failed_load_stays_open_and_blocks_submit() {
        let mut ed = DropEditor::default();
        ed.open_for_edit("gone", &client());
        let serial = ed.serial;
        ed.apply_loaded(
            serial,
            "gone".into(),
            Err(DropletError::NotFound { message: "Drop not found".into() }),
        );
        assert!(ed.is_open());
        assert_eq!(ed.heading(), "Error Loading Drop");
        assert_eq!(ed.load_error.as_deref(), Some("Not found: Drop not found"));
        assert!(!ed.can_submit());
        assert!(!ed.submit(&client()));

        ed.close();
        assert_eq!(ed.session, EditorSession::default());
        assert_eq!(ed.phase, EditorPhase::Closed);
        assert!(ed.load_error.is_none());
    }

    #[tokio::test]
    async fn results_from_closed_session_are_ignored() {
        let mut ed = DropEditor::default();
        ed.open_for_edit("d7", &client());
        let old = ed.serial;
        ed.close();
        ed.open_for_create();

        assert!(ed.apply_loaded(old, "d7".into(), Ok(sample_drop())).is_none());
        assert_eq!(ed.session.mode, Some(EditorMode::Create));
        assert!(ed.targets.is_empty());
        assert_eq!(ed.heading(), "New Drop");
    }

    #[test]
    fn empty_drop_is_rejected_locally() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "   ".into();
        assert!(!ed.submit(&client()));
        assert_eq!(ed.phase, EditorPhase::Open);
        assert_eq!(ed.error.as_deref(), Some("A drop needs a title or some content."));
        assert!(ed.submit_rx.is_none());
    }

    #[test]
    fn bad_date_is_rejected_locally() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "Trip".into();
        ed.expire_date = "next week".into();
        assert!(matches!(ed.build_payload(), Err(ValidationError::ExpireDate(_))));
        assert!(!ed.submit(&client()));
    }

    #[test]
    fn payload_omits_empty_dates_and_carries_targets() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.content = "Body only".into();
        ed.post_date = "2026-11-01".into();
        ed.targets.add(Some(TargetCategory::Division), Some(1), "North").unwrap();

        let payload = ed.build_payload().unwrap();
        assert_eq!(payload.title, "");
        assert_eq!(payload.post_date.as_deref(), Some("2026-11-01"));
        assert!(payload.expire_date.is_none());
        assert_eq!(payload.targets.len(), 1);
    }

    #[tokio::test]
    async fn submit_success_closes_and_reports_mode() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "Hello".into();
        assert!(ed.submit(&client()));
        assert_eq!(ed.phase, EditorPhase::Submitting);
        assert!(!ed.request_close(), "close is ignored while submitting");

        let serial = ed.serial;
        let event = ed.apply_submitted(serial, Ok(()));
        assert_eq!(event, Some(EditorEvent::Saved(EditorMode::Create)));
        assert_eq!(ed.phase, EditorPhase::Closed);
        assert_eq!(ed.session, EditorSession::default());
    }

    #[tokio::test]
    async fn submit_failure_keeps_modal_open_with_server_text() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "Hello".into();
        ed.submit(&client());
        let serial = ed.serial;
        let event = ed.apply_submitted(
            serial,
            Err(DropletError::Api { status: 400, message: "Title too long".into() }),
        );
        assert!(event.is_none());
        assert_eq!(ed.phase, EditorPhase::Open);
        assert_eq!(ed.error.as_deref(), Some("Title too long"));
        assert_eq!(ed.title, "Hello");
        assert_eq!(ed.session.mode, Some(EditorMode::Create));
    }

    #[tokio::test]
    async fn unanswered_submit_returns_to_form_with_error() {
        let url = crate::api::silent_server_url().await;
        let client = DropletClient::with_timeout(&url, Duration::from_millis(200)).unwrap();

        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "Draft".into();
        assert!(ed.submit(&client));
        assert!(!ed.request_close());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while ed.phase == EditorPhase::Submitting && tokio::time::Instant::now() < deadline {
            assert!(ed.poll().is_none());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(ed.phase, EditorPhase::Open);
        assert!(ed.error.is_some());
        assert_eq!(ed.title, "Draft");
        assert!(ed.can_submit());
    }

    #[tokio::test]
    async fn expired_session_during_submit_is_escalated() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.title = "Hello".into();
        ed.submit(&client());
        let serial = ed.serial;
        assert_eq!(
            ed.apply_submitted(serial, Err(DropletError::SessionExpired)),
            Some(EditorEvent::SessionExpired)
        );
    }

    #[test]
    fn adding_general_and_duplicate_targets() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.focus = Field::Category;
        // None -> General
        ed.cycle_category(true, &client());
        assert_eq!(ed.catalog.category(), Some(TargetCategory::General));

        ed.add_selected_target();
        assert_eq!(ed.targets.len(), 1);
        assert_eq!(ed.targets.entries()[0].display_name, "General");

        ed.add_selected_target();
        assert_eq!(ed.targets.len(), 1);
        assert_eq!(ed.error.as_deref(), Some("General is already added."));
    }

    #[test]
    fn add_without_category_reports_error() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.add_selected_target();
        assert_eq!(ed.error.as_deref(), Some("Select a target type first."));
    }

    #[test]
    fn removing_last_row_moves_cursor_up() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.targets.add(Some(TargetCategory::Class), Some(1), "1A").unwrap();
        ed.targets.add(Some(TargetCategory::Class), Some(2), "2A").unwrap();
        ed.target_cursor = 1;
        ed.remove_selected_target();
        assert_eq!(ed.target_cursor, 0);
        assert_eq!(ed.targets.len(), 1);
        ed.remove_selected_target();
        assert!(ed.targets.is_empty());
        ed.remove_selected_target();
        assert_eq!(ed.error.as_deref(), Some("No target at position 0."));
    }

    #[test]
    fn text_input_goes_to_focused_field() {
        let mut ed = DropEditor::default();
        ed.open_for_create();
        ed.input_char('H');
        ed.input_char('i');
        ed.newline();
        ed.focus = ed.focus.next();
        ed.input_char('x');
        ed.newline();
        ed.input_char('y');
        ed.backspace();
        assert_eq!(ed.title, "Hi");
        assert_eq!(ed.content, "x\n");
        assert_eq!(Field::Title.prev(), Field::Targets);
    }
}
