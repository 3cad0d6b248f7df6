use tokio::sync::oneshot;

use super::view::View;
use super::{take_ready, ListState};
use crate::api::{DropletClient, DropletError};
use crate::format::{format_date, format_timestamp, sanitize, single_line};
use crate::models::{DropRecord, TargetCategory, UserInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Loaded,
    Failed(String),
}

type ListResult = (u64, View, Result<Vec<DropRecord>, DropletError>);

/// Drops for the active view. Every refresh is tagged with a fresh sequence
/// number and only the newest request may populate the list.
pub struct DropList {
    pub drops: Vec<DropRecord>,
    pub status: ListStatus,
    pub state: ListState,
    shown: View,
    seq: u64,
    rx: Option<oneshot::Receiver<ListResult>>,
}

impl Default for DropList {
    fn default() -> Self {
        Self {
            drops: Vec::new(),
            status: ListStatus::Loading,
            state: ListState::new(),
            shown: View::default(),
            seq: 0,
            rx: None,
        }
    }
}

pub enum ListOutcome {
    Loaded(usize),
    Failed(String),
    SessionExpired,
}

impl DropList {
    #[cfg(test)]
    pub(crate) fn loaded(view: View, drops: Vec<DropRecord>) -> Self {
        let mut list = Self::default();
        let seq = list.begin(view);
        list.apply(seq, view, Ok(drops));
        list
    }

    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    pub fn selected_drop(&self) -> Option<&DropRecord> {
        if self.status != ListStatus::Loaded {
            return None;
        }
        self.drops.get(self.state.selected)
    }

    /// Clear the list, show the loading placeholder and fetch `view`.
    pub fn refresh(&mut self, client: &DropletClient, view: View) {
        let seq = self.begin(view);
        let client = client.clone();
        let (tx, rx) = oneshot::channel();
        self.rx = Some(rx);
        tokio::spawn(async move {
            let result = match view {
                View::Mine => client.list_my_drops().await,
                View::All => client.list_all_drops().await,
            };
            let _ = tx.send((seq, view, result));
        });
    }

    fn begin(&mut self, view: View) -> u64 {
        self.seq += 1;
        self.shown = view;
        self.drops.clear();
        self.state.set_len(0);
        self.state.selected = 0;
        self.status = ListStatus::Loading;
        self.seq
    }

    pub fn poll(&mut self) -> Option<ListOutcome> {
        let (seq, view, result) = take_ready(&mut self.rx)?;
        self.apply(seq, view, result)
    }

    /// Returns `None` for a superseded response.
    pub(crate) fn apply(
        &mut self,
        seq: u64,
        view: View,
        result: Result<Vec<DropRecord>, DropletError>,
    ) -> Option<ListOutcome> {
        if seq != self.seq || view != self.shown {
            tracing::debug!(seq, current = self.seq, "discarding stale drop list");
            return None;
        }
        match result {
            Ok(drops) => {
                let count = drops.len();
                self.state.set_len(count);
                self.drops = drops;
                self.status = ListStatus::Loaded;
                Some(ListOutcome::Loaded(count))
            }
            Err(DropletError::SessionExpired) => {
                self.status = ListStatus::Failed(DropletError::SessionExpired.to_string());
                Some(ListOutcome::SessionExpired)
            }
            Err(e) => {
                let message = format!("Failed to load {} drops: {e}", view.noun());
                tracing::warn!("{message}");
                self.status = ListStatus::Failed(message.clone());
                Some(ListOutcome::Failed(message))
            }
        }
    }

    pub fn view_model(&self, user: &UserInfo) -> DropListView {
        let body = match &self.status {
            ListStatus::Loading => ListBody::Loading,
            ListStatus::Failed(_) => {
                ListBody::Error(format!("Could not load {} drops.", self.shown.noun()))
            }
            ListStatus::Loaded if self.drops.is_empty() => {
                ListBody::Empty(self.shown.empty_message())
            }
            ListStatus::Loaded => {
                ListBody::Entries(self.drops.iter().map(|d| entry_view(d, user)).collect())
            }
        };
        DropListView {
            heading: self.shown.heading(),
            body,
        }
    }
}

// ─── View model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropListView {
    pub heading: &'static str,
    pub body: ListBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListBody {
    Loading,
    Error(String),
    Empty(&'static str),
    Entries(Vec<DropEntryView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub category: TargetCategory,
    pub label: String,
}

/// Everything the painter needs for one drop. All text is already
/// sanitized for the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEntryView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub posted: String,
    pub expires: String,
    pub badges: Vec<Badge>,
    pub can_manage: bool,
    /// Authorship detail: author, editor and timestamps.
    pub tooltip: String,
}

pub fn entry_view(drop: &DropRecord, user: &UserInfo) -> DropEntryView {
    let title = single_line(drop.title.trim());
    let title = if title.is_empty() {
        "Untitled Drop".to_string()
    } else {
        title
    };

    let badges = drop
        .targets
        .iter()
        .map(|t| Badge {
            category: t.category,
            label: t
                .name
                .as_deref()
                .map(single_line)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| t.category.label().to_string()),
        })
        .collect();

    DropEntryView {
        id: drop.id.clone(),
        title,
        content: sanitize(&drop.content),
        posted: format_date(drop.post_date, "N/A"),
        expires: format_date(drop.expire_date, "Never"),
        badges,
        can_manage: user.can_manage(drop),
        tooltip: tooltip(drop),
    }
}

fn tooltip(drop: &DropRecord) -> String {
    let person = |name: &Option<String>| {
        name.as_deref()
            .map(single_line)
            .filter(|n| !n.trim().is_empty())
    };

    let mut parts = vec![format!(
        "Author: {}",
        person(&drop.author_name).unwrap_or_else(|| "Unknown".into())
    )];
    if let Some(created) = format_timestamp(drop.created_at) {
        parts.push(format!("Created: {created}"));
    }
    if let Some(editor) = person(&drop.editor_name) {
        parts.push(format!("Last edited by: {editor}"));
        if let Some(updated) = format_timestamp(drop.updated_at) {
            parts.push(format!("Updated: {updated}"));
        }
    }
    parts.join(" · ")
}
