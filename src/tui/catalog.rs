use tokio::sync::oneshot;

use super::take_ready;
use crate::api::{DropletClient, DropletError};
use crate::format::single_line;
use crate::models::{CatalogOption, TargetCategory};

pub const GENERAL_OPTION_LABEL: &str = "Everyone (not applicable)";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogState {
    /// No category chosen.
    #[default]
    Idle,
    Loading,
    Loaded(Vec<CatalogOption>),
    Empty,
    Failed(String),
}

type LookupResult = (TargetCategory, Result<Vec<serde_json::Value>, DropletError>);

/// Name options for the editor's target selector. At most one lookup is live;
/// a response for a category the user has since moved away from is dropped.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    category: Option<TargetCategory>,
    pub state: CatalogState,
    pub cursor: usize,
    rx: Option<oneshot::Receiver<LookupResult>>,
}

impl CatalogLoader {
    pub fn category(&self) -> Option<TargetCategory> {
        self.category
    }

    /// Whether the name selector accepts input.
    pub fn is_enabled(&self) -> bool {
        matches!(self.state, CatalogState::Loaded(_))
    }

    pub fn options(&self) -> &[CatalogOption] {
        match &self.state {
            CatalogState::Loaded(opts) => opts.as_slice(),
            _ => &[],
        }
    }

    pub fn selected(&self) -> Option<&CatalogOption> {
        self.options().get(self.cursor)
    }

    pub fn select_next(&mut self) {
        let len = self.options().len();
        if len > 0 {
            self.cursor = (self.cursor + 1) % len;
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.options().len();
        if len > 0 {
            self.cursor = (self.cursor + len - 1) % len;
        }
    }

    pub fn reset(&mut self) {
        self.category = None;
        self.state = CatalogState::Idle;
        self.cursor = 0;
        self.rx = None;
    }

    /// Switch category. `General` resolves synchronously to its single
    /// synthetic option; every other category starts a lookup.
    pub fn select_category(&mut self, category: Option<TargetCategory>, client: &DropletClient) {
        self.cursor = 0;
        self.category = category;
        self.rx = None;

        let Some(category) = category else {
            self.state = CatalogState::Idle;
            return;
        };
        if category == TargetCategory::General {
            self.state = CatalogState::Loaded(vec![general_option()]);
            return;
        }

        self.state = CatalogState::Loading;
        let client = client.clone();
        let (tx, rx) = oneshot::channel();
        self.rx = Some(rx);
        tokio::spawn(async move {
            let result = client.lookup_targets(category).await;
            let _ = tx.send((category, result));
        });
    }

    /// Apply a finished lookup if one is ready. Returns `true` when the
    /// lookup hit an expired session.
    pub fn poll(&mut self) -> bool {
        match take_ready(&mut self.rx) {
            Some((category, result)) => self.apply(category, result),
            None => false,
        }
    }

    pub(crate) fn apply(
        &mut self,
        category: TargetCategory,
        result: Result<Vec<serde_json::Value>, DropletError>,
    ) -> bool {
        if self.category != Some(category) {
            tracing::debug!(?category, "discarding stale lookup");
            return false;
        }
        self.cursor = 0;
        match result {
            Ok(items) => {
                let options = catalog_options(category, &items);
                self.state = if options.is_empty() {
                    CatalogState::Empty
                } else {
                    CatalogState::Loaded(options)
                };
                false
            }
            Err(e) => {
                tracing::warn!(?category, "target lookup failed: {e}");
                let expired = e.is_session_expired();
                self.state = CatalogState::Failed(format!(
                    "Could not load {} options: {e}",
                    category.label()
                ));
                expired
            }
        }
    }
}

pub fn general_option() -> CatalogOption {
    CatalogOption {
        id: 0,
        label: GENERAL_OPTION_LABEL.into(),
    }
}

/// Project raw lookup items into selector options. Items without an id are
/// skipped; items without a usable label fall back to `#<id>`.
pub fn catalog_options(category: TargetCategory, items: &[serde_json::Value]) -> Vec<CatalogOption> {
    if category == TargetCategory::General {
        return vec![general_option()];
    }
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(|v| v.as_u64())?;
            let label = category
                .project_label(item)
                .map(|l| single_line(&l))
                .unwrap_or_else(|| format!("#{id}"));
            Some(CatalogOption { id, label })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> DropletClient {
        DropletClient::new("http://127.0.0.1:9").unwrap()
    }

    #[test]
    fn general_is_synchronous_and_single() {
        let mut loader = CatalogLoader::default();
        loader.select_category(Some(TargetCategory::General), &client());
        assert!(loader.is_enabled());
        assert_eq!(loader.options(), &[general_option()]);
        assert_eq!(loader.selected().map(|o| o.id), Some(0));
    }

    #[test]
    fn projection_with_label_fallback() {
        let items = vec![
            json!({"id": 1, "first_name": "Ada", "surname": "Lovelace"}),
            json!({"id": 2}),
            json!({"first_name": "No", "surname": "Id"}),
        ];
        let opts = catalog_options(TargetCategory::Student, &items);
        assert_eq!(
            opts,
            vec![
                CatalogOption { id: 1, label: "Lovelace, Ada".into() },
                CatalogOption { id: 2, label: "#2".into() },
            ]
        );
    }

    #[tokio::test]
    async fn stale_lookup_is_discarded() {
        let mut loader = CatalogLoader::default();
        loader.select_category(Some(TargetCategory::Class), &client());
        assert_eq!(loader.state, CatalogState::Loading);
        loader.select_category(Some(TargetCategory::General), &client());

        let expired = loader.apply(
            TargetCategory::Class,
            Ok(vec![json!({"id": 3, "class_name": "3B"})]),
        );
        assert!(!expired);
        assert_eq!(loader.options(), &[general_option()]);
    }

    #[tokio::test]
    async fn empty_and_failed_lookups_disable_selector() {
        let mut loader = CatalogLoader::default();
        loader.select_category(Some(TargetCategory::Division), &client());
        loader.apply(TargetCategory::Division, Ok(Vec::new()));
        assert_eq!(loader.state, CatalogState::Empty);
        assert!(!loader.is_enabled());

        loader.select_category(Some(TargetCategory::Division), &client());
        let expired = loader.apply(TargetCategory::Division, Err(DropletError::SessionExpired));
        assert!(expired);
        assert!(matches!(loader.state, CatalogState::Failed(_)));
        assert!(loader.selected().is_none());
    }

    #[test]
    fn cursor_wraps() {
        let mut loader = CatalogLoader::default();
        loader.category = Some(TargetCategory::Class);
        loader.state = CatalogState::Loaded(catalog_options(
            TargetCategory::Class,
            &[json!({"id": 1, "class_name": "1A"}), json!({"id": 2, "class_name": "2A"})],
        ));
        loader.select_prev();
        assert_eq!(loader.selected().map(|o| o.id), Some(2));
        loader.select_next();
        assert_eq!(loader.selected().map(|o| o.id), Some(1));
    }
}
