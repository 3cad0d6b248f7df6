//! The ordered, de-duplicated target list built inside the editor.

use crate::models::{DropRecord, PayloadTarget, TargetCategory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub category: TargetCategory,
    pub id: u64,
    pub display_name: String,
}

impl TargetEntry {
    pub fn identity(&self) -> (TargetCategory, u64) {
        (self.category, self.id)
    }

    pub fn to_payload(&self) -> PayloadTarget {
        PayloadTarget {
            category: self.category,
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetSetError {
    #[error("Select a target type first.")]
    MissingCategory,
    #[error("Select a {0} to add.")]
    MissingId(&'static str),
    #[error("{0} is already added.")]
    Duplicate(String),
    #[error("No target at position {0}.")]
    OutOfBounds(usize),
}

/// One rendered line of the target list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRow {
    Placeholder,
    Entry {
        /// Position in the set at render time; valid only for this pass.
        index: usize,
        category: TargetCategory,
        label: String,
    },
}

pub const EMPTY_PLACEHOLDER: &str = "No targets added (visible to no one until you add one).";

#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    entries: Vec<TargetEntry>,
}

impl TargetSet {
    pub fn entries(&self) -> &[TargetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, category: TargetCategory, id: u64) -> bool {
        self.entries.iter().any(|e| e.identity() == (category, id))
    }

    pub fn add(
        &mut self,
        category: Option<TargetCategory>,
        id: Option<u64>,
        name: &str,
    ) -> Result<(), TargetSetError> {
        let category = category.ok_or(TargetSetError::MissingCategory)?;
        let id = match category {
            TargetCategory::General => 0,
            other => id.ok_or(TargetSetError::MissingId(other.label()))?,
        };

        let name = name.trim();
        let display_name = if name.is_empty() {
            category.label().to_string()
        } else {
            name.to_string()
        };

        if self.contains(category, id) {
            return Err(TargetSetError::Duplicate(display_name));
        }

        self.entries.push(TargetEntry {
            category,
            id,
            display_name,
        });
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<TargetEntry, TargetSetError> {
        if index >= self.entries.len() {
            return Err(TargetSetError::OutOfBounds(index));
        }
        Ok(self.entries.remove(index))
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Seed from a fetched drop. Repeated identities in the source collapse
    /// to their first occurrence.
    pub fn load_from(&mut self, drop: &DropRecord) {
        self.entries.clear();
        for target in &drop.targets {
            let name = target
                .name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(target.category.label());
            // Duplicates are dropped silently here; the set stays unique.
            let _ = self.add(Some(target.category), Some(target.id), name);
        }
    }

    pub fn rows(&self) -> Vec<TargetRow> {
        if self.entries.is_empty() {
            return vec![TargetRow::Placeholder];
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| TargetRow::Entry {
                index,
                category: e.category,
                label: e.display_name.clone(),
            })
            .collect()
    }

    pub fn payload(&self) -> Vec<PayloadTarget> {
        self.entries.iter().map(TargetEntry::to_payload).collect()
    }
}
