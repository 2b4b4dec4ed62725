//! Checklist items and the completion payload.

use super::ChecklistItemId;
use serde::{Deserialize, Serialize};

/// One entry of a job's required-task checklist.
///
/// Checklists arrive pre-populated; the engine only toggles `done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    id: ChecklistItemId,
    description: String,
    required: bool,
    done: bool,
}

impl ChecklistItem {
    /// Creates an open checklist item.
    #[must_use]
    pub fn new(id: ChecklistItemId, description: impl Into<String>, required: bool) -> Self {
        Self {
            id,
            description: description.into(),
            required,
            done: false,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> &ChecklistItemId {
        &self.id
    }

    /// Returns the item description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns whether completion requires this item.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether the item is done.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    pub(super) const fn set_done(&mut self, done: bool) {
        self.done = done;
    }
}

/// Data supplied by staff when completing a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    /// Free-form completion notes.
    pub notes: Option<String>,
    /// Checklist items to mark done before validating requirements.
    pub completed_items: Vec<ChecklistItemId>,
    /// URLs of photos already uploaded by the storage collaborator.
    pub photo_urls: Vec<String>,
}

impl CompletionPayload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets completion notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Marks checklist items done as part of completion.
    #[must_use]
    pub fn with_completed_items(
        mut self,
        items: impl IntoIterator<Item = ChecklistItemId>,
    ) -> Self {
        self.completed_items = items.into_iter().collect();
        self
    }

    /// Attaches uploaded photo URLs.
    #[must_use]
    pub fn with_photo_urls(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.photo_urls = urls.into_iter().collect();
        self
    }
}
