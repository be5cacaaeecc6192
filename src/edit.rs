//! Inline rename editing.
//!
//! A [`RenameSession`] captures a record's display name when editing starts, so that a rejected
//! commit can hand the original value back to whatever is displaying it.

use crate::error::Error;
use crate::model::DomainRecord;
use crate::reconciler::DomainCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSession {
    pub target_key: String,
    pub original_value: String,
    pub draft_value: String,
}

/// A commit that did not apply. `original` is the name to display again.
#[derive(thiserror::Error, Debug)]
#[error("rename of \"{target_key}\" rejected: {source}")]
pub struct RenameRejected {
    pub target_key: String,
    pub original: String,
    pub source: Error,
}

impl RenameSession {
    /// Start editing `record`'s display name. An unnamed record starts from an empty draft.
    pub fn begin(record: &DomainRecord) -> Self {
        let original = record.display_name.clone().unwrap_or_default();
        Self {
            target_key: record.fulldomain.clone(),
            original_value: original.clone(),
            draft_value: original,
        }
    }

    pub fn set_draft(&mut self, value: impl Into<String>) {
        self.draft_value = value.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.draft_value.trim() != self.original_value
    }

    /// Abandon the edit, returning the value to display again.
    pub fn cancel(self) -> String {
        self.original_value
    }

    /// Apply the draft through `cache`. A draft equal to the original is accepted without
    /// touching storage and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RenameRejected`] carrying the original value if the rename fails.
    pub async fn commit(self, cache: &DomainCache) -> Result<Option<DomainRecord>, RenameRejected> {
        if !self.is_dirty() {
            return Ok(None);
        }
        match cache.rename_domain(&self.target_key, &self.draft_value).await {
            Ok(record) => Ok(Some(record)),
            Err(source) => {
                tracing::warn!("rename of \"{}\" failed: {source}", self.target_key);
                Err(RenameRejected {
                    target_key: self.target_key,
                    original: self.original_value,
                    source,
                })
            }
        }
    }
}
