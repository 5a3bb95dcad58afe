// src/inspector.rs

use crate::error::Result;
use crate::hg::Changelog;
use crate::model::{ChangesetId, FileModification};

pub struct ChangeSetInspector<'a> {
    source: &'a dyn Changelog,
    branch: String,
}

impl<'a> ChangeSetInspector<'a> {
    pub fn new(source: &'a dyn Changelog, branch: &str) -> Self {
        ChangeSetInspector {
            source,
            branch: branch.to_string(),
        }
    }

    /// Files modified by `id`, or `None` when it touches nothing and
    /// should not be correlated at all.
    pub fn files_modified(&self, id: &ChangesetId) -> Result<Option<FileModification>> {
        let files = self.source.files(&self.branch, id)?;
        if files.is_empty() {
            tracing::info!(changeset = %id, "no files modified, skipping");
            return Ok(None);
        }
        Ok(Some(files))
    }

    pub fn permalink(&self, id: &ChangesetId) -> String {
        self.source.permalink(&self.branch, id)
    }
}
