// src/hg/double.rs

use super::*;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// In-memory history: pages keyed by their anchor, file sets keyed by id.
#[derive(Debug, Default)]
pub struct ChangelogDouble {
    pub pages: HashMap<String, Vec<String>>,
    pub files: HashMap<String, Vec<String>>,
    /// Anchors of every page request, in order
    pub requested: RefCell<Vec<String>>,
}

impl ChangelogDouble {
    pub fn with_page(mut self, anchor: &str, ids: &[&str]) -> Self {
        self.pages
            .insert(anchor.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_files(mut self, id: &str, files: &[&str]) -> Self {
        self.files
            .insert(id.to_string(), files.iter().map(|s| s.to_string()).collect());
        self
    }
}

pub fn id(s: &str) -> ChangesetId {
    ChangesetId::parse(s).unwrap()
}

impl Changelog for ChangelogDouble {
    fn page(&self, _branch: &str, rev: &ChangesetId) -> Result<Vec<ChangesetId>> {
        self.requested.borrow_mut().push(rev.to_string());
        Ok(self
            .pages
            .get(rev.as_str())
            .map(|ids| ids.iter().map(|s| id(s)).collect())
            .unwrap_or_default())
    }

    fn files(&self, _branch: &str, id: &ChangesetId) -> Result<FileModification> {
        Ok(self
            .files
            .get(id.as_str())
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_else(BTreeSet::new))
    }

    fn permalink(&self, branch: &str, id: &ChangesetId) -> String {
        format!("https://hg.example/{branch}/rev/{id}")
    }
}
