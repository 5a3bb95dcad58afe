// src/walker.rs

use crate::error::{Error, Result};
use crate::hg::Changelog;
use crate::model::ChangesetId;
use std::collections::{HashSet, VecDeque};

/// Backward, page-by-page traversal of a branch's history.
///
/// Every page contributes all but its last entry; the last entry becomes
/// the anchor of the next page. Pages are only fetched when the buffered
/// ids run out.
pub struct RevisionWalker<'a> {
    source: &'a dyn Changelog,
    branch: String,
    cursor: ChangesetId,
    pending: VecDeque<ChangesetId>,
    seen: HashSet<ChangesetId>,
    anchors: HashSet<ChangesetId>,
    done: bool,
}

impl<'a> RevisionWalker<'a> {
    pub fn new(source: &'a dyn Changelog, branch: &str, start: ChangesetId) -> Self {
        let mut anchors = HashSet::new();
        anchors.insert(start.clone());
        RevisionWalker {
            source,
            branch: branch.to_string(),
            cursor: start,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            anchors,
            done: false,
        }
    }

    fn exhausted(&self, reason: String) -> Error {
        Error::HistoryExhausted {
            cursor: self.cursor.clone(),
            reason,
        }
    }

    fn next_page(&mut self) -> Result<()> {
        let page = self.source.page(&self.branch, &self.cursor)?;
        let Some((next, body)) = page.split_last() else {
            return Err(self.exhausted("no changesets returned".into()));
        };
        if body.is_empty() {
            return Err(self.exhausted("page has a single changeset".into()));
        }
        if !self.anchors.insert(next.clone()) {
            return Err(self.exhausted(format!("cursor does not advance past {next}")));
        }
        tracing::debug!(cursor = %self.cursor, next = %next, entries = page.len(), "changelog page");

        for id in body {
            if self.seen.insert(id.clone()) {
                self.pending.push_back(id.clone());
            }
        }
        self.cursor = next.clone();
        Ok(())
    }
}

impl Iterator for RevisionWalker<'_> {
    type Item = Result<ChangesetId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                return Some(Ok(id));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.next_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

/// Exactly `count` unique changesets, newest first, starting at `start`.
pub fn walk(
    source: &dyn Changelog,
    start: ChangesetId,
    branch: &str,
    count: usize,
) -> Result<Vec<ChangesetId>> {
    RevisionWalker::new(source, branch, start).take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hg::double::{id, ChangelogDouble};

    #[test]
    fn stops_before_fetching_an_unneeded_page() {
        let history = ChangelogDouble::default()
            .with_page("abc123def456", &["abc123def456", "aaaaaaaaaaa1", "fed789000111"])
            .with_page("fed789000111", &["fed789000111", "bbbbbbbbbbb2"]);

        let ids = walk(&history, id("abc123def456"), "mozilla-central", 2).unwrap();
        assert_eq!(ids, vec![id("abc123def456"), id("aaaaaaaaaaa1")]);
        assert_eq!(*history.requested.borrow(), vec!["abc123def456".to_string()]);
    }

    #[test]
    fn pages_are_chained_through_their_last_entry() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000001", "000000000002", "000000000003"])
            .with_page("000000000003", &["000000000003", "000000000004", "000000000005"])
            .with_page("000000000005", &["000000000005", "000000000006"]);

        let ids = walk(&history, id("000000000001"), "b", 4).unwrap();
        assert_eq!(
            ids,
            vec![
                id("000000000001"),
                id("000000000002"),
                id("000000000003"),
                id("000000000004"),
            ]
        );
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn overshoot_is_truncated() {
        let history = ChangelogDouble::default().with_page(
            "000000000001",
            &["000000000001", "000000000002", "000000000003", "000000000004"],
        );
        let ids = walk(&history, id("000000000001"), "b", 1).unwrap();
        assert_eq!(ids, vec![id("000000000001")]);
    }

    #[test]
    fn single_entry_page_is_history_exhausted() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000001", "000000000002"])
            .with_page("000000000002", &["000000000002"]);
        let err = walk(&history, id("000000000001"), "b", 5).unwrap_err();
        assert!(matches!(err, Error::HistoryExhausted { ref cursor, .. } if cursor.as_str() == "000000000002"));
    }

    #[test]
    fn empty_page_is_history_exhausted() {
        let history = ChangelogDouble::default();
        let err = walk(&history, id("000000000001"), "b", 1).unwrap_err();
        assert!(matches!(err, Error::HistoryExhausted { .. }));
    }

    #[test]
    fn non_advancing_cursor_is_detected() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000009", "000000000001"]);
        let err = walk(&history, id("000000000001"), "b", 5).unwrap_err();
        assert!(matches!(err, Error::HistoryExhausted { .. }));
    }

    #[test]
    fn cycles_between_pages_are_detected() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000001", "000000000002"])
            .with_page("000000000002", &["000000000002", "000000000001"]);
        let err = walk(&history, id("000000000001"), "b", 5).unwrap_err();
        assert!(matches!(err, Error::HistoryExhausted { .. }));
    }

    #[test]
    fn duplicates_across_pages_are_dropped() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000001", "000000000002", "000000000003"])
            .with_page("000000000003", &["000000000002", "000000000003", "000000000004"])
            .with_page("000000000004", &["000000000004", "000000000005"]);
        let ids = walk(&history, id("000000000001"), "b", 4).unwrap();
        assert_eq!(
            ids,
            vec![
                id("000000000001"),
                id("000000000002"),
                id("000000000003"),
                id("000000000004"),
            ]
        );
    }

    #[test]
    fn walker_keeps_going_on_demand() {
        let history = ChangelogDouble::default()
            .with_page("000000000001", &["000000000001", "000000000002"])
            .with_page("000000000002", &["000000000002", "000000000003"]);
        let mut walker = RevisionWalker::new(&history, "b", id("000000000001"));
        assert_eq!(walker.next().unwrap().unwrap(), id("000000000001"));
        assert_eq!(history.requested.borrow().len(), 1);
        assert_eq!(walker.next().unwrap().unwrap(), id("000000000002"));
        assert_eq!(history.requested.borrow().len(), 2);
        assert!(walker.next().unwrap().is_err());
        assert!(walker.next().is_none());
    }
}
