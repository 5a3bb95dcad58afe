// src/model.rs

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Number of leading hex digits of a node hash that identify a changeset.
pub const ID_LEN: usize = 12;

/// Short (12 hex digit) identifier of a changeset within a branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChangesetId(String);

impl ChangesetId {
    /// Accepts a short id or a full node hash; only the first 12 digits are kept.
    pub fn parse(node: &str) -> Option<Self> {
        let prefix = node.get(..ID_LEN)?;
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(ChangesetId(prefix.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repo-relative paths touched by one changeset
pub type FileModification = BTreeSet<String>;

/// Maps a file path to every test known to cover it
pub type FileTestIndex = BTreeMap<String, BTreeSet<String>>;

/// Coverage query strategy
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One query per file and suite, attributing tests to files
    Precise,
    /// One grouped query per suite, changeset-level test counts only
    Aggregate,
}

impl Mode {
    pub fn from_missing_tests_flag(analyze_files_with_missing_tests: bool) -> Self {
        if analyze_files_with_missing_tests {
            Mode::Precise
        } else {
            Mode::Aggregate
        }
    }
}

/// What the coverage database reported for one suite.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageRecord {
    /// Test name to the per-line coverage detail it produced
    PerTest(BTreeMap<String, serde_json::Value>),
    /// Test name to the number of grouped rows behind it
    Grouped(BTreeMap<String, u64>),
}

impl CoverageRecord {
    pub fn empty(mode: Mode) -> Self {
        match mode {
            Mode::Precise => CoverageRecord::PerTest(BTreeMap::new()),
            Mode::Aggregate => CoverageRecord::Grouped(BTreeMap::new()),
        }
    }

    pub fn test_names(&self) -> BTreeSet<String> {
        match self {
            CoverageRecord::PerTest(tests) => tests.keys().cloned().collect(),
            CoverageRecord::Grouped(tests) => tests.keys().cloned().collect(),
        }
    }
}

/// Tests found for the files of a single changeset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageResult {
    pub tests: BTreeSet<String>,
    /// Only produced in precise mode
    pub per_file: Option<FileTestIndex>,
}

impl CoverageResult {
    /// Files of this changeset that no test covered here.
    pub fn untested_files(&self) -> Vec<&str> {
        self.per_file
            .iter()
            .flatten()
            .filter(|(_, tests)| tests.is_empty())
            .map(|(file, _)| file.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangesetSummary {
    #[serde(rename = "patch-link")]
    pub permalink: String,
    #[serde(rename = "numfiles")]
    pub num_files: usize,
    #[serde(rename = "numtests")]
    pub num_tests: usize,
    pub tests: Vec<String>,
}

/// Changeset summaries in the order they were recorded, serialized as a
/// JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangesetReport(Vec<(ChangesetId, ChangesetSummary)>);

impl ChangesetReport {
    pub fn push(&mut self, id: ChangesetId, summary: ChangesetSummary) {
        self.0.push((id, summary));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChangesetId> {
        self.0.iter().map(|(id, _)| id)
    }

    pub fn get(&self, id: &ChangesetId) -> Option<&ChangesetSummary> {
        self.0.iter().find(|(k, _)| k == id).map(|(_, summary)| summary)
    }
}

impl Serialize for ChangesetReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, summary)| (id, summary)))
    }
}
