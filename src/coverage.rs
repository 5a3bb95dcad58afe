// src/coverage.rs

use crate::activedata::{CoverageService, QueryData};
use crate::config::Suite;
use crate::error::QueryFailure;
use crate::model::{CoverageRecord, CoverageResult, FileModification, FileTestIndex, Mode};
use crate::query::{aggregate_query, precise_query, Query};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Resolves the tests covering a changeset's files, one suite at a time.
pub struct CoverageQueryEngine<'a> {
    service: &'a dyn CoverageService,
    suites: &'a [Suite],
    mode: Mode,
    limit: u32,
}

/// Flattens either answer shape into (test name, detail) pairs.
fn test_entries(data: QueryData) -> Vec<(String, Value)> {
    match data {
        QueryData::Columns(mut columns) => {
            let tests = columns.remove("test").unwrap_or_default();
            let mut details = columns
                .remove("coverage")
                .or_else(|| columns.remove("count"))
                .unwrap_or_default()
                .into_iter();
            tests
                .into_iter()
                .map(|test| (test, details.next().unwrap_or(Value::Null)))
                .filter_map(|(test, detail)| Some((test.as_str()?.to_string(), detail)))
                .collect()
        }
        QueryData::Rows(rows) => rows
            .into_iter()
            .filter_map(|mut row| {
                if row.is_empty() {
                    return None;
                }
                let test = row.remove(0);
                let detail = row.into_iter().next().unwrap_or(Value::Null);
                Some((test.as_str()?.to_string(), detail))
            })
            .collect(),
    }
}

fn to_record(mode: Mode, data: QueryData) -> CoverageRecord {
    let entries = test_entries(data);
    match mode {
        Mode::Precise => CoverageRecord::PerTest(entries.into_iter().collect()),
        Mode::Aggregate => {
            let mut counts = BTreeMap::new();
            for (test, detail) in entries {
                *counts.entry(test).or_insert(0) += detail.as_u64().unwrap_or(1);
            }
            CoverageRecord::Grouped(counts)
        }
    }
}

impl<'a> CoverageQueryEngine<'a> {
    pub fn new(service: &'a dyn CoverageService, suites: &'a [Suite], mode: Mode, limit: u32) -> Self {
        CoverageQueryEngine {
            service,
            suites,
            mode,
            limit,
        }
    }

    fn run(&self, suite: &Suite, query: &Query) -> Result<CoverageRecord, QueryFailure> {
        self.service
            .query(query)
            .map(|data| to_record(self.mode, data))
            .map_err(|source| QueryFailure {
                suite: suite.name.clone(),
                payload: query.to_json().to_string(),
                source,
            })
    }

    fn run_or_empty(&self, suite: &Suite, query: &Query, scope: &str) -> CoverageRecord {
        self.run(suite, query).unwrap_or_else(|failure| {
            tracing::warn!(
                suite = %failure.suite,
                scope,
                query = %failure.payload,
                error = %failure.source,
                "coverage query failed, using an empty result"
            );
            CoverageRecord::empty(self.mode)
        })
    }

    /// Tests covering `files`. Per-file attribution is only computed in
    /// precise mode. Query failures never escape.
    pub fn tests_for(&self, files: &FileModification) -> CoverageResult {
        match self.mode {
            Mode::Precise => {
                let mut tests = BTreeSet::new();
                let mut per_file = FileTestIndex::new();
                for file in files {
                    let mut file_tests = BTreeSet::new();
                    for suite in self.suites {
                        let query = precise_query(suite, file, self.limit);
                        file_tests.extend(self.run_or_empty(suite, &query, file).test_names());
                    }
                    tests.extend(file_tests.iter().cloned());
                    per_file.insert(file.clone(), file_tests);
                }
                CoverageResult {
                    tests,
                    per_file: Some(per_file),
                }
            }
            Mode::Aggregate => {
                let scope = format!("{} files", files.len());
                let tests = self
                    .suites
                    .iter()
                    .flat_map(|suite| {
                        let query = aggregate_query(suite, files, self.limit);
                        self.run_or_empty(suite, &query, &scope).test_names()
                    })
                    .collect();
                CoverageResult {
                    tests,
                    per_file: None,
                }
            }
        }
    }
}
