// src/activedata/double.rs

use super::*;
use crate::query::{CHANGESET, FILE_NAME};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Answers queries from canned coverage: (suite rev, file) → tests.
///
/// Precise queries get a column answer for the one file they name;
/// aggregate queries get one row per distinct test across their files.
#[derive(Debug, Default)]
pub struct CoverageDouble {
    pub coverage: HashMap<(String, String), Vec<String>>,
    /// Files whose queries fail with a transport-like error
    pub failing_files: BTreeSet<String>,
    /// Suite revisions whose queries always fail
    pub failing_revs: BTreeSet<String>,
    pub queries: RefCell<Vec<Value>>,
}

impl CoverageDouble {
    pub fn with_tests(mut self, rev: &str, file: &str, tests: &[&str]) -> Self {
        self.coverage.insert(
            (rev.to_string(), file.to_string()),
            tests.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn failing_file(mut self, file: &str) -> Self {
        self.failing_files.insert(file.to_string());
        self
    }

    pub fn failing_rev(mut self, rev: &str) -> Self {
        self.failing_revs.insert(rev.to_string());
        self
    }

    fn tests(&self, rev: &str, file: &str) -> Vec<String> {
        self.coverage
            .get(&(rev.to_string(), file.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

fn failure(message: &str) -> Error {
    Error::Protocol {
        url: "activedata-double".into(),
        message: message.into(),
    }
}

impl CoverageService for CoverageDouble {
    fn query(&self, query: &Query) -> Result<QueryData> {
        let doc = query.to_json();
        self.queries.borrow_mut().push(doc.clone());

        let predicates = doc["where"]["and"].as_array().cloned().unwrap_or_default();
        let rev = predicates
            .iter()
            .find_map(|p| p["eq"][CHANGESET].as_str())
            .unwrap_or_default()
            .to_string();
        if self.failing_revs.contains(&rev) {
            return Err(failure("suite unavailable"));
        }

        if let Some(file) = predicates.iter().find_map(|p| p["eq"][FILE_NAME].as_str()) {
            if self.failing_files.contains(file) {
                return Err(failure("connection reset"));
            }
            let tests = self.tests(&rev, file);
            let coverage: Vec<Value> = tests.iter().map(|_| serde_json::json!([1])).collect();
            let mut columns: BTreeMap<String, Vec<Value>> = BTreeMap::new();
            columns.insert("test".to_string(), tests.into_iter().map(Value::from).collect());
            columns.insert("coverage".to_string(), coverage);
            return Ok(QueryData::Columns(columns));
        }

        let files = predicates
            .iter()
            .find_map(|p| p["in"][FILE_NAME].as_array().cloned())
            .unwrap_or_default();
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for file in files.iter().filter_map(Value::as_str) {
            if self.failing_files.contains(file) {
                return Err(failure("connection reset"));
            }
            for test in self.tests(&rev, file) {
                *counts.entry(test).or_default() += 1;
            }
        }
        Ok(QueryData::Rows(
            counts
                .into_iter()
                .map(|(test, count)| vec![Value::from(test), Value::from(count)])
                .collect(),
        ))
    }
}
