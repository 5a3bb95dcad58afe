// src/query.rs
//
// ActiveData query documents. Each builder returns a fresh document so
// nothing leaks between files, suites or modes.

use crate::config::Suite;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

pub const COVERAGE_TABLE: &str = "coverage";
pub const FILE_NAME: &str = "source.file.name";
pub const CHANGESET: &str = "repo.changeset.id12";
pub const BRANCH: &str = "repo.branch.name";
pub const TOTAL_COVERED: &str = "source.file.total_covered";
pub const TEST_NAME: &str = "test.name";
pub const LINES_COVERED: &str = "source.file.covered";

/// Single-field predicate, serialized as `{"eq": {"field": value}}` etc.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    Eq(Map<String, Value>),
    In(Map<String, Value>),
    Gt(Map<String, Value>),
}

fn field(name: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(name.to_string(), value);
    map
}

impl Predicate {
    pub fn eq(name: &str, value: impl Into<Value>) -> Self {
        Predicate::Eq(field(name, value.into()))
    }

    pub fn one_of<'a>(name: &str, values: impl IntoIterator<Item = &'a String>) -> Self {
        Predicate::In(field(name, values.into_iter().cloned().collect()))
    }

    pub fn gt(name: &str, value: impl Into<Value>) -> Self {
        Predicate::Gt(field(name, value.into()))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Where {
    pub and: Vec<Predicate>,
}

/// Named projection of a column
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub value: String,
}

impl Column {
    fn new(name: &str, value: &str) -> Self {
        Column {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Query {
    pub from: String,
    #[serde(rename = "where")]
    pub filter: Where,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupby: Option<Vec<Column>>,
}

impl Query {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "unserializable": e.to_string() }))
    }
}

fn suite_filter(file_predicate: Predicate, suite: &Suite) -> Where {
    Where {
        and: vec![
            file_predicate,
            Predicate::eq(CHANGESET, suite.rev.as_str()),
            Predicate::eq(BRANCH, suite.branch.as_str()),
            Predicate::gt(TOTAL_COVERED, 0),
        ],
    }
}

/// Tests (with their line coverage) of `suite` that touch exactly `file`.
pub fn precise_query(suite: &Suite, file: &str, limit: u32) -> Query {
    Query {
        from: COVERAGE_TABLE.to_string(),
        filter: suite_filter(Predicate::eq(FILE_NAME, file), suite),
        limit: Some(limit),
        select: Some(vec![
            Column::new("test", TEST_NAME),
            Column::new("coverage", LINES_COVERED),
        ]),
        groupby: None,
    }
}

/// Distinct tests of `suite` touching any of `files`, grouped by test name.
pub fn aggregate_query(suite: &Suite, files: &BTreeSet<String>, limit: u32) -> Query {
    Query {
        from: COVERAGE_TABLE.to_string(),
        filter: suite_filter(Predicate::one_of(FILE_NAME, files), suite),
        limit: Some(limit),
        select: None,
        groupby: Some(vec![Column::new("test", TEST_NAME)]),
    }
}
