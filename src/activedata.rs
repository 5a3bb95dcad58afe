// src/activedata.rs

use crate::error::{Error, Result};
use crate::query::Query;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[cfg(test)]
pub mod double;

/// Payload of a coverage query answer
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QueryData {
    /// Column name to the values of that column (`select` queries)
    Columns(BTreeMap<String, Vec<Value>>),
    /// One tuple per group (`groupby` queries)
    Rows(Vec<Vec<Value>>),
}

#[derive(Deserialize, Debug)]
struct Envelope {
    data: Option<QueryData>,
}

/// Something that can answer coverage queries
pub trait CoverageService {
    fn query(&self, query: &Query) -> Result<QueryData>;
}

/// Client for an ActiveData endpoint.
pub struct ActiveDataClient {
    url: String,
    client: Client,
}

impl ActiveDataClient {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(ActiveDataClient {
            url: url.to_string(),
            client,
        })
    }
}

impl CoverageService for ActiveDataClient {
    fn query(&self, query: &Query) -> Result<QueryData> {
        let http = |source| Error::Http {
            url: self.url.clone(),
            source,
        };
        let envelope: Envelope = self
            .client
            .post(&self.url)
            .json(query)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http)?
            .json()
            .map_err(http)?;
        // An empty result set comes back without `data`.
        Ok(envelope
            .data
            .unwrap_or_else(|| QueryData::Columns(BTreeMap::new())))
    }
}
