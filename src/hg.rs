// src/hg.rs

use crate::error::{Error, Result};
use crate::model::{ChangesetId, FileModification};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
pub mod double;

/// Read access to a branch's history
pub trait Changelog {
    /// One page of history anchored at `rev`, newest first.
    fn page(&self, branch: &str, rev: &ChangesetId) -> Result<Vec<ChangesetId>>;

    /// Files touched by `id`. Merges and metadata-only commits give an empty set.
    fn files(&self, branch: &str, id: &ChangesetId) -> Result<FileModification>;

    fn permalink(&self, branch: &str, id: &ChangesetId) -> String;
}

#[derive(Deserialize)]
struct LogDocument {
    #[serde(default)]
    changesets: Vec<LogEntry>,
}

#[derive(Deserialize)]
struct LogEntry {
    node: String,
}

#[derive(Deserialize)]
struct InfoEntry {
    #[serde(default)]
    files: Option<Vec<String>>,
}

/// Client for the Mercurial `json-log` / `json-info` web commands.
pub struct HgClient {
    base_url: String,
    client: Client,
}

impl HgClient {
    /// `base_url` must end with a slash, e.g. `https://hg.mozilla.org/`.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| Error::Http {
            url: base_url.to_string(),
            source,
        })?;
        Ok(HgClient {
            base_url: base_url.to_string(),
            client,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(%url, "GET");
        let http = |source| Error::Http {
            url: url.to_string(),
            source,
        };
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http)?
            .json()
            .map_err(http)
    }
}

impl Changelog for HgClient {
    fn page(&self, branch: &str, rev: &ChangesetId) -> Result<Vec<ChangesetId>> {
        let url = format!("{}{}/json-log/{}", self.base_url, branch, rev);
        let doc: LogDocument = self.get_json(&url)?;
        doc.changesets
            .iter()
            .map(|entry| {
                ChangesetId::parse(&entry.node).ok_or_else(|| Error::Protocol {
                    url: url.clone(),
                    message: format!("malformed node `{}`", entry.node),
                })
            })
            .collect()
    }

    fn files(&self, branch: &str, id: &ChangesetId) -> Result<FileModification> {
        let url = format!("{}{}/json-info/{}", self.base_url, branch, id);
        let mut doc: HashMap<String, InfoEntry> = self.get_json(&url)?;
        let entry = doc.remove(id.as_str()).ok_or_else(|| Error::Protocol {
            url: url.clone(),
            message: format!("no entry for {id}"),
        })?;
        Ok(entry.files.unwrap_or_default().into_iter().collect())
    }

    fn permalink(&self, branch: &str, id: &ChangesetId) -> String {
        format!("{}{}/rev/{}", self.base_url, branch, id)
    }
}
