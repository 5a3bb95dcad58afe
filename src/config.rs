// src/config.rs

use crate::cli::Args;
use crate::error::{Error, Result};
use crate::model::{ChangesetId, Mode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HG_URL: &str = "https://hg.mozilla.org/";
pub const DEFAULT_ACTIVEDATA_URL: &str = "https://activedata.allizom.org/query";
pub const DEFAULT_QUERY_LIMIT: u32 = 1000;

/// What to do with changesets that modify no files
#[derive(clap::ValueEnum, Deserialize, Clone, Debug, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyChangesets {
    /// Skip them; the run may summarize fewer changesets than requested
    #[default]
    Shrink,
    /// Skip them and walk further back to make up the requested count
    Replace,
}

/// A test suite whose coverage run is queried
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    pub name: String,
    /// Revision the suite's coverage was collected on
    pub rev: String,
    pub branch: String,
}

/// The configuration file as written; every key is optional here so that
/// command-line flags can fill the gaps.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub numpatches: Option<usize>,
    pub startrev: Option<String>,
    pub analysisbranch: Option<String>,
    pub outputdir: Option<PathBuf>,
    pub analyze_files_with_missing_tests: Option<bool>,
    pub empty_changesets: Option<EmptyChangesets>,
    pub hg_url: Option<String>,
    pub activedata_url: Option<String>,
    pub query_limit: Option<u32>,
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub suites: Vec<Suite>,
}

impl RawConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies command-line overrides.
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(n) = args.numpatches {
            self.numpatches = Some(n);
        }
        if let Some(rev) = &args.startrev {
            self.startrev = Some(rev.clone());
        }
        if let Some(branch) = &args.branch {
            self.analysisbranch = Some(branch.clone());
        }
        if let Some(output) = &args.output {
            self.outputdir = Some(output.clone());
        }
        if let Some(mode) = args.mode {
            self.analyze_files_with_missing_tests = Some(mode == Mode::Precise);
        }
        if let Some(policy) = args.empty_changesets {
            self.empty_changesets = Some(policy);
        }
        self
    }
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub numpatches: usize,
    pub startrev: ChangesetId,
    pub branch: String,
    pub outputdir: PathBuf,
    pub mode: Mode,
    pub empty_changesets: EmptyChangesets,
    pub hg_url: String,
    pub activedata_url: String,
    pub query_limit: u32,
    pub http_timeout: Option<Duration>,
    pub suites: Vec<Suite>,
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| Error::Config(format!("missing required key `{key}`")))
}

impl TryFrom<RawConfig> for Settings {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let numpatches = required(raw.numpatches, "numpatches")?;
        if numpatches == 0 {
            return Err(Error::Config("`numpatches` must be greater than 0".into()));
        }
        let startrev = required(raw.startrev, "startrev")?;
        let startrev = ChangesetId::parse(&startrev)
            .ok_or_else(|| Error::Config(format!("`startrev` is not a changeset id: {startrev}")))?;
        let branch = required(raw.analysisbranch, "analysisbranch")?;
        let outputdir = required(raw.outputdir, "outputdir")?;
        let precise = required(
            raw.analyze_files_with_missing_tests,
            "analyze_files_with_missing_tests",
        )?;
        if raw.suites.is_empty() {
            return Err(Error::Config("at least one `[[suites]]` entry is required".into()));
        }

        let mut hg_url = raw.hg_url.unwrap_or_else(|| DEFAULT_HG_URL.to_string());
        if !hg_url.ends_with('/') {
            hg_url.push('/');
        }

        Ok(Settings {
            numpatches,
            startrev,
            branch,
            outputdir,
            mode: Mode::from_missing_tests_flag(precise),
            empty_changesets: raw.empty_changesets.unwrap_or_default(),
            hg_url,
            activedata_url: raw
                .activedata_url
                .unwrap_or_else(|| DEFAULT_ACTIVEDATA_URL.to_string()),
            query_limit: raw.query_limit.unwrap_or(DEFAULT_QUERY_LIMIT),
            http_timeout: raw.http_timeout_secs.map(Duration::from_secs),
            suites: raw.suites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitCode;
    use clap::Parser;

    const FULL: &str = r#"
        numpatches = 100
        startrev = "48cc597db296"
        analysisbranch = "mozilla-central"
        outputdir = "/tmp/out"
        analyze_files_with_missing_tests = true

        [[suites]]
        name = "mochitest"
        rev = "dcb3a3ba9065"
        branch = "try"

        [[suites]]
        name = "xpcshell"
        rev = "6369d1c6526b"
        branch = "try"
    "#;

    fn settings(text: &str) -> Result<Settings> {
        Settings::try_from(RawConfig::parse(text).unwrap())
    }

    #[test]
    fn full_config_uses_defaults_for_optional_keys() {
        let settings = settings(FULL).unwrap();
        assert_eq!(settings.numpatches, 100);
        assert_eq!(settings.startrev.as_str(), "48cc597db296");
        assert_eq!(settings.mode, Mode::Precise);
        assert_eq!(settings.empty_changesets, EmptyChangesets::Shrink);
        assert_eq!(settings.hg_url, DEFAULT_HG_URL);
        assert_eq!(settings.query_limit, 1000);
        assert_eq!(settings.suites.len(), 2);
        assert_eq!(settings.suites[1].name, "xpcshell");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let text = FULL.replace("startrev = \"48cc597db296\"", "");
        match settings(&text) {
            Err(Error::Config(message)) => assert!(message.contains("startrev")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_patches_is_rejected() {
        let text = FULL.replace("numpatches = 100", "numpatches = 0");
        assert!(matches!(settings(&text), Err(Error::Config(_))));
    }

    #[test]
    fn suites_are_required() {
        let text = FULL.split("[[suites]]").next().unwrap().to_string();
        assert!(matches!(settings(&text), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_startrev_is_rejected() {
        let text = FULL.replace("48cc597db296", "tip");
        assert!(matches!(settings(&text), Err(Error::Config(_))));
    }

    #[test]
    fn hg_url_gets_trailing_slash() {
        let text = format!("hg_url = \"http://localhost:8000\"\n{FULL}");
        assert_eq!(settings(&text).unwrap().hg_url, "http://localhost:8000/");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RawConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ref message) if message.contains("absent.toml")));
        assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RawConfig::parse("numpatchez = 3").is_err());
    }

    #[test]
    fn command_line_overrides_file() {
        let args = Args::parse_from([
            "patch-coverage",
            "--numpatches",
            "5",
            "--mode",
            "aggregate",
            "--empty-changesets",
            "replace",
        ]);
        let raw = RawConfig::parse(FULL).unwrap().merge_args(&args);
        let settings = Settings::try_from(raw).unwrap();
        assert_eq!(settings.numpatches, 5);
        assert_eq!(settings.mode, Mode::Aggregate);
        assert_eq!(settings.empty_changesets, EmptyChangesets::Replace);
        assert_eq!(settings.branch, "mozilla-central");
    }
}
