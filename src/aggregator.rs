// src/aggregator.rs

use crate::model::{
    ChangesetId, ChangesetReport, ChangesetSummary, CoverageResult, FileModification, FileTestIndex, Mode,
};

/// Tests per modified file, 0 for a changeset without files.
pub fn tests_per_file(num_tests: usize, num_files: usize) -> f64 {
    if num_files == 0 {
        0.0
    } else {
        num_tests as f64 / num_files as f64
    }
}

/// Everything a run produced, ready to be persisted and plotted
#[derive(Debug, Default)]
pub struct Artifacts {
    /// In processing order
    pub per_changeset: ChangesetReport,
    /// Present in precise mode only
    pub per_file: Option<FileTestIndex>,
    /// Present in precise mode only
    pub files_with_no_tests: Option<Vec<String>>,
    /// (test count, changeset), in processing order
    pub test_counts: Vec<(usize, ChangesetId)>,
    /// (test count, file count, changeset), in processing order
    pub test_file_counts: Vec<(usize, usize, ChangesetId)>,
}

impl Artifacts {
    pub fn tests_per_file_ratios(&self) -> Vec<f64> {
        self.test_file_counts
            .iter()
            .map(|&(tests, files, _)| tests_per_file(tests, files))
            .collect()
    }
}

/// Sole owner of the running per-changeset and per-file maps.
#[derive(Debug)]
pub struct CorrelationAggregator {
    mode: Mode,
    summaries: ChangesetReport,
    file_tests: FileTestIndex,
    test_counts: Vec<(usize, ChangesetId)>,
    test_file_counts: Vec<(usize, usize, ChangesetId)>,
}

impl CorrelationAggregator {
    pub fn new(mode: Mode) -> Self {
        CorrelationAggregator {
            mode,
            summaries: ChangesetReport::default(),
            file_tests: FileTestIndex::new(),
            test_counts: Vec::new(),
            test_file_counts: Vec::new(),
        }
    }

    /// Number of changesets recorded so far
    pub fn recorded(&self) -> usize {
        self.summaries.len()
    }

    pub fn record(
        &mut self,
        id: ChangesetId,
        permalink: String,
        files: &FileModification,
        result: CoverageResult,
    ) {
        if self.mode == Mode::Precise {
            let mut per_file = result.per_file.unwrap_or_default();
            for file in files {
                let tests = per_file.remove(file).unwrap_or_default();
                self.file_tests.entry(file.clone()).or_default().extend(tests);
            }
        }

        let num_tests = result.tests.len();
        self.test_counts.push((num_tests, id.clone()));
        self.test_file_counts.push((num_tests, files.len(), id.clone()));
        self.summaries.push(
            id,
            ChangesetSummary {
                permalink,
                num_files: files.len(),
                num_tests,
                tests: result.tests.into_iter().collect(),
            },
        );
    }

    pub fn finalize(self) -> Artifacts {
        let (per_file, files_with_no_tests) = match self.mode {
            Mode::Precise => {
                let untested = self
                    .file_tests
                    .iter()
                    .filter(|(_, tests)| tests.is_empty())
                    .map(|(file, _)| file.clone())
                    .collect();
                (Some(self.file_tests), Some(untested))
            }
            Mode::Aggregate => (None, None),
        };
        Artifacts {
            per_changeset: self.summaries,
            per_file,
            files_with_no_tests,
            test_counts: self.test_counts,
            test_file_counts: self.test_file_counts,
        }
    }
}
