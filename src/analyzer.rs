// src/analyzer.rs

use crate::activedata::CoverageService;
use crate::aggregator::CorrelationAggregator;
use crate::config::{EmptyChangesets, Settings};
use crate::coverage::CoverageQueryEngine;
use crate::error::Result;
use crate::hg::Changelog;
use crate::inspector::ChangeSetInspector;
use crate::model::ChangesetId;
use crate::walker::{walk, RevisionWalker};
use indicatif::ProgressBar;

/// Walks the history and records every changeset that modifies files.
///
/// Results land in `aggregator`, which the caller owns so that whatever was
/// recorded before a fatal error can still be written out.
pub fn analyze(
    changelog: &dyn Changelog,
    coverage: &dyn CoverageService,
    settings: &Settings,
    aggregator: &mut CorrelationAggregator,
) -> Result<()> {
    tracing::info!(
        start = %settings.startrev,
        branch = %settings.branch,
        count = settings.numpatches,
        mode = ?settings.mode,
        "analyzing changesets"
    );

    let inspector = ChangeSetInspector::new(changelog, &settings.branch);
    let engine = CoverageQueryEngine::new(coverage, &settings.suites, settings.mode, settings.query_limit);

    let bar = ProgressBar::new(settings.numpatches as u64);
    bar.set_message("Correlating changesets");

    match settings.empty_changesets {
        EmptyChangesets::Shrink => {
            let changesets = walk(changelog, settings.startrev.clone(), &settings.branch, settings.numpatches)?;
            for id in changesets {
                process(&inspector, &engine, aggregator, id)?;
                bar.inc(1);
            }
        }
        EmptyChangesets::Replace => {
            let walker = RevisionWalker::new(changelog, &settings.branch, settings.startrev.clone());
            for id in walker {
                if process(&inspector, &engine, aggregator, id?)? {
                    bar.inc(1);
                }
                if aggregator.recorded() >= settings.numpatches {
                    break;
                }
            }
        }
    }
    bar.finish_with_message("Analysis complete");

    Ok(())
}

/// Returns whether the changeset was recorded.
fn process(
    inspector: &ChangeSetInspector,
    engine: &CoverageQueryEngine,
    aggregator: &mut CorrelationAggregator,
    id: ChangesetId,
) -> Result<bool> {
    tracing::info!(changeset = %id, "on changeset");
    let Some(files) = inspector.files_modified(&id)? else {
        return Ok(false);
    };

    let result = engine.tests_for(&files);
    tracing::info!(changeset = %id, tests = result.tests.len(), files = files.len(), "correlated");

    let untested = result.untested_files();
    if !untested.is_empty() {
        tracing::info!(changeset = %id, ?untested, "files with no tests");
    }

    let permalink = inspector.permalink(&id);
    aggregator.record(id, permalink, &files, result);
    Ok(true)
}
