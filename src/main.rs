// src/main.rs

mod activedata;
mod aggregator;
mod analyzer;
mod cli;
mod config;
mod coverage;
mod error;
mod hg;
mod inspector;
mod model;
mod query;
mod renderer;
mod report;
mod walker;

use activedata::ActiveDataClient;
use aggregator::CorrelationAggregator;
use anyhow::Context;
use clap::Parser;
use cli::Args;
use config::{RawConfig, Settings};
use error::ExitCode;
use hg::HgClient;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_env("PATCH_COVERAGE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let start_time = Instant::now();

    let exit_code = match run(&Args::parse()) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("patch-coverage: {e:#}");
            match e.downcast_ref::<error::Error>() {
                Some(err) => ExitCode::from(err),
                None => ExitCode::Failure,
            }
        }
    };

    println!("Total time: {:.2?}", start_time.elapsed());
    std::process::exit(exit_code as i32);
}

fn run(args: &Args) -> anyhow::Result<()> {
    let raw = match &args.config {
        Some(path) => RawConfig::load(path)?,
        None => RawConfig::default(),
    };
    let settings = Settings::try_from(raw.merge_args(args))?;

    let changelog = HgClient::new(&settings.hg_url, settings.http_timeout)?;
    let coverage = ActiveDataClient::new(&settings.activedata_url, settings.http_timeout)?;

    let mut aggregator = CorrelationAggregator::new(settings.mode);
    let outcome = analyzer::analyze(&changelog, &coverage, &settings, &mut aggregator);
    if let Err(e) = &outcome {
        tracing::error!(error = %e, recorded = aggregator.recorded(), "analysis aborted, saving partial results");
    }

    let artifacts = aggregator.finalize();
    println!(
        "Correlated {} changesets. Saving results to {}.",
        artifacts.per_changeset.len(),
        settings.outputdir.display()
    );

    // Every document of a run shares one timestamp.
    let timestamp = chrono::Utc::now().timestamp();
    report::save(&artifacts, &settings.outputdir, timestamp).context("saving reports")?;
    if let Some(files) = &artifacts.files_with_no_tests {
        println!("{} files have no tests.", files.len());
    }

    if !args.no_plot && !artifacts.per_changeset.is_empty() {
        renderer::render_histograms(&artifacts, &settings.outputdir, timestamp, args.width, args.height)
            .context("rendering histograms")?;
    }

    outcome?;
    Ok(())
}
