// src/cli.rs

use crate::config::EmptyChangesets;
use crate::model::Mode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of changesets to analyze
    #[arg(short, long)]
    pub numpatches: Option<usize>,

    /// Changeset to start walking back from
    #[arg(short, long)]
    pub startrev: Option<String>,

    /// Branch whose history is walked
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Directory to save the JSON reports and histograms
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Coverage query strategy
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Handling of changesets that modify no files
    #[arg(long, value_enum)]
    pub empty_changesets: Option<EmptyChangesets>,

    /// Skip rendering the histograms
    #[arg(long)]
    pub no_plot: bool,

    /// Width of the histogram images in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Height of the histogram images in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}
