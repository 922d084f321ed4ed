//! Command-line arguments for the `dreamshift` binary.

use crate::core::BucketWidth;
use crate::filter::PostCategory;
use crate::pipeline::{
    BoxedAnalysis, Correlate, Independence, Inspect, Regress, SampleSize, DEFAULT_HALF_WIDTH_DAYS,
    DEFAULT_YEAR,
};
use crate::stats::bootstrap::DEFAULT_SEED;
use crate::stats::BootstrapConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dreamshift")]
#[command(version)]
#[command(
    about = "News coverage and dream-report statistics around the 2020 pandemic declaration",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: $DREAMSHIFT_CONFIG, then ./dreamshift.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Weekly news share vs. next-week dream anxiety (Spearman)
    Correlate(CorrelateArgs),
    /// Segmented regression of daily dream anxiety
    Regress(RegressArgs),
    /// Nightmare frequency before vs. after the anchor (chi-square)
    Independence(IndependenceArgs),
    /// Daily post-count descriptives
    Samplesize(WindowArgs),
    /// Export a sorted post-level view for manual reading
    Inspect(WindowArgs),
    /// Create the source and derivatives directories
    Init,
}

/// Options shared by every analysis.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Analysis year; the anchor is March 11 of this year
    #[arg(short, long, default_value_t = DEFAULT_YEAR)]
    pub year: i32,

    /// Post group: dreams or wake
    #[arg(short, long, default_value = "dreams", value_name = "POSTS")]
    pub posts: PostCategory,
}

#[derive(Args, Debug, Clone)]
pub struct CorrelateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Buckets by which dream anxiety trails the news
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub lag: i64,

    /// Bucket width: daily or weekly
    #[arg(long, default_value = "weekly")]
    pub bucket: BucketWidth,
}

#[derive(Args, Debug, Clone)]
pub struct RegressArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Day shift applied to the daily means
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub lag: i64,

    /// Days on each side of the anchor
    #[arg(long, default_value_t = DEFAULT_HALF_WIDTH_DAYS)]
    pub half_width_days: i64,
}

#[derive(Args, Debug, Clone)]
pub struct IndependenceArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Days on each side of the anchor
    #[arg(long, default_value_t = DEFAULT_HALF_WIDTH_DAYS)]
    pub half_width_days: i64,

    /// Bootstrap resamples per group
    #[arg(long, default_value_t = 10_000)]
    pub n_boot: usize,

    /// Bootstrap seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Analysis year; the anchor is March 11 of this year
    #[arg(short, long, default_value_t = DEFAULT_YEAR)]
    pub year: i32,

    /// Days on each side of the anchor
    #[arg(long, default_value_t = DEFAULT_HALF_WIDTH_DAYS)]
    pub half_width_days: i64,
}

impl Command {
    /// The analysis to run, or `None` for [`Command::Init`].
    pub fn into_analysis(self) -> Option<BoxedAnalysis> {
        let analysis: BoxedAnalysis = match self {
            Command::Correlate(args) => Box::new(Correlate {
                year: args.common.year,
                posts: args.common.posts,
                lag: args.lag,
                bucket: args.bucket,
            }),
            Command::Regress(args) => Box::new(Regress {
                year: args.common.year,
                posts: args.common.posts,
                lag: args.lag,
                half_width_days: args.half_width_days,
                ..Regress::default()
            }),
            Command::Independence(args) => Box::new(Independence {
                year: args.common.year,
                posts: args.common.posts,
                half_width_days: args.half_width_days,
                bootstrap: BootstrapConfig::new(args.n_boot).with_seed(args.seed),
            }),
            Command::Samplesize(args) => Box::new(SampleSize {
                year: args.year,
                half_width_days: args.half_width_days,
            }),
            Command::Inspect(args) => Box::new(Inspect {
                year: args.year,
                half_width_days: args.half_width_days,
            }),
            Command::Init => return None,
        };
        Some(analysis)
    }
}
