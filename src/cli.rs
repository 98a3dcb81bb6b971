//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Backoff strategy selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffArg {
    Exponential,
    Fixed,
}

/// Mirror the public file tree of a Yandex.Disk share.
///
/// Without --output the files are listed, one "<path> <url>" line each.
/// With --output they are downloaded into a local folder tree.
#[derive(Parser, Debug)]
#[command(name = "yadloader")]
#[command(author, version, about)]
pub struct Args {
    /// Public link of the share
    #[arg(short, long)]
    pub link: String,

    /// Folder inside the share to start from
    #[arg(short, long, default_value = "/")]
    pub path: String,

    /// Download into this directory instead of listing
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the listing as a JSON array
    #[arg(long, conflicts_with = "output")]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Items per listing page (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub limit: Option<u32>,

    /// Request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Pause between listing pages of one folder, in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub page_delay: Option<u64>,

    /// Retries after a failed request (0-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: Option<u32>,

    /// Wait before the first retry, in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=600_000))]
    pub retry_wait: Option<u64>,

    /// How retry waits grow
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffArg>,

    /// Download buffer size in bytes
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..=(256 * 1024 * 1024)))]
    pub chunk_size: Option<u64>,

    /// Fail when the tree is deeper than this
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Fail when the share holds more files than this
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Verify size and SHA-256 of every download
    #[arg(long)]
    pub verify: bool,

    /// Stop at the first failed download
    #[arg(long)]
    pub fail_fast: bool,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,

    /// API base URL
    #[arg(long, hide = true)]
    pub api_base: Option<String>,
}
