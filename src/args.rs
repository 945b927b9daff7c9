use clap::Parser;
use retail_scan::ScanConfig;
use retail_scan::config::FetcherConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "retail-scan")]
#[command(about = "Extracts product and seller data from shopping search results")]
#[command(version)]
pub struct Args {
    /// Path to the scan configuration (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the number of plan items processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the per-item deadline in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub item_timeout: Option<u64>,

    /// Write results as JSON lines to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Save every fetched page to this directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Read pages saved by an earlier run instead of fetching them
    #[arg(long, conflicts_with = "snapshot_dir")]
    pub replay_dir: Option<PathBuf>,
}

impl Args {
    /// Applies command-line overrides to a loaded configuration
    pub fn apply(&self, config: &mut ScanConfig) {
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(item_timeout) = self.item_timeout {
            config.item_timeout_secs = item_timeout;
        }
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.replay_dir {
            config.fetcher = FetcherConfig::File { dir: dir.clone() };
            config.snapshot_dir = None;
        }
    }
}
