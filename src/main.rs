use clap::Parser;
use retail_scan::ScanConfig;
use retail_scan::sinks::{JsonLinesSink, ResultSink};
use std::error::Error;
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = ScanConfig::from_file(&args.config)?;
    args.apply(&mut config);
    config.validate()?;
    ::log::info!(
        "Loaded {} sites and {} search phrases from {}",
        config.sites.len(),
        config.search_phrases.len(),
        args.config.display()
    );

    let sink: Arc<dyn ResultSink> = match &args.output {
        Some(path) => Arc::new(JsonLinesSink::create(path)?),
        None => Arc::new(JsonLinesSink::stdout()),
    };

    let report = retail_scan::scan_with_config(&config, sink).await?;

    for (outcome, error) in report.failures() {
        ::log::warn!(
            "Item {} ({} / {}) failed: {}",
            outcome.index,
            outcome.site_name,
            outcome.search_phrase,
            error
        );
    }
    ::log::info!(
        "{} published, {} failed, {} seller rows skipped",
        report.succeeded(),
        report.failed(),
        report.outcomes.iter().map(|o| o.skipped_rows).sum::<usize>()
    );

    Ok(())
}
