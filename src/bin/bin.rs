use anyhow::Result;
use log::info;
use structopt::StructOpt;
use summarize::{template::ClusterConfig, Options};

fn main() -> Result<()> {
    // Load from .env file if it is present
    dotenv::dotenv().ok();
    // Initialize logging, showing skipped lines unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    // Get command line arguments
    let options = Options::from_args();
    let stats = summarize::run(&options, ClusterConfig::default())?;
    info!(
        "Scanned {} lines in {} file passes. {} occurrences in {} templates, {} malformed lines, {} symbols, {} summary rows.",
        stats.lines,
        stats.files,
        stats.occurrences,
        stats.templates,
        stats.malformed,
        stats.symbols,
        stats.summary_rows
    );
    Ok(())
}
