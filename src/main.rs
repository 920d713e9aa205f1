use clap::Parser;
use sift_page::{Scrape, ScrapeResult};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    ::log::info!("Starting scrape of {}", args.url);

    let mut scrape = Scrape::new(args.url.as_str()).with_strategy(args.strategy());
    if let Some(path) = &args.config {
        scrape = match scrape.with_config_file(path) {
            Ok(scrape) => scrape,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
    }
    if let Some(max_depth) = args.max_depth {
        scrape = scrape.with_max_depth(max_depth);
    }

    let result = match scrape.run().await {
        Ok(result) => result,
        Err(e) => {
            ::log::error!("Failed to start scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match render_output(&result, args.pretty) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Failed to serialize result: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render_output(result: &ScrapeResult, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    }
}
