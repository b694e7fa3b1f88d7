use clap::Parser;
use page_harvest::RunSummary;
use std::process::ExitCode;

mod args;
use args::{Args, build_harvest};

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may live in a .env file next to the config
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();

    let harvest = match build_harvest(&args) {
        Ok(harvest) => harvest,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = harvest.config();
    ::log::info!(
        "Starting extraction of {} pages from {}",
        config.max_pages,
        config.base_url
    );
    println!("Note: extraction requires a WebDriver server (e.g., ChromeDriver).");
    println!("Set WEBDRIVER_URL if not using {}", config.webdriver_url);

    match harvest.run().await {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    ::log::info!(
        "Run complete - {} of {} pages processed in {:.2} seconds",
        summary.pages_attempted,
        summary.requested_pages,
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    ::log::info!(
        "{} succeeded, {} failed, {} empty, {} with few products",
        summary.pages_succeeded,
        summary.pages_failed,
        summary.pages_skipped,
        summary.pages_under_extracted
    );
    ::log::info!(
        "{} products extracted ({} per successful page)",
        summary.total_items,
        summary.mean_items_per_page
    );
    for failure in &summary.failures {
        ::log::warn!(
            "Page {} failed ({}): {}",
            failure.page,
            failure.kind,
            failure.message
        );
    }
}
