use clap::Parser;
use page_harvest::{Harvest, HarvestConfig, HarvestError};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(about = "Walks a paginated listing in a browser and extracts typed records with an LLM")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (keys as in the `configuracion` block of the results)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// URL of the first listing page
    #[arg(short, long)]
    pub url: Option<String>,

    /// Number of pages to visit
    #[arg(short = 'p', long)]
    pub max_pages: Option<u32>,

    /// Attempts per page before it is recorded as failed
    #[arg(short = 'r', long)]
    pub max_retries: Option<u32>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Only write the final results file
    #[arg(long)]
    pub no_per_page: bool,

    /// Directory for the result files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver endpoint
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Extraction model
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Build the run from the config file (or defaults) and the command-line overrides
pub fn build_harvest(args: &Args) -> Result<Harvest, HarvestError> {
    let mut harvest = match &args.config {
        Some(path) => Harvest::with_config_file(path)?,
        None => Harvest::new(HarvestConfig::default()),
    };

    if let Some(url) = &args.url {
        harvest = harvest.with_base_url(url);
    }
    if let Some(max_pages) = args.max_pages {
        harvest = harvest.with_max_pages(max_pages);
    }
    if let Some(max_retries) = args.max_retries {
        harvest = harvest.with_max_retries(max_retries);
    }
    if args.headless {
        harvest = harvest.with_headless(true);
    }
    if args.no_per_page {
        harvest = harvest.with_save_per_page(false);
    }
    if let Some(dir) = &args.output_dir {
        harvest = harvest.with_output_dir(dir.clone());
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        harvest = harvest.with_webdriver_url(webdriver_url);
    }
    if let Some(model) = &args.model {
        harvest = harvest.with_model(model);
    }

    Ok(harvest)
}
