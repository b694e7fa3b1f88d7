// Re-export modules
pub mod aggregator;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod extraction;
pub mod gate;
pub mod pagination;
pub mod parsers;
pub mod results;
pub mod retry;
pub mod schema;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::HarvestConfig;
pub use error::HarvestError;
pub use results::{FailureRecord, PageResult, RunSummary};

use aggregator::ResultAggregator;
use crawlers::WebDriverSource;
use extraction::openai::API_KEY_VAR;
use extraction::{Extractor, OpenAiEngine};
use gate::ContentGate;
use pagination::PaginationDriver;
use schema::ExtractionSchema;
use std::path::PathBuf;

/// Main builder for a paginated extraction run
pub struct Harvest {
    config: HarvestConfig,
}

impl Harvest {
    /// Create a new builder from a configuration
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(path: impl AsRef<std::path::Path>) -> Result<Self, HarvestError> {
        Ok(Self::new(HarvestConfig::from_file(path)?))
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Override the number of pages to visit
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Override the attempts per page
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Run the browser without a window
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Enable or disable per-page artifacts
    pub fn with_save_per_page(mut self, save_per_page: bool) -> Self {
        self.config.save_per_page = save_per_page;
        self
    }

    /// Set the first listing page
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Set the artifact directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Set the WebDriver endpoint
    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Set the extraction model
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Validate, acquire the browser and the extraction engine, and run every page
    ///
    /// The credential is checked before the browser is launched, so a missing key
    /// fails fast without touching the listing site.
    pub async fn run(mut self) -> Result<RunSummary, HarvestError> {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.config.webdriver_url = webdriver_url;
            }
        }

        self.config.validate()?;

        let engine = extraction_engine(std::env::var(API_KEY_VAR).ok(), &self.config)?;
        ::log::info!("Using extraction model {}", engine.model_name());

        let schema = ExtractionSchema::product_listing(self.config.max_items_per_page).map_err(
            |e| error::ConfigError::Invalid {
                field: "maxProductosPorPagina",
                reason: e.to_string(),
            },
        )?;
        let gate = ContentGate::new(&self.config.content_markers).map_err(|e| {
            error::ConfigError::Invalid {
                field: "marcadoresContenido",
                reason: e.to_string(),
            }
        })?;
        let mut aggregator = ResultAggregator::new(&self.config)?;

        let source = WebDriverSource::connect(&self.config.webdriver_url, self.config.headless).await?;

        let extractor = Extractor::new(engine, schema, self.config.format);
        let driver = PaginationDriver::new(self.config, extractor, gate);
        driver.run(source, &mut aggregator).await
    }
}

/// Build the extraction engine; only an absent or blank key is a missing credential
fn extraction_engine(
    api_key: Option<String>,
    config: &HarvestConfig,
) -> Result<OpenAiEngine, HarvestError> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ::log::error!("{} is not set", API_KEY_VAR);
            HarvestError::MissingCredential(API_KEY_VAR.to_string())
        })?;
    OpenAiEngine::new(
        Some(api_key),
        &config.model,
        &config.api_base,
        config.extraction_timeout(),
    )
    .map_err(HarvestError::Engine)
}
