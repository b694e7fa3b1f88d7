use crate::crawlers::WaitStrategy;
use crate::error::ConfigError;
use crate::parsers::ContentFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Configuration for a paginated extraction run
///
/// Keys follow the names used in the run artifacts (`maxPaginas`, `delayCarga`, ...)
/// so the `configuracion` block of the final artifact can be fed back as a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// URL of the first listing page
    #[serde(rename = "urlBase", default = "default_base_url")]
    pub base_url: String,

    /// Query parameter carrying the page number for pages after the first
    #[serde(rename = "parametroPagina", default = "default_page_param")]
    pub page_param: String,

    /// Number of pages to visit
    #[serde(rename = "maxPaginas", default = "default_max_pages")]
    pub max_pages: u32,

    /// Delay between pages (ms)
    #[serde(rename = "delayEntrePaginas", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Settle time after navigation before reading content (ms)
    #[serde(rename = "delayCarga", default = "default_load_delay_ms")]
    pub load_delay_ms: u64,

    /// Settle time after scrolling to the bottom (ms)
    #[serde(rename = "delayScroll", default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    /// Delay between attempts at the same page (ms)
    #[serde(rename = "delayReintento", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Navigation timeout (ms)
    #[serde(rename = "timeoutPagina", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// When navigation counts as finished
    #[serde(rename = "estrategiaEspera", default)]
    pub wait_strategy: WaitStrategy,

    /// Run the browser without a window
    #[serde(default)]
    pub headless: bool,

    /// Write one artifact per page in addition to the final one
    #[serde(rename = "guardarPorPagina", default = "default_true")]
    pub save_per_page: bool,

    /// Attempts per page before it is recorded as failed
    #[serde(rename = "maxReintentos", default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on items the schema accepts per page
    #[serde(rename = "maxProductosPorPagina", default = "default_max_items")]
    pub max_items_per_page: usize,

    /// Pages reporting fewer items than this are flagged as under-extracted
    #[serde(rename = "minProductosEsperados", default = "default_min_expected_items")]
    pub min_expected_items: u64,

    /// Finish early once a page reports there is no next page
    #[serde(rename = "detenerSinSiguiente", default)]
    pub stop_without_next: bool,

    /// Regex patterns; page content must match at least one to be extracted
    #[serde(rename = "marcadoresContenido", default = "default_content_markers")]
    pub content_markers: Vec<String>,

    /// How page content is serialized for the extraction call
    #[serde(rename = "formato", default)]
    pub format: ContentFormat,

    /// Extraction model name
    #[serde(rename = "modelo", default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(rename = "urlApi", default = "default_api_base")]
    pub api_base: String,

    /// Timeout for a single extraction call (ms)
    #[serde(rename = "timeoutExtraccion", default = "default_extraction_timeout_ms")]
    pub extraction_timeout_ms: u64,

    /// URL for the WebDriver instance
    #[serde(rename = "webdriverUrl", default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Directory where artifacts are written
    #[serde(rename = "directorioSalida", default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File name prefix for artifacts
    #[serde(rename = "prefijoArchivos", default = "default_artifact_prefix")]
    pub artifact_prefix: String,
}

fn default_base_url() -> String {
    "https://www.mercadolibre.com.ar/ofertas?promotion_type=deal_of_the_day#filter_applied=promotion_type&filter_position=3&origin=qcat".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_max_pages() -> u32 {
    3
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_load_delay_ms() -> u64 {
    5000
}

fn default_scroll_delay_ms() -> u64 {
    2000
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_page_timeout_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_items() -> usize {
    100
}

fn default_min_expected_items() -> u64 {
    15
}

fn default_content_markers() -> Vec<String> {
    vec!["producto".to_string(), "item".to_string()]
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_extraction_timeout_ms() -> u64 {
    120_000
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_artifact_prefix() -> String {
    "resultados_completos".to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_param: default_page_param(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            load_delay_ms: default_load_delay_ms(),
            scroll_delay_ms: default_scroll_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            wait_strategy: WaitStrategy::default(),
            headless: false,
            save_per_page: true,
            max_retries: default_max_retries(),
            max_items_per_page: default_max_items(),
            min_expected_items: default_min_expected_items(),
            stop_without_next: false,
            content_markers: default_content_markers(),
            format: ContentFormat::default(),
            model: default_model(),
            api_base: default_api_base(),
            extraction_timeout_ms: default_extraction_timeout_ms(),
            webdriver_url: default_webdriver_url(),
            output_dir: default_output_dir(),
            artifact_prefix: default_artifact_prefix(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check option values that serde cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(invalid("maxPaginas", "must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(invalid("maxReintentos", "must be at least 1"));
        }
        if self.max_items_per_page == 0 {
            return Err(invalid("maxProductosPorPagina", "must be at least 1"));
        }
        if self.page_param.trim().is_empty() {
            return Err(invalid("parametroPagina", "must not be empty"));
        }
        if self.artifact_prefix.trim().is_empty() {
            return Err(invalid("prefijoArchivos", "must not be empty"));
        }
        Url::parse(&self.base_url).map_err(|e| invalid("urlBase", e.to_string()))?;
        Url::parse(&self.api_base).map_err(|e| invalid("urlApi", e.to_string()))?;
        if self.content_markers.is_empty() {
            return Err(invalid("marcadoresContenido", "at least one marker is required"));
        }
        for pattern in &self.content_markers {
            Regex::new(pattern).map_err(|e| invalid("marcadoresContenido", e.to_string()))?;
        }
        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
