use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Classification attached to failures and warnings in the run artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Missing or rejected credential; aborts the run
    FatalConfig,
    /// Navigation did not finish within the page timeout
    NavigationTimeout,
    /// Navigation failed for another reason (connection refused, lost session, ...)
    NavigationError,
    /// The extraction provider call failed (network, timeout, rate limit)
    ProviderError,
    /// The content gate rejected the page
    EmptyContent,
    /// The provider answered but the answer does not fit the schema
    MalformedOutput,
    /// Extraction succeeded with fewer items than expected
    UnderExtraction,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::FatalConfig => "fatal-config",
            ErrorKind::NavigationTimeout => "navigation-timeout",
            ErrorKind::NavigationError => "navigation-error",
            ErrorKind::ProviderError => "provider-error",
            ErrorKind::EmptyContent => "empty-content",
            ErrorKind::MalformedOutput => "malformed-output",
            ErrorKind::UnderExtraction => "under-extraction",
        };
        f.write_str(s)
    }
}

/// Invalid configuration values or an unreadable configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures raised by a page source while navigating
#[derive(Error, Debug, Clone)]
pub enum NavigationError {
    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {message}")]
    Failed { url: String, message: String },

    #[error("browser session lost: {0}")]
    SessionLost(String),
}

/// Failures raised by the structured extraction boundary
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("malformed extraction output: {0}")]
    MalformedOutput(String),

    #[error("extraction provider error: {0}")]
    Provider(String),

    #[error("extraction misconfigured: {0}")]
    FatalConfig(String),
}

/// Failure of a single page attempt
#[derive(Error, Debug, Clone)]
pub enum PageError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl PageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PageError::Navigation(NavigationError::Timeout { .. }) => ErrorKind::NavigationTimeout,
            PageError::Navigation(_) => ErrorKind::NavigationError,
            PageError::Extraction(ExtractionError::MalformedOutput(_)) => {
                ErrorKind::MalformedOutput
            }
            PageError::Extraction(ExtractionError::Provider(_)) => ErrorKind::ProviderError,
            PageError::Extraction(ExtractionError::FatalConfig(_)) => ErrorKind::FatalConfig,
        }
    }

    /// Whether another attempt at the same page may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NavigationTimeout | ErrorKind::NavigationError | ErrorKind::ProviderError
        )
    }

    /// Whether the error invalidates the whole run
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::FatalConfig
    }
}

/// Conditions that end a run with a non-zero exit
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("required credential {0} is not set")]
    MissingCredential(String),

    #[error("could not set up extraction engine: {0}")]
    Engine(ExtractionError),

    #[error("could not start browser session: {0}")]
    Browser(String),

    #[error("page {page} aborted the run: {source}")]
    Fatal { page: u32, source: PageError },

    #[error("failed to write artifact {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}
