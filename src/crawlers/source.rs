use crate::error::NavigationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// The DOM has been parsed; images and late scripts may still be loading
    #[default]
    DomContentLoaded,
    /// The whole document, including subresources, has loaded
    Load,
}

/// Per-navigation options
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub wait_strategy: WaitStrategy,
    pub timeout: Duration,
}

/// Navigation context owned by a run
///
/// Implementations are used by a single driver, one page at a time.
#[async_trait]
pub trait PageSource: Send {
    /// Navigate to `url` and return the content once the wait strategy is satisfied
    async fn navigate(
        &mut self,
        url: &str,
        options: &NavigateOptions,
    ) -> Result<String, NavigationError>;

    /// Scroll to the bottom of the page so lazy-loaded content materializes
    async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError>;

    /// Content of the current page as it is now
    async fn current_content(&mut self) -> Result<String, NavigationError>;

    /// Release the navigation context; called exactly once per run
    async fn close(&mut self) -> Result<(), NavigationError>;
}
