//! Sequential page-by-page driver.
//!
//! Pages are processed strictly one after another: each page reaches its
//! terminal state (recorded or aborted) before the next URL is built.

#[cfg(test)]
mod tests;

use crate::aggregator::ResultAggregator;
use crate::config::HarvestConfig;
use crate::crawlers::{NavigateOptions, PageSource};
use crate::error::{ConfigError, ErrorKind, HarvestError, PageError};
use crate::extraction::{ExtractionEngine, Extractor};
use crate::gate::ContentGate;
use crate::results::{PageResult, PageStatus, RunSummary};
use crate::retry::{PageAttempt, PageOutcome, PageTask, RetryPolicy, run_with_retries};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use url::Url;

/// Note recorded when the extraction left no comment
const NO_COMMENT: &str = "Sin comentarios";

/// Build the URL of a listing page
///
/// Page 1 is the base URL itself; later pages carry `page_param=index` in the
/// query string. Other query segments are kept byte for byte, in order, and the
/// fragment is unchanged.
pub fn page_url(base_url: &str, page_param: &str, index: u32) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    if index <= 1 {
        return Ok(base_url.to_string());
    }

    let assignment = format!("{}=", page_param);
    let page = format!("{}{}", assignment, index);
    let query = {
        let mut segments: Vec<&str> = url
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|s| !s.is_empty() && *s != page_param && !s.starts_with(&assignment))
            .collect();
        segments.push(&page);
        segments.join("&")
    };
    url.set_query(Some(&query));
    Ok(url.to_string())
}

/// Where the run stands
#[derive(Debug, Clone, PartialEq)]
enum PageState {
    /// Next page to build a task for
    Pending(u32),
    /// Page recorded; decide whether to continue
    Recorded { index: u32, continue_run: bool },
    Completed,
}

/// Fetch, gate and extract for one page
struct ListingAttempt<'a, S, E> {
    source: &'a mut S,
    extractor: &'a Extractor<E>,
    gate: &'a ContentGate,
    navigate: NavigateOptions,
    load_delay: Duration,
    scroll_delay: Duration,
}

#[async_trait]
impl<'a, S, E> PageAttempt for ListingAttempt<'a, S, E>
where
    S: PageSource,
    E: ExtractionEngine,
{
    async fn perform(&mut self, task: &PageTask) -> Result<PageOutcome, PageError> {
        ::log::info!("Navigating to: {}", task.url);
        self.source.navigate(&task.url, &self.navigate).await?;
        tokio::time::sleep(self.load_delay).await;

        ::log::debug!("Scrolling page {} to load lazy content", task.index);
        match self.source.scroll_to_bottom().await {
            Ok(()) => tokio::time::sleep(self.scroll_delay).await,
            Err(e) => ::log::warn!("Scroll failed on page {}: {}", task.index, e),
        }

        let content = self.source.current_content().await?;
        if !self.gate.is_usable(&content) {
            ::log::warn!("Page {} looks empty, skipping", task.index);
            return Ok(PageOutcome::SkippedEmpty);
        }

        ::log::info!("Running extraction on page {}", task.index);
        let listing = self.extractor.extract(&content).await?;
        Ok(PageOutcome::Extracted(listing))
    }
}

/// Drives a run over pages `1..=max_pages`
pub struct PaginationDriver<E> {
    config: HarvestConfig,
    extractor: Extractor<E>,
    gate: ContentGate,
}

impl<E: ExtractionEngine> PaginationDriver<E> {
    pub fn new(config: HarvestConfig, extractor: Extractor<E>, gate: ContentGate) -> Self {
        Self {
            config,
            extractor,
            gate,
        }
    }

    /// Run every page, persist the results and release the source
    ///
    /// The source is closed exactly once on every exit path. On a fatal page
    /// error the pages recorded so far are still written before the error is
    /// returned.
    pub async fn run<S: PageSource>(
        &self,
        mut source: S,
        aggregator: &mut ResultAggregator,
    ) -> Result<RunSummary, HarvestError> {
        ::log::info!(
            "Starting run: {} pages, {} ms between pages",
            self.config.max_pages,
            self.config.page_delay_ms
        );

        let outcome = self.drive(&mut source, aggregator).await;

        if let Err(e) = source.close().await {
            ::log::warn!("Failed to close page source: {}", e);
        }

        match outcome {
            Ok(()) => aggregator.finalize(),
            Err(fatal) => {
                ::log::error!("Run aborted: {}", fatal);
                if let Err(e) = aggregator.finalize() {
                    ::log::error!("Could not save partial results: {}", e);
                }
                Err(fatal)
            }
        }
    }

    async fn drive<S: PageSource>(
        &self,
        source: &mut S,
        aggregator: &mut ResultAggregator,
    ) -> Result<(), HarvestError> {
        let policy = RetryPolicy {
            max_attempts: self.config.max_retries,
            inter_attempt_delay: self.config.retry_delay(),
        };
        let navigate = NavigateOptions {
            wait_strategy: self.config.wait_strategy,
            timeout: self.config.page_timeout(),
        };

        let mut state = PageState::Pending(1);
        loop {
            state = match state {
                PageState::Pending(index) => {
                    let url = page_url(&self.config.base_url, &self.config.page_param, index)
                        .map_err(|e| ConfigError::Invalid {
                            field: "urlBase",
                            reason: e.to_string(),
                        })?;
                    let mut task = PageTask::new(index, url, policy.max_attempts);
                    ::log::info!("Page {} of {}", index, self.config.max_pages);

                    let mut attempt = ListingAttempt {
                        source: &mut *source,
                        extractor: &self.extractor,
                        gate: &self.gate,
                        navigate,
                        load_delay: self.config.load_delay(),
                        scroll_delay: self.config.scroll_delay(),
                    };
                    let outcome = run_with_retries(&mut task, &policy, &mut attempt)
                        .await
                        .map_err(|error| HarvestError::Fatal {
                            page: index,
                            source: error,
                        })?;

                    let result = self.page_result(&task, outcome);
                    let continue_run = !(self.config.stop_without_next
                        && result.is_success()
                        && !result.has_next);
                    aggregator.record(result);
                    PageState::Recorded {
                        index,
                        continue_run,
                    }
                }
                PageState::Recorded { index, .. } if index >= self.config.max_pages => {
                    PageState::Completed
                }
                PageState::Recorded {
                    index,
                    continue_run: false,
                } => {
                    ::log::info!("Page {} reports no next page, stopping", index);
                    PageState::Completed
                }
                PageState::Recorded { index, .. } => {
                    ::log::info!(
                        "Waiting {} ms before the next page...",
                        self.config.page_delay_ms
                    );
                    tokio::time::sleep(self.config.page_delay()).await;
                    PageState::Pending(index + 1)
                }
                PageState::Completed => return Ok(()),
            };
        }
    }

    fn page_result(&self, task: &PageTask, outcome: PageOutcome) -> PageResult {
        let mut result = PageResult {
            page: task.index,
            url: task.url.clone(),
            status: PageStatus::Success,
            items: Vec::new(),
            reported_count: 0,
            has_next: false,
            timestamp: Utc::now(),
            note: String::new(),
            attempts: task.attempts,
            under_extracted: false,
            warning: None,
            error: None,
        };

        match outcome {
            PageOutcome::Extracted(listing) => {
                let count = listing.reported_items(self.config.max_items_per_page);
                ::log::info!(
                    "Page {} completed. Products found: {}",
                    task.index,
                    count
                );
                if count < self.config.min_expected_items {
                    ::log::warn!(
                        "Only {} products found on page {} (expected at least {}); comments: {}",
                        count,
                        task.index,
                        self.config.min_expected_items,
                        listing.note.as_deref().unwrap_or(NO_COMMENT)
                    );
                    result.under_extracted = true;
                    result.warning = Some(ErrorKind::UnderExtraction);
                }
                if listing.items.len() as u64 != count {
                    ::log::debug!(
                        "Page {} reported {} products but returned {}",
                        task.index,
                        count,
                        listing.items.len()
                    );
                }
                result.reported_count = count;
                result.has_next = listing.has_next;
                result.note = listing
                    .note
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| NO_COMMENT.to_string());
                result.items = listing.items;
            }
            PageOutcome::SkippedEmpty => {
                result.status = PageStatus::SkippedEmpty;
                result.warning = Some(ErrorKind::EmptyContent);
                result.note = "Content gate found no listing markers".to_string();
            }
            PageOutcome::Failed(failure) => {
                result.status = PageStatus::Failed;
                result.note = failure.message.clone();
                result.error = Some(failure);
            }
        }

        result
    }
}
