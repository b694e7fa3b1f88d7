use crate::error::PageError;
use crate::extraction::Listing;
use crate::results::PageFailure;
use async_trait::async_trait;
use std::time::Duration;

/// Bounded retry policy for one page
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub inter_attempt_delay: Duration,
}

/// One page to process, with its retry accounting
#[derive(Debug, Clone, PartialEq)]
pub struct PageTask {
    pub index: u32,
    pub url: String,
    /// Attempts made so far
    pub attempts: u32,
    pub max_attempts: u32,
}

impl PageTask {
    pub fn new(index: u32, url: String, max_attempts: u32) -> Self {
        Self {
            index,
            url,
            attempts: 0,
            max_attempts,
        }
    }
}

/// Terminal outcome of a page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Extraction produced a schema-valid listing, possibly with zero items
    Extracted(Listing),
    /// The content gate rejected the page
    SkippedEmpty,
    /// Retry budget exhausted, or a non-retryable page error
    Failed(PageFailure),
}

/// One fetch + gate + extract sequence for a page
#[async_trait]
pub trait PageAttempt: Send {
    async fn perform(&mut self, task: &PageTask) -> Result<PageOutcome, PageError>;
}

/// Run `attempt` until it yields an outcome or the retry budget is spent
///
/// Retryable errors consume the budget and wait `inter_attempt_delay` before the
/// next try. Non-retryable page errors become a failed outcome right away. Fatal
/// errors are returned as `Err` without consuming further budget.
pub async fn run_with_retries<A: PageAttempt + ?Sized>(
    task: &mut PageTask,
    policy: &RetryPolicy,
    attempt: &mut A,
) -> Result<PageOutcome, PageError> {
    loop {
        task.attempts += 1;
        ::log::info!(
            "Processing page {} (attempt {} of {})",
            task.index,
            task.attempts,
            policy.max_attempts
        );

        let error = match attempt.perform(task).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => e,
        };

        if error.is_fatal() {
            ::log::error!("Fatal error on page {}: {}", task.index, error);
            return Err(error);
        }

        if !error.is_retryable() {
            ::log::warn!(
                "Page {} failed without retry ({}): {}",
                task.index,
                error.kind(),
                error
            );
            return Ok(PageOutcome::Failed(failure(&error)));
        }

        ::log::error!(
            "Error on page {} (attempt {}): {}",
            task.index,
            task.attempts,
            error
        );

        if task.attempts >= policy.max_attempts {
            ::log::warn!(
                "Skipping page {} after {} failed attempts",
                task.index,
                task.attempts
            );
            return Ok(PageOutcome::Failed(failure(&error)));
        }

        ::log::info!(
            "Retrying page {} in {} ms",
            task.index,
            policy.inter_attempt_delay.as_millis()
        );
        tokio::time::sleep(policy.inter_attempt_delay).await;
    }
}

fn failure(error: &PageError) -> PageFailure {
    PageFailure {
        kind: error.kind(),
        message: error.to_string(),
    }
}
