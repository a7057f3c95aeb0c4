//! Consumer-side wait loop.
//!
//! After uploading an image, the client derives the article key and polls
//! the store until the article object appears or a wall-clock budget
//! elapses. The loop distinguishes three terminal states that must never be
//! conflated:
//!
//! - **Found**: the object exists; stop and fetch.
//! - **TimedOut**: budget elapsed while the store kept answering
//!   not-found. A normal outcome when the producer is slow or failed.
//! - **StoreFailed**: the store answered with anything other than
//!   not-found (unreachable, access denied). The loop stops immediately
//!   rather than burning the rest of its budget.
//!
//! There is no ordering guarantee against the producer: zero, one, or many
//! not-found responses may precede success, and the first check happens
//! immediately.

use crate::error::StoreError;
use crate::metrics;
use crate::store::{ObjectHead, ObjectStore};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Terminal state of one wait.
#[derive(Debug)]
pub enum WaitOutcome {
    Found(ObjectHead),
    TimedOut,
    StoreFailed(StoreError),
}

/// An article split into its title line and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub body: String,
}

/// Body text substituted when the generated article is a single line.
pub const EMPTY_BODY_PLACEHOLDER: &str = "(No additional article content provided.)";

/// Poll the store for `key` until it exists, the budget elapses, or the
/// store fails with something other than not-found.
pub async fn wait_for_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    timeout: Duration,
    interval: Duration,
) -> WaitOutcome {
    let start = Instant::now();
    let timer = metrics::Timer::new();
    let mut checks: u64 = 0;

    let outcome = loop {
        checks += 1;
        match store.head(bucket, key).await {
            Ok(head) => break WaitOutcome::Found(head),
            Err(err) if err.is_not_found() => {
                if start.elapsed() >= timeout {
                    break WaitOutcome::TimedOut;
                }
                sleep(interval).await;
            }
            Err(err) => {
                warn!(bucket, key, error = %err, "store failed during poll, aborting wait");
                break WaitOutcome::StoreFailed(err);
            }
        }
    };

    timer.observe_duration_seconds(&metrics::WAIT_DURATION);
    let label = match &outcome {
        WaitOutcome::Found(_) => "found",
        WaitOutcome::TimedOut => "timeout",
        WaitOutcome::StoreFailed(_) => "store_error",
    };
    metrics::POLL_RESULTS.with_label_values(&[label]).inc();
    debug!(
        bucket,
        key,
        checks,
        elapsed_ms = start.elapsed().as_millis() as u64,
        result = label,
        "wait finished"
    );
    outcome
}

/// Fetch the article object and split it into title and body.
///
/// First line is the title; the remainder is the body. A single-line article
/// gets a placeholder body rather than an empty one.
pub async fn fetch_article(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Article, StoreError> {
    let object = store.get(bucket, key).await?;
    let text = String::from_utf8(object.bytes)
        .map_err(|_| StoreError::Backend(format!("article at {} is not valid UTF-8", key)))?;
    Ok(split_article(&text))
}

fn split_article(text: &str) -> Article {
    let trimmed = text.trim();
    match trimmed.split_once('\n') {
        Some((title, body)) => Article {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
        },
        None => Article {
            title: trimmed.to_string(),
            body: EMPTY_BODY_PLACEHOLDER.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_title_and_body() {
        let article = split_article("Big News\n\nSomething happened.\nMore detail.");
        assert_eq!(article.title, "Big News");
        assert_eq!(article.body, "Something happened.\nMore detail.");
    }

    #[test]
    fn single_line_gets_placeholder_body() {
        let article = split_article("Only a headline");
        assert_eq!(article.title, "Only a headline");
        assert_eq!(article.body, EMPTY_BODY_PLACEHOLDER);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let article = split_article("  Title  \n  body text  \n");
        assert_eq!(article.title, "Title");
        assert_eq!(article.body, "body text");
    }
}
