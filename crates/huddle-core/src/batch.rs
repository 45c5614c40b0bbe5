//! Fan-out helpers for passes that touch many independent items.
//!
//! A bulk pass issues its per-item operations together and waits for all
//! of them. One item failing never aborts the others; failures are
//! collected into the [`BatchReport`] and logged once each.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

use crate::error::{HuddleError, HuddleResult};

/// A single item that failed inside a batch.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub item: String,
    pub error: HuddleError,
}

/// Outcome of a batch: successful values in input order, plus failures.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<ItemFailure>,
}

impl<T> BatchReport<T> {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Run every labelled future concurrently and wait for all of them.
pub async fn settle<T, F, I>(batch: &str, items: I) -> BatchReport<T>
where
    I: IntoIterator<Item = (String, F)>,
    F: Future<Output = HuddleResult<T>>,
{
    let (labels, futures): (Vec<String>, Vec<F>) = items.into_iter().unzip();
    let results = join_all(futures).await;

    let mut report = BatchReport::default();
    for (item, result) in labels.into_iter().zip(results) {
        match result {
            Ok(value) => report.succeeded.push(value),
            Err(error) => {
                tracing::warn!(batch, item = %item, error = %error, "item failed, skipping");
                report.failed.push(ItemFailure { item, error });
            }
        }
    }
    report
}

/// Bound an external call. Expiry maps to `ExternalUnavailable`.
pub async fn with_timeout<T, F>(service: &str, limit: Duration, fut: F) -> HuddleResult<T>
where
    F: Future<Output = HuddleResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(HuddleError::external(
            service,
            format!("no response within {}ms", limit.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_do_not_abort_the_rest() {
        let items = (0..5).map(|i| {
            let label = format!("item-{i}");
            let fut = async move {
                if i == 2 {
                    Err(HuddleError::validation("bad item"))
                } else {
                    Ok(i * 10)
                }
            };
            (label, fut)
        });

        let report = settle("test", items).await;
        assert_eq!(report.succeeded, vec![0, 10, 30, 40]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item, "item-2");
        assert_eq!(report.total(), 5);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn empty_batch_is_clean() {
        let report: BatchReport<()> =
            settle("empty", Vec::<(String, std::future::Ready<HuddleResult<()>>)>::new()).await;
        assert!(report.is_clean());
        assert_eq!(report.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_external_unavailable() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, HuddleError>(())
        };
        let err = with_timeout("video", Duration::from_secs(1), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, HuddleError::ExternalUnavailable { .. }));
    }
}
