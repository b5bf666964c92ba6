//! Request dispatch with bounded local retry
//!
//! Every call to the target goes through [`guarded`], which times the call
//! and turns a panic inside the client into an ordinary failure, so one bad
//! request cannot end the worker loop.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;

use crate::request::BulkBody;
use crate::traits::{TargetClient, TransportError};

use super::rate_limiter::RequestRateLimiter;
use super::stats::WorkerStats;

/// Why a single call produced no response
#[derive(Debug)]
pub(crate) enum CallError {
    Transport(TransportError),
    Panicked(String),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Transport(e) => write!(f, "{e}"),
            CallError::Panicked(msg) => write!(f, "client panicked: {msg}"),
        }
    }
}

/// Run `fut`, measuring its duration
pub(crate) async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = fut.await;
    (output, start.elapsed())
}

/// Time a target call and contain any panic it raises
pub(crate) async fn guarded<T, F>(fut: F) -> (Result<T, CallError>, Duration)
where
    F: Future<Output = Result<T, TransportError>>,
{
    let (outcome, elapsed) = timed(AssertUnwindSafe(fut).catch_unwind()).await;
    let result = match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Transport(e)),
        Err(panic) => Err(CallError::Panicked(panic_message(panic.as_ref()))),
    };
    (result, elapsed)
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// What a worker needs to talk to the target
pub(crate) struct Dispatch<'a> {
    pub worker_id: usize,
    pub client: &'a dyn TargetClient,
    pub collection: &'a str,
    pub max_retries: u32,
    pub rate_limiter: &'a RequestRateLimiter,
}

impl Dispatch<'_> {
    /// Send a batch write, retrying rejected items and transport failures
    ///
    /// Accepted items are counted as soon as a response arrives. Only the
    /// rejected operations are resent, strictly one attempt after another,
    /// until `max_retries` retries have been spent, counting from the
    /// `retries` already spent on the unit.
    pub async fn bulk_with_retry(
        &self,
        body: BulkBody,
        unit_count: usize,
        mut retries: u32,
        stats: &mut WorkerStats,
    ) {
        let mut pending = body;

        loop {
            self.rate_limiter.wait().await;
            let (result, elapsed) =
                guarded(self.client.write_batch(self.collection, &pending)).await;
            stats.record_request(elapsed);

            match result {
                Ok(response) => {
                    let failed: Vec<usize> = response
                        .failed_indices()
                        .into_iter()
                        .filter(|&i| i < pending.len())
                        .collect();
                    stats.record_success(pending.len() - failed.len());

                    if failed.is_empty() {
                        return;
                    }

                    let reason = response
                        .first_error()
                        .map(describe_item_error)
                        .unwrap_or_else(|| "unknown item error".to_string());

                    if retries < self.max_retries {
                        retries += 1;
                        stats.record_retry();
                        tracing::warn!(
                            worker_id = self.worker_id,
                            attempt = retries,
                            failed = failed.len(),
                            unit_count,
                            reason = %reason,
                            "Retrying rejected bulk items"
                        );
                        pending = pending.select(&failed);
                        continue;
                    }

                    stats.record_failure(failed.len());
                    stats.record_error(format!(
                        "{} items failed after {} retries: {reason}",
                        failed.len(),
                        retries
                    ));
                    tracing::error!(
                        worker_id = self.worker_id,
                        failed = failed.len(),
                        retries,
                        reason = %reason,
                        "Bulk items failed after exhausting retries"
                    );
                    return;
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        stats.record_retry();
                        tracing::warn!(
                            worker_id = self.worker_id,
                            attempt = retries,
                            items = pending.len(),
                            error = %e,
                            "Bulk request failed, retrying batch"
                        );
                        continue;
                    }

                    stats.record_failure(pending.len());
                    stats.record_error(format!(
                        "bulk request of {} items failed after {} retries: {e}",
                        pending.len(),
                        retries
                    ));
                    tracing::error!(
                        worker_id = self.worker_id,
                        items = pending.len(),
                        retries,
                        error = %e,
                        "Bulk request failed after exhausting retries"
                    );
                    return;
                }
            }
        }
    }

    /// Run a query once; a failed query is counted, never retried
    pub async fn query(&self, id: &str, body: &Value, stats: &mut WorkerStats) {
        self.rate_limiter.wait().await;
        let (result, elapsed) = guarded(self.client.query(self.collection, body)).await;
        stats.record_request(elapsed);

        match result {
            Ok(response) => {
                stats.record_success(1);
                if let Some(took) = response.took {
                    stats.record_took(took);
                }
            }
            Err(e) => {
                stats.record_failure(1);
                stats.record_error(format!("query {id} failed: {e}"));
                tracing::warn!(
                    worker_id = self.worker_id,
                    query_id = id,
                    error = %e,
                    "Query failed"
                );
            }
        }
    }
}

fn describe_item_error(error: &Value) -> String {
    match (error.get("type"), error.get("reason")) {
        (Some(kind), Some(reason)) => format!(
            "{}: {}",
            kind.as_str().unwrap_or_default(),
            reason.as_str().unwrap_or_default()
        ),
        (Some(kind), None) => kind.as_str().unwrap_or_default().to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_guarded_contains_panic() {
        let (result, _) = guarded(async {
            if true {
                panic!("boom");
            }
            Ok::<(), TransportError>(())
        })
        .await;

        match result {
            Err(CallError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guarded_maps_transport_error() {
        let (result, elapsed) = guarded(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<(), _>(TransportError::Connection("refused".into()))
        })
        .await;

        assert!(matches!(result, Err(CallError::Transport(_))));
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_describe_item_error() {
        assert_eq!(
            describe_item_error(&json!({ "type": "mapper_parsing_exception", "reason": "bad field" })),
            "mapper_parsing_exception: bad field"
        );
        assert_eq!(
            describe_item_error(&json!({ "type": "version_conflict" })),
            "version_conflict"
        );
        assert_eq!(describe_item_error(&json!("oops")), "\"oops\"");
    }
}
