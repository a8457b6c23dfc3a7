//! Preparation Scheduler (C9): drives C6 → C7 for many specifications with
//! bounded parallelism and cooperative cancellation.

use crate::error::PreparationError;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

/// Checked at the boundary between major steps (resolver start, per-template
/// write loop, dependency discovery) per §4.9. Cloning shares the same flag;
/// callers typically hold one `CancellationToken` and clone it into every
/// spawned spec task.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns a cancellation error carrying `spec` if the token has fired.
    pub fn check(&self, spec: &str) -> Result<(), PreparationError> {
        if self.is_cancelled() {
            Err(PreparationError::Cancelled { spec: spec.to_string() })
        } else {
            Ok(())
        }
    }
}

/// Runs `prepare_one` for every entry in `specs` with at most `parallelism`
/// concurrent in flight. Specs are independent: one's failure never aborts
/// the others, matching §4.9's "Results are `{ spec -> Result<...> }`".
pub async fn run_all<T, F, Fut>(
    specs: Vec<String>,
    parallelism: usize,
    cancellation: CancellationToken,
    prepare_one: F,
) -> BTreeMap<String, Result<T, PreparationError>>
where
    F: Fn(String, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, PreparationError>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let prepare_one = Arc::new(prepare_one);
    let mut handles = Vec::with_capacity(specs.len());

    for spec in specs {
        let semaphore = semaphore.clone();
        let prepare_one = prepare_one.clone();
        let token = cancellation.clone();
        let spec_for_task = spec.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let result = prepare_one(spec_for_task.clone(), token).await;
            (spec_for_task, result)
        }));
    }

    let mut results = BTreeMap::new();
    for handle in handles {
        match handle.await {
            Ok((spec, result)) => {
                results.insert(spec, result);
            }
            Err(join_error) => {
                tracing::error!(%join_error, "preparation task panicked");
            }
        }
    }
    results
}

/// Default parallelism cap: hardware concurrency, overridable by the caller
/// per §4.9 ("N specifications and a parallelism cap P, default hardware
/// concurrency").
pub fn default_parallelism() -> usize {
    num_cpus::get()
}
