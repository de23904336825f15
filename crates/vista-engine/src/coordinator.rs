use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use vista_core::RefreshError;
use vista_telemetry::MetricsRecorder;

use crate::source::{RefreshMode, RefreshSource};

/// Result of one fan-out pass. Per-source UI error state lives on the
/// sources themselves; this report is for callers and logging.
#[derive(Clone, Debug, Default)]
pub struct RefreshOutcome {
    /// Sources the pass attempted.
    pub attempted: usize,
    /// Source name + error text for each failed source.
    pub failures: Vec<(String, String)>,
}

impl RefreshOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fans a refresh request out to every data source feeding one view.
///
/// Sources refresh concurrently and reconcile independently: a slow or
/// failing stats source never blocks or rolls back the list source next to
/// it. Silent failures are logged and swallowed (the view keeps its prior
/// data); explicit failures are additionally surfaced by each source as
/// retryable view state.
pub struct ViewRefreshCoordinator {
    sources: Vec<Arc<dyn RefreshSource>>,
    cancel: CancellationToken,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl ViewRefreshCoordinator {
    pub fn new(sources: Vec<Arc<dyn RefreshSource>>) -> Self {
        Self {
            sources,
            cancel: CancellationToken::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Refresh every source concurrently. A no-op after cancellation.
    pub async fn refresh_all(&self, mode: RefreshMode) -> RefreshOutcome {
        if self.cancel.is_cancelled() {
            return RefreshOutcome::default();
        }

        if let Some(metrics) = &self.metrics {
            metrics.counter_inc("refresh.runs", &[("mode", mode.as_str())], 1);
        }
        let started = tokio::time::Instant::now();

        let passes = self.sources.iter().map(|source| {
            let cancel = self.cancel.clone();
            async move {
                let result = tokio::select! {
                    () = cancel.cancelled() => Err(RefreshError::Cancelled),
                    result = source.refresh(mode) => result,
                };
                (source.name().to_string(), result)
            }
        });

        let mut outcome = RefreshOutcome {
            attempted: self.sources.len(),
            failures: Vec::new(),
        };

        for (name, result) in join_all(passes).await {
            match result {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {
                    tracing::debug!(source = %name, "refresh discarded after unmount");
                }
                Err(err) => {
                    match mode {
                        RefreshMode::Silent => {
                            tracing::warn!(source = %name, error = %err, "silent refresh failed, keeping prior data");
                        }
                        RefreshMode::Explicit => {
                            tracing::error!(source = %name, error = %err, "explicit refresh failed");
                        }
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics.counter_inc("refresh.failures", &[("mode", mode.as_str())], 1);
                    }
                    outcome.failures.push((name, err.to_string()));
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.histogram_observe(
                "refresh.duration_ms",
                &[("mode", mode.as_str())],
                started.elapsed().as_secs_f64() * 1000.0,
            );
        }

        outcome
    }

    /// Stop accepting refreshes and discard any in flight. Results of
    /// fetches completing after this point never reach view state.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
