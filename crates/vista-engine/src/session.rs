use std::sync::Arc;
use std::time::Duration;

use vista_core::{EventName, ViewId};
use vista_telemetry::MetricsRecorder;
use vista_transport::ConnectionProvider;

use crate::coordinator::{RefreshOutcome, ViewRefreshCoordinator};
use crate::guard::ReconnectionGuard;
use crate::registry::SubscriptionRegistry;
use crate::source::{RefreshMode, RefreshSource};
use crate::trigger::{CoalescingTrigger, DEFAULT_QUIET_PERIOD};

/// Per-view configuration.
#[derive(Clone, Debug)]
pub struct LiveViewConfig {
    /// Idle duration after the last qualifying event before a silent
    /// refresh fires.
    pub quiet_period: Duration,
}

impl Default for LiveViewConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

/// Assembles the full pipeline for one view: watched event names feed a
/// coalescing trigger, whose fire fans out silent refreshes across the
/// view's data sources.
pub struct LiveViewBuilder {
    provider: Arc<ConnectionProvider>,
    events: Vec<EventName>,
    sources: Vec<Arc<dyn RefreshSource>>,
    config: LiveViewConfig,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl LiveViewBuilder {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self {
            provider,
            events: Vec::new(),
            sources: Vec::new(),
            config: LiveViewConfig::default(),
            metrics: None,
        }
    }

    /// Watch a named event. Every watched event is an information-free
    /// trigger: all of them restart the same debounce window.
    pub fn watch(mut self, name: impl Into<EventName>) -> Self {
        self.events.push(name.into());
        self
    }

    pub fn source(mut self, source: Arc<dyn RefreshSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn config(mut self, config: LiveViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wire everything up and start following the connection lifecycle.
    /// Must run inside a tokio runtime.
    pub fn build(self) -> LiveView {
        let mut coordinator = ViewRefreshCoordinator::new(self.sources);
        if let Some(metrics) = self.metrics {
            coordinator = coordinator.with_metrics(metrics);
        }
        let coordinator = Arc::new(coordinator);

        let trigger = Arc::new(CoalescingTrigger::new(self.config.quiet_period));
        {
            let coordinator = Arc::clone(&coordinator);
            trigger.set_callback(Arc::new(move || {
                if coordinator.is_cancelled() {
                    return;
                }
                let coordinator = Arc::clone(&coordinator);
                // Fire-time work never blocks the timer task.
                tokio::spawn(async move {
                    let _ = coordinator.refresh_all(RefreshMode::Silent).await;
                });
            }));
        }

        let registry = Arc::new(SubscriptionRegistry::new());
        let guard = ReconnectionGuard::new(self.provider, registry);
        for name in self.events {
            let trigger = Arc::clone(&trigger);
            guard.watch(name, Arc::new(move |_evt| trigger.notify()));
        }
        guard.start();

        let view = LiveView {
            id: ViewId::new(),
            guard,
            trigger,
            coordinator,
        };
        tracing::debug!(view = %view.id, "live view mounted");
        view
    }
}

/// A mounted view's handle to the invalidation pipeline.
pub struct LiveView {
    id: ViewId,
    guard: ReconnectionGuard,
    trigger: Arc<CoalescingTrigger>,
    coordinator: Arc<ViewRefreshCoordinator>,
}

impl LiveView {
    pub fn id(&self) -> &ViewId {
        &self.id
    }

    /// Explicit-mode refresh: initial load, manual retry, or after a
    /// pagination/filter change on a source.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.coordinator.refresh_all(RefreshMode::Explicit).await
    }

    pub fn guard(&self) -> &ReconnectionGuard {
        &self.guard
    }

    pub fn trigger(&self) -> &CoalescingTrigger {
        &self.trigger
    }

    pub fn coordinator(&self) -> &ViewRefreshCoordinator {
        &self.coordinator
    }

    /// View teardown: unbind all subscriptions, cancel any pending quiet
    /// window, and discard in-flight refetches. Idempotent.
    pub fn unmount(&self) {
        self.guard.teardown();
        self.trigger.cancel();
        self.coordinator.cancel();
        tracing::debug!(view = %self.id, "live view unmounted");
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CourseRow, MockFetch, MockFetcher};
    use crate::source::PagedSource;
    use vista_core::{DomainEvent, Page, PageInfo};

    fn page_of(rows: Vec<CourseRow>) -> Page<CourseRow> {
        let count = rows.len() as u64;
        Page::new(
            rows,
            PageInfo {
                current_page: 1,
                total_pages: 1,
                total_count: count,
            },
        )
    }

    fn catalog_event() -> DomainEvent {
        DomainEvent::new(
            "catalog-changed",
            serde_json::json!({ "action": "update", "entityId": "course_1" }),
        )
    }

    fn enrollment_event() -> DomainEvent {
        DomainEvent::new("enrollment-changed", serde_json::json!({ "entityId": "course_1" }))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn event_burst_collapses_into_one_silent_refresh() {
        let provider = Arc::new(ConnectionProvider::new());
        provider.connect();

        let fetcher = Arc::new(MockFetcher::new(vec![MockFetch::Page(page_of(vec![
            CourseRow::new("course_1", 100),
        ]))]));
        let source = Arc::new(PagedSource::new("course-list", fetcher.clone()));

        let view = LiveViewBuilder::new(Arc::clone(&provider))
            .watch("catalog-changed")
            .watch("enrollment-changed")
            .source(source.clone())
            .build();

        // Burst of mixed events, all inside the quiet window.
        for _ in 0..3 {
            assert!(provider.emit(catalog_event()));
            assert!(provider.emit(enrollment_event()));
        }

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(fetcher.call_count(), 1, "burst collapsed into one refetch");
        assert_eq!(view.trigger().fire_count(), 1);
        let state = source.state();
        let s = state.read();
        assert_eq!(s.items.len(), 1);
        assert!(!s.loading, "silent refresh never toggled loading");
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_keeps_exactly_one_handler_per_event() {
        let provider = Arc::new(ConnectionProvider::new());
        provider.connect();

        let fetcher = Arc::new(MockFetcher::<CourseRow>::new(vec![]));
        let source = Arc::new(PagedSource::new("course-list", fetcher.clone()));

        let view = LiveViewBuilder::new(Arc::clone(&provider))
            .watch("catalog-changed")
            .watch("enrollment-changed")
            .source(source)
            .build();

        // Network blip: connection object replaced wholesale.
        provider.disconnect();
        provider.connect();
        settle().await;

        let live = provider.current().unwrap();
        assert_eq!(live.handler_count(), 2, "exactly 2 handlers live, not 4");

        // One event produces one notify, not a duplicated fan-out.
        provider.emit(catalog_event());
        assert_eq!(view.trigger().notify_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_prevents_late_refreshes_and_fan_out() {
        let provider = Arc::new(ConnectionProvider::new());
        provider.connect();

        let fetcher = Arc::new(MockFetcher::<CourseRow>::new(vec![]));
        let source = Arc::new(PagedSource::new("course-list", fetcher.clone()));

        let view = LiveViewBuilder::new(Arc::clone(&provider))
            .watch("catalog-changed")
            .source(source)
            .build();

        // A pending quiet window at unmount time must never fire.
        provider.emit(catalog_event());
        view.unmount();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fetcher.call_count(), 0, "no post-unmount refetch");
        assert_eq!(provider.current().unwrap().handler_count(), 0);

        // Events after unmount go nowhere.
        assert!(!provider.emit(catalog_event()));
        view.unmount(); // idempotent
    }

    #[tokio::test]
    async fn explicit_refresh_populates_state() {
        let provider = Arc::new(ConnectionProvider::new());
        let fetcher = Arc::new(MockFetcher::new(vec![MockFetch::Page(page_of(vec![
            CourseRow::new("course_1", 100),
            CourseRow::new("course_2", 200),
        ]))]));
        let source = Arc::new(PagedSource::new("course-list", fetcher));

        // Transport still down: explicit loads work regardless.
        let view = LiveViewBuilder::new(provider)
            .watch("catalog-changed")
            .source(source.clone())
            .build();

        let outcome = view.refresh().await;
        assert!(outcome.is_complete());
        assert_eq!(source.state().read().items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_failure_is_retryable_silent_failure_is_invisible() {
        let provider = Arc::new(ConnectionProvider::new());
        provider.connect();

        let fetcher = Arc::new(MockFetcher::new(vec![
            MockFetch::Error("network error".into()),
            MockFetch::Page(page_of(vec![CourseRow::new("course_1", 100)])),
            MockFetch::Error("network error".into()),
        ]));
        let source = Arc::new(PagedSource::new("course-list", fetcher.clone()));

        let view = LiveViewBuilder::new(Arc::clone(&provider))
            .watch("catalog-changed")
            .source(source.clone())
            .build();

        // Explicit failure: retry affordance.
        let outcome = view.refresh().await;
        assert_eq!(outcome.failures.len(), 1);
        {
            let state = source.state();
            let s = state.read();
            let err = s.error.as_ref().expect("retryable error surfaced");
            assert!(err.retryable);
        }

        // Manual retry re-issues the same explicit request and recovers.
        let outcome = view.refresh().await;
        assert!(outcome.is_complete());
        assert_eq!(source.state().read().items.len(), 1);

        // Identical failure on the silent path: nothing user-visible moves.
        provider.emit(catalog_event());
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fetcher.call_count(), 3);
        let state = source.state();
        let s = state.read();
        assert_eq!(s.items.len(), 1, "previously loaded data unchanged");
        assert!(s.error.is_none());
        assert!(!s.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_fire_sees_current_pagination() {
        let provider = Arc::new(ConnectionProvider::new());
        provider.connect();

        let fetcher = Arc::new(MockFetcher::new(vec![
            MockFetch::Page(page_of(vec![])),
            MockFetch::Page(page_of(vec![])),
        ]));
        let source = Arc::new(PagedSource::new("course-list", fetcher.clone()));

        let view = LiveViewBuilder::new(Arc::clone(&provider))
            .watch("catalog-changed")
            .source(source.clone())
            .build();

        view.refresh().await;

        // Page changes between the event and the fire; the silent refetch
        // must use the new page, not a stale capture.
        provider.emit(catalog_event());
        source.set_page(4);
        tokio::time::sleep(Duration::from_millis(600)).await;

        let queries = fetcher.seen_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].page, 4, "fire used current pagination state");
    }

    #[tokio::test]
    async fn builder_defaults() {
        let provider = Arc::new(ConnectionProvider::new());
        let view = LiveViewBuilder::new(provider).build();

        assert_eq!(view.trigger().quiet_period(), Duration::from_millis(500));
        assert_eq!(view.coordinator().source_count(), 0);
        assert_eq!(view.guard().rebind_count(), 0);
    }
}
