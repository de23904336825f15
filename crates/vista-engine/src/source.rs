use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use vista_core::{Page, PageFetcher, PageQuery, RefreshError, ViewEntity, ViewError, ViewState};

/// How a refresh was initiated, which decides its UI-state semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    /// User-initiated: initial load, manual refresh, pagination, filter
    /// change. Toggles loading state; failures surface as retryable error
    /// state.
    Explicit,
    /// Trigger-initiated. Leaves loading/error state untouched; failures
    /// are swallowed because the view already has valid, if stale, data.
    Silent,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Silent => "silent",
        }
    }
}

/// One independently refreshable data source feeding a view (a paginated
/// list, a stats panel, a side list). Sources are fanned out concurrently
/// and reconciled in isolation from each other.
#[async_trait]
pub trait RefreshSource: Send + Sync {
    fn name(&self) -> &str;

    async fn refresh(&self, mode: RefreshMode) -> Result<(), RefreshError>;
}

/// A paginated source backed by an injected fetcher. Holds the view's
/// current filter/pagination parameters and its entity collection.
pub struct PagedSource<T: ViewEntity> {
    name: String,
    fetcher: Arc<dyn PageFetcher<T>>,
    query: Mutex<PageQuery>,
    state: Arc<RwLock<ViewState<T>>>,
}

impl<T: ViewEntity> PagedSource<T> {
    pub fn new(name: impl Into<String>, fetcher: Arc<dyn PageFetcher<T>>) -> Self {
        Self {
            name: name.into(),
            fetcher,
            query: Mutex::new(PageQuery::default()),
            state: Arc::new(RwLock::new(ViewState::default())),
        }
    }

    pub fn with_query(self, query: PageQuery) -> Self {
        *self.query.lock() = query;
        self
    }

    /// Shared handle to this source's view state.
    pub fn state(&self) -> Arc<RwLock<ViewState<T>>> {
        Arc::clone(&self.state)
    }

    pub fn query(&self) -> PageQuery {
        self.query.lock().clone()
    }

    /// Change the page for the next explicit refresh.
    pub fn set_page(&self, page: u32) {
        self.query.lock().page = page;
    }

    /// Change the filters for the next explicit refresh.
    pub fn set_filters(&self, filters: serde_json::Value) {
        self.query.lock().filters = filters;
    }

    fn apply(&self, page: Page<T>, mode: RefreshMode) {
        let mut state = self.state.write();
        state.reconcile(page);
        if mode == RefreshMode::Explicit {
            state.loading = false;
        }
    }
}

#[async_trait]
impl<T: ViewEntity> RefreshSource for PagedSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refresh(&self, mode: RefreshMode) -> Result<(), RefreshError> {
        let query = self.query.lock().clone();

        if mode == RefreshMode::Explicit {
            let mut state = self.state.write();
            state.loading = true;
            state.error = None;
        }

        match self.fetcher.fetch(&query).await {
            Ok(page) => {
                self.apply(page, mode);
                Ok(())
            }
            Err(err) => {
                if mode == RefreshMode::Explicit {
                    let mut state = self.state.write();
                    state.loading = false;
                    state.error = Some(ViewError::retryable(err.to_string()));
                }
                Err(err)
            }
        }
    }
}
