use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::{Page, PageInfo};

/// An entity displayed by a view, keyed by a stable identity.
///
/// `recency` breaks ties when a fetched page carries multiple records for
/// the same identity (e.g. repeated enrollment rows for one course): the
/// most recent record wins during reconciliation.
pub trait ViewEntity: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Send + Sync;

    fn identity(&self) -> Self::Key;
    fn recency(&self) -> DateTime<Utc>;
}

/// User-visible failure state of an explicit refresh. Always retryable:
/// the retry re-issues the same explicit-mode request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewError {
    pub message: String,
    pub retryable: bool,
}

impl ViewError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Materialized state of one data source feeding a view.
///
/// `loading` and `error` are only ever touched by explicit-mode refreshes;
/// silent refreshes update `items`/`pagination` without disturbing them.
#[derive(Clone, Debug)]
pub struct ViewState<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
    pub loading: bool,
    pub error: Option<ViewError>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PageInfo::default(),
            loading: false,
            error: None,
        }
    }
}

impl<T: ViewEntity> ViewState<T> {
    /// Replace this state's collection with a freshly fetched page,
    /// collapsing duplicate identities (most recent recency wins). A
    /// successful reconcile clears any stale error.
    pub fn reconcile(&mut self, page: Page<T>) {
        self.items = dedup_by_identity(page.items);
        self.pagination = page.pagination;
        self.error = None;
    }
}

/// Collapse records sharing an identity key, keeping the most recent one.
/// Order of first occurrence is preserved.
pub fn dedup_by_identity<T: ViewEntity>(items: Vec<T>) -> Vec<T> {
    let mut by_key: HashMap<T::Key, usize> = HashMap::with_capacity(items.len());
    let mut result: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        match by_key.get(&item.identity()) {
            Some(&idx) => {
                if item.recency() > result[idx].recency() {
                    result[idx] = item;
                }
            }
            None => {
                by_key.insert(item.identity(), result.len());
                result.push(item);
            }
        }
    }

    result
}
