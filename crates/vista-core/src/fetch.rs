use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RefreshError;

/// Filter + pagination parameters for one fetch. Filters are opaque to the
/// coordinator and passed through to the fetch collaborator unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageQuery {
    pub filters: serde_json::Value,
    pub page: u32,
    pub page_size: u32,
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            filters: serde_json::Value::Null,
            page,
            page_size,
        }
    }

    pub fn with_filters(mut self, filters: serde_json::Value) -> Self {
        self.filters = filters;
        self
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Pagination bounds reported by the server alongside a page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// One fetched page of entities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: PageInfo) -> Self {
        Self { items, pagination }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            pagination: PageInfo::default(),
        }
    }
}

/// The injected fetch boundary. Implementations must be safely callable
/// concurrently and must not mutate shared state themselves; timeout
/// semantics belong to the implementation, not the coordinator.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch(&self, query: &PageQuery) -> Result<Page<T>, RefreshError>;
}
