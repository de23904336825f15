//! Deterministic test doubles: a scripted fetcher and a sample entity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use vista_core::{Page, PageFetcher, PageQuery, RefreshError, ViewEntity};

/// Pre-programmed fetch outcomes, consumed in sequence.
pub enum MockFetch<T> {
    /// Return this page.
    Page(Page<T>),
    /// Reject with this message.
    Error(String),
    /// Wait a duration, then yield the inner outcome.
    Delay(Duration, Box<MockFetch<T>>),
}

impl<T> MockFetch<T> {
    /// Convenience: wrap any outcome with a delay.
    pub fn delayed(delay: Duration, inner: MockFetch<T>) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Fetcher that replays scripted outcomes. Once the script is exhausted it
/// returns empty pages, so repeated silent refreshes stay harmless.
pub struct MockFetcher<T> {
    responses: Mutex<VecDeque<MockFetch<T>>>,
    seen: Mutex<Vec<PageQuery>>,
    call_count: AtomicUsize,
}

impl<T> MockFetcher<T> {
    pub fn new(responses: Vec<MockFetch<T>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every query this fetcher has been called with, in order.
    pub fn seen_queries(&self) -> Vec<PageQuery> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> PageFetcher<T> for MockFetcher<T> {
    async fn fetch(&self, query: &PageQuery) -> Result<Page<T>, RefreshError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().push(query.clone());

        let mut next = match self.responses.lock().pop_front() {
            Some(outcome) => outcome,
            None => return Ok(Page::empty()),
        };

        loop {
            match next {
                MockFetch::Page(page) => return Ok(page),
                MockFetch::Error(message) => return Err(anyhow::anyhow!(message).into()),
                MockFetch::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    next = *inner;
                }
            }
        }
    }
}

/// Sample catalog entity used across engine tests.
#[derive(Clone, Debug, PartialEq)]
pub struct CourseRow {
    pub course_id: String,
    pub last_accessed: DateTime<Utc>,
}

impl CourseRow {
    pub fn new(course_id: impl Into<String>, recency_secs: i64) -> Self {
        Self {
            course_id: course_id.into(),
            last_accessed: Utc.timestamp_opt(recency_secs, 0).unwrap(),
        }
    }

    pub fn recency_secs(&self) -> i64 {
        self.last_accessed.timestamp()
    }
}

impl ViewEntity for CourseRow {
    type Key = String;

    fn identity(&self) -> String {
        self.course_id.clone()
    }

    fn recency(&self) -> DateTime<Utc> {
        self.last_accessed
    }
}
