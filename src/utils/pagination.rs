//! Sequential page walking for paginated sources.
//!
//! [`walk`] requests one page at a time, strictly in order, and stops on the
//! first of:
//!
//! 1. a failed page (records gathered so far are kept)
//! 2. an empty page
//! 3. the caller's `max_results` cap (the result is truncated to exactly the cap)
//! 4. the safety ceiling of [`SAFETY_CEILING`] pages beyond the first
//! 5. the last page, for sources that report a page count
//!
//! A failed page is not retried.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::models::{QueryRequest, RecordKind, ResultEnvelope};

/// Pages fetched beyond the first before a walk is cut off
pub const SAFETY_CEILING: u32 = 100;

/// A source whose responses are single pages of a larger result set
#[async_trait]
pub trait PagedSource: Send + Sync {
    /// Source-specific options forwarded to every page request
    type Options: Send + Sync;

    /// Native index of the first page (0 or 1)
    fn first_page(&self) -> u32;

    /// Fetch one page
    async fn fetch_page(
        &self,
        request: &QueryRequest,
        options: &Self::Options,
        page: u32,
    ) -> ResultEnvelope;
}

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page request failed
    Failed,
    /// A page came back empty
    Exhausted,
    /// `max_results` was reached
    Capped,
    /// The safety ceiling was reached
    Ceiling,
    /// The source's last page was consumed
    LastPage,
}

/// Outcome of a page walk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageWalk {
    /// Records in page order
    pub records: Vec<Value>,
    /// Number of page requests issued
    pub pages_fetched: u32,
    /// Total reported by the first successful page
    pub total: Option<u64>,
    pub stop: StopReason,
    /// Error of the page that ended the walk, if one failed
    pub error: Option<String>,
}

impl PageWalk {
    /// Envelope for the whole walk.
    ///
    /// Fails only when the very first page failed; a later failure keeps the
    /// records gathered before it.
    pub fn into_envelope(self, kind: RecordKind, first_page: u32) -> ResultEnvelope {
        if self.stop == StopReason::Failed && self.records.is_empty() && self.pages_fetched <= 1 {
            return ResultEnvelope::failure(kind, self.error.unwrap_or_default());
        }
        let total = self.total.unwrap_or(self.records.len() as u64);
        ResultEnvelope::success(kind, self.records, total, first_page)
    }
}

/// Walk every page of a query
pub async fn walk<P>(
    source: &P,
    request: &QueryRequest,
    max_results: Option<usize>,
    options: &P::Options,
) -> PageWalk
where
    P: PagedSource + ?Sized,
{
    let mut walk = PageWalk {
        records: Vec::new(),
        pages_fetched: 0,
        total: None,
        stop: StopReason::Capped,
        error: None,
    };

    if max_results == Some(0) {
        return walk;
    }

    let first_page = source.first_page();
    let mut page = first_page;

    loop {
        let envelope = source.fetch_page(request, options, page).await;
        walk.pages_fetched += 1;

        if !envelope.success {
            walk.stop = StopReason::Failed;
            walk.error = envelope.error;
            break;
        }

        if walk.total.is_none() {
            walk.total = Some(envelope.total);
        }

        if envelope.records.is_empty() {
            walk.stop = StopReason::Exhausted;
            break;
        }

        walk.records.extend(envelope.records);

        if let Some(max) = max_results {
            if walk.records.len() >= max {
                walk.records.truncate(max);
                walk.stop = StopReason::Capped;
                break;
            }
        }

        if walk.pages_fetched > SAFETY_CEILING {
            walk.stop = StopReason::Ceiling;
            break;
        }

        if let Some(pages) = envelope.pages {
            if page - first_page + 1 >= pages {
                walk.stop = StopReason::LastPage;
                break;
            }
        }

        page += 1;
    }

    tracing::debug!(
        pages = walk.pages_fetched,
        records = walk.records.len(),
        stop = ?walk.stop,
        "page walk finished"
    );

    walk
}

/// Records of every page of a query, in page order
pub async fn iterate_all<P>(
    source: &P,
    request: &QueryRequest,
    max_results: Option<usize>,
    options: &P::Options,
) -> Vec<Value>
where
    P: PagedSource + ?Sized,
{
    walk(source, request, max_results, options).await.records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockPagedSource;

    fn request() -> QueryRequest {
        QueryRequest::new("climate change", 1990, 2012)
    }

    #[tokio::test]
    async fn test_cap_truncates_exactly() {
        let source = MockPagedSource::endless(0, 10);
        let records = iterate_all(&source, &request(), Some(25), &()).await;

        assert_eq!(records.len(), 25);
        assert_eq!(source.calls(), 3);
        assert_eq!(source.requested_pages(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_safety_ceiling() {
        let source = MockPagedSource::endless(0, 10);
        let walk = walk(&source, &request(), None, &()).await;

        assert_eq!(walk.stop, StopReason::Ceiling);
        assert_eq!(walk.pages_fetched, 101);
        assert_eq!(source.calls(), 101);
        assert_eq!(walk.records.len(), 1010);
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        let source = MockPagedSource::with_pages(1, vec![10, 10, 4, 0, 10]);
        let walk = walk(&source, &request(), None, &()).await;

        assert_eq!(walk.stop, StopReason::Exhausted);
        assert_eq!(walk.records.len(), 24);
        assert_eq!(source.requested_pages(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_keeps_accumulated() {
        let source = MockPagedSource::with_pages(0, vec![10, 10, 10]).fail_at(2);
        let walk = walk(&source, &request(), Some(100), &()).await;

        assert_eq!(walk.stop, StopReason::Failed);
        assert_eq!(walk.records.len(), 20);
        assert!(walk.error.is_some());

        let envelope = walk.into_envelope(RecordKind::Articles, 0);
        assert!(envelope.success);
        assert_eq!(envelope.records.len(), 20);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_failure_envelope() {
        let source = MockPagedSource::with_pages(0, vec![10]).fail_at(0);
        let envelope = walk(&source, &request(), None, &())
            .await
            .into_envelope(RecordKind::Articles, 0);

        assert!(!envelope.success);
        assert!(envelope.records.is_empty());
        assert!(!envelope.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reported_page_count_stops() {
        let source = MockPagedSource::endless(1, 50).report_pages(3);
        let walk = walk(&source, &request(), None, &()).await;

        assert_eq!(walk.stop, StopReason::LastPage);
        assert_eq!(source.requested_pages(), vec![1, 2, 3]);
        assert_eq!(walk.records.len(), 150);
    }

    #[tokio::test]
    async fn test_zero_cap_fetches_nothing() {
        let source = MockPagedSource::endless(0, 10);
        let records = iterate_all(&source, &request(), Some(0), &()).await;

        assert!(records.is_empty());
        assert_eq!(source.calls(), 0);
    }
}
