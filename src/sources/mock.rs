//! Mock paged source for testing purposes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::models::{QueryRequest, RecordKind, ResultEnvelope};
use crate::utils::PagedSource;

/// A scripted paged source that records which pages were requested.
#[derive(Debug)]
pub struct MockPagedSource {
    first_page: u32,
    page_sizes: Vec<usize>,
    endless_size: Option<usize>,
    fail_at: Option<usize>,
    pages: Option<u32>,
    requested: Mutex<Vec<u32>>,
}

impl MockPagedSource {
    /// Every page holds `page_size` records, forever.
    pub fn endless(first_page: u32, page_size: usize) -> Self {
        Self {
            first_page,
            page_sizes: Vec::new(),
            endless_size: Some(page_size),
            fail_at: None,
            pages: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Pages hold the given record counts; pages past the list are empty.
    pub fn with_pages(first_page: u32, page_sizes: Vec<usize>) -> Self {
        Self {
            page_sizes,
            endless_size: None,
            ..Self::endless(first_page, 0)
        }
    }

    /// Fail the nth page request (0-based position, not page number).
    pub fn fail_at(mut self, position: usize) -> Self {
        self.fail_at = Some(position);
        self
    }

    /// Report a total page count on every page.
    pub fn report_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Number of page requests received
    pub fn calls(&self) -> usize {
        self.requested_pages().len()
    }

    /// Page numbers requested, in order
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn page_size(&self, position: usize) -> usize {
        match self.endless_size {
            Some(size) => size,
            None => self.page_sizes.get(position).copied().unwrap_or(0),
        }
    }
}

#[async_trait]
impl PagedSource for MockPagedSource {
    type Options = ();

    fn first_page(&self) -> u32 {
        self.first_page
    }

    async fn fetch_page(&self, _request: &QueryRequest, _options: &(), page: u32) -> ResultEnvelope {
        let position = {
            let mut requested = self.requested.lock().unwrap_or_else(|e| e.into_inner());
            requested.push(page);
            requested.len() - 1
        };

        if self.fail_at == Some(position) {
            return ResultEnvelope::failure(RecordKind::Articles, "mock failure");
        }

        let records: Vec<Value> = (0..self.page_size(position))
            .map(|index| json!({ "page": page, "index": index }))
            .collect();
        let total = match self.endless_size {
            Some(_) => u64::MAX,
            None => self.page_sizes.iter().sum::<usize>() as u64,
        };

        let envelope = ResultEnvelope::success(RecordKind::Articles, records, total, page);
        match self.pages {
            Some(pages) => envelope.pages(pages),
            None => envelope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_requests() {
        let source = MockPagedSource::with_pages(1, vec![2, 1]);
        let request = QueryRequest::new("test", 2000, 2001);

        let first = tokio_test::block_on(source.fetch_page(&request, &(), 1));
        let second = tokio_test::block_on(source.fetch_page(&request, &(), 2));
        let third = tokio_test::block_on(source.fetch_page(&request, &(), 3));

        assert_eq!(first.records.len(), 2);
        assert_eq!(second.records.len(), 1);
        assert!(third.records.is_empty());
        assert_eq!(first.total, 3);
        assert_eq!(source.requested_pages(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mock_failure() {
        let source = MockPagedSource::endless(0, 5).fail_at(1);
        let request = QueryRequest::new("test", 2000, 2001);

        assert!(tokio_test::block_on(source.fetch_page(&request, &(), 0)).success);
        assert!(!tokio_test::block_on(source.fetch_page(&request, &(), 1)).success);
    }
}
