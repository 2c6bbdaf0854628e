//! The Guardian Open Platform content search.
//!
//! API documentation: <https://open-platform.theguardian.com/documentation/search>
//!
//! Requires a free API key. Coverage starts in 1999; pages are 1-based and
//! hold at most 50 results.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};
use crate::sources::{settle, Source, SourceError, SourceSet};
use crate::utils::{fetch_text, iso_end, iso_start, HttpClient, PagedSource};

const GUARDIAN_API_BASE: &str = "https://content.guardianapis.com/search";

/// First year with Guardian content
pub const GUARDIAN_FIRST_YEAR: i32 = 1999;

/// Options recognized by the content search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianOptions {
    /// Result page, 1-based
    pub page: u32,

    /// Results per page (default and maximum 50)
    pub page_size: u32,

    /// Section id filter, e.g. `world`
    pub section: Option<String>,

    /// `newest`, `oldest` or `relevance`
    pub order_by: Option<String>,

    /// Extra fields to include, e.g. `headline,byline`
    pub show_fields: Option<String>,
}

impl Default for GuardianOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
            section: None,
            order_by: None,
            show_fields: None,
        }
    }
}

/// Guardian Open Platform source
#[derive(Debug, Clone)]
pub struct GuardianSource {
    client: Arc<HttpClient>,
    api_key: String,
    endpoint: String,
}

impl GuardianSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?), api_key))
    }

    pub fn with_client(client: Arc<HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: GUARDIAN_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_params(
        &self,
        request: &QueryRequest,
        options: &GuardianOptions,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", request.text.clone()),
            ("from-date", iso_start(request.start_year)),
            ("to-date", iso_end(request.end_year)),
            ("page", options.page.to_string()),
            ("page-size", options.page_size.to_string()),
            ("api-key", self.api_key.clone()),
            ("format", "json".to_string()),
        ];

        if let Some(section) = &options.section {
            params.push(("section", section.clone()));
        }
        if let Some(order_by) = &options.order_by {
            params.push(("order-by", order_by.clone()));
        }
        if let Some(show_fields) = &options.show_fields {
            params.push(("show-fields", show_fields.clone()));
        }

        params
    }

    /// Fetch one page of articles matching `request.text`
    pub async fn query(&self, request: &QueryRequest, options: &GuardianOptions) -> ResultEnvelope {
        settle(self.id(), self.kind(), self.fetch(request, options).await)
    }

    async fn fetch(
        &self,
        request: &QueryRequest,
        options: &GuardianOptions,
    ) -> Result<ResultEnvelope, SourceError> {
        let params = self.build_params(request, options);
        tracing::debug!(query = %request.text, page = options.page, "querying Guardian");

        let body = fetch_text(self.client.get(&self.endpoint).query(&params), "Guardian").await?;

        let data: GuardianResponse = serde_json::from_str(&body)?;
        let response = data.response;
        let envelope =
            ResultEnvelope::success(RecordKind::Articles, response.results, response.total, options.page);
        Ok(match response.pages {
            Some(pages) => envelope.pages(pages),
            None => envelope,
        })
    }
}

#[async_trait]
impl Source for GuardianSource {
    fn id(&self) -> &str {
        "guardian"
    }

    fn name(&self) -> &str {
        "The Guardian"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Articles
    }

    fn coverage(&self) -> Coverage {
        Coverage::new(GUARDIAN_FIRST_YEAR, None)
    }

    fn flag(&self) -> SourceSet {
        SourceSet::GUARDIAN
    }

    async fn search(&self, request: &QueryRequest) -> ResultEnvelope {
        self.query(request, &GuardianOptions::default()).await
    }
}

#[async_trait]
impl PagedSource for GuardianSource {
    type Options = GuardianOptions;

    fn first_page(&self) -> u32 {
        1
    }

    async fn fetch_page(
        &self,
        request: &QueryRequest,
        options: &GuardianOptions,
        page: u32,
    ) -> ResultEnvelope {
        let options = GuardianOptions {
            page,
            ..options.clone()
        };
        self.query(request, &options).await
    }
}

// ===== Guardian API Types =====

#[derive(Debug, Default, Deserialize)]
struct GuardianResponse {
    #[serde(default)]
    response: GuardianBody,
}

#[derive(Debug, Default, Deserialize)]
struct GuardianBody {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    pages: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_params_hyphenated_dates() {
        let source = GuardianSource::new("secret").unwrap();
        let request = QueryRequest::new("financial crisis", 2008, 2008);
        let params = source.build_params(&request, &GuardianOptions::default());

        assert!(params.contains(&("from-date", "2008-01-01".to_string())));
        assert!(params.contains(&("to-date", "2008-12-31".to_string())));
        assert!(params.contains(&("page", "1".to_string())));
        assert!(params.contains(&("page-size", "50".to_string())));
        assert!(params.contains(&("api-key", "secret".to_string())));
        assert!(params.contains(&("format", "json".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "section"));
    }

    #[test]
    fn test_response_mapping() {
        let body = r#"{"response": {"status": "ok", "total": 1843, "startIndex": 1,
            "pageSize": 50, "currentPage": 1, "pages": 37,
            "results": [{"id": "business/2008/sep/15/lehmanbrothers", "webTitle": "Lehman Brothers files for bankruptcy"}]}}"#;
        let data: GuardianResponse = serde_json::from_str(body).unwrap();

        assert_eq!(data.response.total, 1843);
        assert_eq!(data.response.pages, Some(37));
        assert_eq!(
            data.response.results[0]["webTitle"],
            "Lehman Brothers files for bankruptcy"
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let data: GuardianResponse = serde_json::from_str("{}").unwrap();
        assert!(data.response.results.is_empty());
        assert_eq!(data.response.total, 0);
        assert!(data.response.pages.is_none());
    }
}
