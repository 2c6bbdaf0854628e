//! New York Times Article Search source implementation.
//!
//! API documentation: <https://developer.nytimes.com/docs/articlesearch-product/1/overview>
//!
//! Requires a free API key from developer.nytimes.com. Results come ten to a
//! page with 0-based page numbers; the API serves at most about 100 pages per
//! query.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};
use crate::sources::{settle, Source, SourceError, SourceSet};
use crate::utils::{compact_end, compact_start, fetch_text, HttpClient, PagedSource};

const NYT_API_BASE: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NytSort {
    #[default]
    Newest,
    Oldest,
    Relevance,
}

impl NytSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            NytSort::Newest => "newest",
            NytSort::Oldest => "oldest",
            NytSort::Relevance => "relevance",
        }
    }
}

/// Options recognized by the Article Search API
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NytOptions {
    /// Result ordering (default `newest`)
    pub sort: NytSort,

    /// Filter query, e.g. `source:("The New York Times")`
    pub fq: Option<String>,

    /// Result page, 0-based
    pub page: u32,
}

/// New York Times Article Search source
#[derive(Debug, Clone)]
pub struct NytSource {
    client: Arc<HttpClient>,
    api_key: String,
    endpoint: String,
}

impl NytSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?), api_key))
    }

    pub fn with_client(client: Arc<HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: NYT_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_params(&self, request: &QueryRequest, options: &NytOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", request.text.clone()),
            ("begin_date", compact_start(request.start_year)),
            ("end_date", compact_end(request.end_year)),
            ("sort", options.sort.as_str().to_string()),
            ("page", options.page.to_string()),
            ("api-key", self.api_key.clone()),
        ];

        if let Some(fq) = &options.fq {
            params.push(("fq", fq.clone()));
        }

        params
    }

    /// Fetch one page of articles matching `request.text`
    pub async fn query(&self, request: &QueryRequest, options: &NytOptions) -> ResultEnvelope {
        settle(self.id(), self.kind(), self.fetch(request, options).await)
    }

    async fn fetch(
        &self,
        request: &QueryRequest,
        options: &NytOptions,
    ) -> Result<ResultEnvelope, SourceError> {
        let params = self.build_params(request, options);
        tracing::debug!(query = %request.text, page = options.page, "querying NYT Article Search");

        let body = fetch_text(
            self.client
                .get(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .query(&params),
            "NYT Article Search",
        )
        .await?;

        let data: NytResponse = serde_json::from_str(&body)?;
        Ok(ResultEnvelope::success(
            RecordKind::Articles,
            data.response.docs,
            data.response.meta.hits,
            options.page,
        ))
    }
}

#[async_trait]
impl Source for NytSource {
    fn id(&self) -> &str {
        "nyt"
    }

    fn name(&self) -> &str {
        "New York Times"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Articles
    }

    fn coverage(&self) -> Coverage {
        Coverage::new(1851, None)
    }

    fn flag(&self) -> SourceSet {
        SourceSet::NYT
    }

    async fn search(&self, request: &QueryRequest) -> ResultEnvelope {
        self.query(request, &NytOptions::default()).await
    }
}

#[async_trait]
impl PagedSource for NytSource {
    type Options = NytOptions;

    fn first_page(&self) -> u32 {
        0
    }

    async fn fetch_page(&self, request: &QueryRequest, options: &NytOptions, page: u32) -> ResultEnvelope {
        let options = NytOptions {
            page,
            ..options.clone()
        };
        self.query(request, &options).await
    }
}

// ===== NYT API Types =====

#[derive(Debug, Default, Deserialize)]
struct NytResponse {
    #[serde(default)]
    response: NytBody,
}

#[derive(Debug, Default, Deserialize)]
struct NytBody {
    #[serde(default)]
    docs: Vec<Value>,
    #[serde(default)]
    meta: NytMeta,
}

#[derive(Debug, Default, Deserialize)]
struct NytMeta {
    #[serde(default)]
    hits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_params() {
        let source = NytSource::new("secret").unwrap();
        let request = QueryRequest::new("climate change", 1990, 2012);
        let options = NytOptions {
            sort: NytSort::Oldest,
            fq: Some(r#"source:("The New York Times")"#.into()),
            page: 3,
        };
        let params = source.build_params(&request, &options);

        assert!(params.contains(&("q", "climate change".to_string())));
        assert!(params.contains(&("begin_date", "19900101".to_string())));
        assert!(params.contains(&("end_date", "20121231".to_string())));
        assert!(params.contains(&("sort", "oldest".to_string())));
        assert!(params.contains(&("page", "3".to_string())));
        assert!(params.contains(&("api-key", "secret".to_string())));
        assert!(params.iter().any(|(k, _)| *k == "fq"));
    }

    #[test]
    fn test_response_mapping() {
        let body = r#"{"status": "OK", "response": {
            "docs": [{"headline": {"main": "U.S. ATTACKED"}, "pub_date": "2001-09-12T05:00:00Z"}],
            "meta": {"hits": 8231, "offset": 0, "time": 41}}}"#;
        let data: NytResponse = serde_json::from_str(body).unwrap();

        assert_eq!(data.response.meta.hits, 8231);
        assert_eq!(data.response.docs[0]["headline"]["main"], "U.S. ATTACKED");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let data: NytResponse = serde_json::from_str(r#"{"status": "OK"}"#).unwrap();
        assert!(data.response.docs.is_empty());
        assert_eq!(data.response.meta.hits, 0);
    }

    #[test]
    fn test_first_page_is_zero() {
        let source = NytSource::new("secret").unwrap();
        assert_eq!(source.first_page(), 0);
    }
}
