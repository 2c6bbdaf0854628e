//! Chronicling America newspaper search (Library of Congress).
//!
//! Full-text (OCR) search over digitized US newspapers, 1690-1963.
//! No authentication.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};
use crate::sources::{settle, Source, SourceError, SourceSet};
use crate::utils::{compact_end, compact_start, fetch_text, HttpClient};

const CA_API_BASE: &str = "https://chroniclingamerica.loc.gov/search/pages/results/";

/// Years covered by the collection
pub const CA_COVERAGE: Coverage = Coverage::new(1690, Some(1963));

/// Response format requested from Chronicling America
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewspaperOutput {
    #[default]
    Json,
    Xml,
    Html,
}

impl NewspaperOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewspaperOutput::Json => "json",
            NewspaperOutput::Xml => "xml",
            NewspaperOutput::Html => "html",
        }
    }
}

/// Options recognized by Chronicling America
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChroniclingAmericaOptions {
    /// US state name, e.g. `Massachusetts`
    pub state: Option<String>,

    /// Language code (default `eng`)
    pub language: Option<String>,

    /// Response format (default `json`)
    pub output: NewspaperOutput,

    /// Results per page
    pub rows: Option<u32>,

    /// Result page, 1-based
    pub page: Option<u32>,
}

impl Default for ChroniclingAmericaOptions {
    fn default() -> Self {
        Self {
            state: None,
            language: Some("eng".to_string()),
            output: NewspaperOutput::Json,
            rows: None,
            page: None,
        }
    }
}

/// Chronicling America newspaper search source
#[derive(Debug, Clone)]
pub struct ChroniclingAmericaSource {
    client: Arc<HttpClient>,
    endpoint: String,
}

impl ChroniclingAmericaSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            endpoint: CA_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn build_params(
        request: &QueryRequest,
        options: &ChroniclingAmericaOptions,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("proxtext", request.text.clone()),
            ("date1", compact_start(request.start_year)),
            ("date2", compact_end(request.end_year)),
            ("dateFilterType", "range".to_string()),
            ("format", options.output.as_str().to_string()),
        ];

        if let Some(state) = &options.state {
            params.push(("state", state.clone()));
        }
        if let Some(language) = &options.language {
            params.push(("language", language.clone()));
        }
        if let Some(rows) = options.rows {
            params.push(("rows", rows.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page", page.to_string()));
        }

        params
    }

    /// Search newspaper pages for `request.text`
    pub async fn query(
        &self,
        request: &QueryRequest,
        options: &ChroniclingAmericaOptions,
    ) -> ResultEnvelope {
        settle(self.id(), self.kind(), self.fetch(request, options).await)
    }

    async fn fetch(
        &self,
        request: &QueryRequest,
        options: &ChroniclingAmericaOptions,
    ) -> Result<ResultEnvelope, SourceError> {
        let params = Self::build_params(request, options);
        tracing::debug!(query = %request.text, range = %request.date_range(), "querying Chronicling America");

        let body = fetch_text(
            self.client.get(&self.endpoint).query(&params),
            "Chronicling America",
        )
        .await?;

        match options.output {
            NewspaperOutput::Json => {
                let data: CaResponse = serde_json::from_str(&body)?;
                Ok(ResultEnvelope::success(
                    RecordKind::Articles,
                    data.items,
                    data.total_items,
                    options.page.unwrap_or(1),
                ))
            }
            NewspaperOutput::Xml | NewspaperOutput::Html => {
                Ok(ResultEnvelope::raw(RecordKind::Articles, body))
            }
        }
    }
}

#[async_trait]
impl Source for ChroniclingAmericaSource {
    fn id(&self) -> &str {
        "chronicling_america"
    }

    fn name(&self) -> &str {
        "Chronicling America"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Articles
    }

    fn coverage(&self) -> Coverage {
        CA_COVERAGE
    }

    fn flag(&self) -> SourceSet {
        SourceSet::NEWSPAPERS
    }

    async fn search(&self, request: &QueryRequest) -> ResultEnvelope {
        self.query(request, &ChroniclingAmericaOptions::default()).await
    }
}

// ===== Chronicling America API Types =====

#[derive(Debug, Default, Deserialize)]
struct CaResponse {
    #[serde(default, rename = "totalItems")]
    total_items: u64,
    #[serde(default)]
    items: Vec<Value>,
}
