//! GDELT event database, queried through a SQL warehouse.
//!
//! GDELT 2.0 events (1979-present) are published as a public BigQuery table.
//! The source only builds the SQL; executing it is delegated to an
//! [`EventWarehouse`], normally [`BigQueryWarehouse`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};
use crate::sources::{Source, SourceError, SourceSet};
use crate::utils::{fetch_text, HttpClient};

const GDELT_EVENTS_TABLE: &str = "gdelt-bq.full.events";
const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Requests allowed per query, including polls and result pages
const MAX_RESULT_REQUESTS: usize = 100;

/// Executes SQL text and returns one record per result row
#[async_trait]
pub trait EventWarehouse: Send + Sync + std::fmt::Debug {
    async fn run_query(&self, sql: &str) -> Result<Vec<Value>, SourceError>;
}

/// Filters for an event query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// CAMEO event codes, e.g. `0211`
    pub event_codes: Vec<String>,

    /// `Actor1CountryCode` filter, e.g. `USA`
    pub actor_country: Option<String>,

    /// Maximum rows (default 100000)
    pub limit: u64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            event_codes: Vec::new(),
            actor_country: None,
            limit: 100_000,
        }
    }
}

/// GDELT structured event source
#[derive(Debug, Clone)]
pub struct GdeltSource {
    warehouse: Arc<dyn EventWarehouse>,
    table: String,
}

impl GdeltSource {
    pub fn new(warehouse: Arc<dyn EventWarehouse>) -> Self {
        Self {
            warehouse,
            table: GDELT_EVENTS_TABLE.to_string(),
        }
    }

    /// Query a different events table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// SQL text for an event query
    pub fn build_sql(&self, start_year: i32, end_year: i32, query: &EventQuery) -> String {
        let mut sql = format!(
            "SELECT *\nFROM `{}`\nWHERE Year >= {} AND Year <= {}",
            self.table, start_year, end_year
        );

        if !query.event_codes.is_empty() {
            let codes = query
                .event_codes
                .iter()
                .map(|code| quote_literal(code))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!("\n AND EventCode IN ({})", codes));
        }

        if let Some(country) = &query.actor_country {
            sql.push_str(&format!("\n AND Actor1CountryCode = {}", quote_literal(country)));
        }

        sql.push_str(&format!("\nLIMIT {}", query.limit));
        sql
    }

    /// Event rows between two years.
    ///
    /// Warehouse failures are logged and yield an empty list.
    pub async fn query_events(&self, start_year: i32, end_year: i32, query: &EventQuery) -> Vec<Value> {
        let sql = self.build_sql(start_year, end_year, query);
        tracing::debug!(%sql, "querying GDELT events");

        match self.warehouse.run_query(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "GDELT warehouse query failed");
                Vec::new()
            }
        }
    }

    /// Event rows for the request's years, as an envelope. The request text
    /// is not used.
    pub async fn query(&self, request: &QueryRequest, options: &EventQuery) -> ResultEnvelope {
        let rows = self
            .query_events(request.start_year, request.end_year, options)
            .await;
        let total = rows.len() as u64;
        ResultEnvelope::success(RecordKind::Events, rows, total, 0)
    }
}

/// Single-quoted SQL string literal with `\` and `'` escaped
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[async_trait]
impl Source for GdeltSource {
    fn id(&self) -> &str {
        "gdelt"
    }

    fn name(&self) -> &str {
        "GDELT Events"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Events
    }

    fn coverage(&self) -> Coverage {
        Coverage::new(1979, None)
    }

    fn flag(&self) -> SourceSet {
        SourceSet::EVENTS
    }

    async fn search(&self, request: &QueryRequest) -> ResultEnvelope {
        self.query(request, &EventQuery::default()).await
    }
}

/// BigQuery REST `jobs.query` warehouse.
///
/// Takes a ready OAuth access token; obtaining one from service account
/// credentials is left to the caller.
#[derive(Debug, Clone)]
pub struct BigQueryWarehouse {
    client: Arc<HttpClient>,
    project_id: String,
    access_token: String,
    endpoint: String,
}

impl BigQueryWarehouse {
    pub fn new(
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, SourceError> {
        Ok(Self::with_client(
            Arc::new(HttpClient::new()?),
            project_id,
            access_token,
        ))
    }

    pub fn with_client(
        client: Arc<HttpClient>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            access_token: access_token.into(),
            endpoint: BIGQUERY_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Server-side wait per request, kept under the client timeout
    fn wait_ms(&self) -> u64 {
        self.client
            .timeout()
            .saturating_sub(Duration::from_secs(1))
            .as_millis() as u64
    }

    /// `jobs.getQueryResults` for a job, optionally from a page token
    async fn fetch_results(
        &self,
        job: &BqJobReference,
        page_token: Option<&str>,
    ) -> Result<BqResponse, SourceError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.endpoint, self.project_id, job.job_id
        );
        let mut params = vec![("timeoutMs", self.wait_ms().to_string())];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }

        let text = fetch_text(
            self.client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&params),
            "BigQuery",
        )
        .await
        .map_err(|e| SourceError::Warehouse(e.to_string()))?;

        Self::parse_page(&text)
    }

    fn parse_page(body: &str) -> Result<BqResponse, SourceError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Key each row's cells by column name
    fn rows_to_records(columns: &[String], rows: Vec<BqRow>) -> Vec<Value> {
        rows.into_iter()
            .map(|row| {
                let record: Map<String, Value> = columns
                    .iter()
                    .cloned()
                    .zip(row.f.into_iter().map(|cell| cell.v))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}

#[async_trait]
impl EventWarehouse for BigQueryWarehouse {
    /// Runs `jobs.query`, then polls and pages through `jobs.getQueryResults`
    /// until the job is complete and no page token remains.
    async fn run_query(&self, sql: &str) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/projects/{}/queries", self.endpoint, self.project_id);
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": self.wait_ms(),
        });

        let text = fetch_text(
            self.client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&body),
            "BigQuery",
        )
        .await
        .map_err(|e| SourceError::Warehouse(e.to_string()))?;

        let mut page = Self::parse_page(&text)?;
        let mut job: Option<BqJobReference> = None;
        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::new();

        for _ in 0..MAX_RESULT_REQUESTS {
            if let Some(reference) = page.job_reference.take() {
                job = Some(reference);
            }
            if columns.is_empty() {
                if let Some(schema) = page.schema.take() {
                    columns = schema.fields.into_iter().map(|f| f.name).collect();
                }
            }

            let complete = page.job_complete.unwrap_or(true);
            if complete {
                records.extend(Self::rows_to_records(&columns, std::mem::take(&mut page.rows)));
                if page.page_token.is_none() {
                    return Ok(records);
                }
            }

            let reference = job.as_ref().ok_or_else(|| {
                SourceError::Warehouse("response carries no job reference".to_string())
            })?;
            tracing::debug!(
                job_id = %reference.job_id,
                complete,
                rows = records.len(),
                "fetching more BigQuery results"
            );
            page = self
                .fetch_results(reference, page.page_token.as_deref())
                .await?;
        }

        Err(SourceError::Warehouse(format!(
            "query results incomplete after {} requests",
            MAX_RESULT_REQUESTS
        )))
    }
}

// ===== BigQuery API Types =====

#[derive(Debug, Deserialize)]
struct BqResponse {
    #[serde(default)]
    schema: Option<BqSchema>,
    #[serde(default)]
    rows: Vec<BqRow>,
    #[serde(default, rename = "jobComplete")]
    job_complete: Option<bool>,
    #[serde(default, rename = "jobReference")]
    job_reference: Option<BqJobReference>,
    #[serde(default, rename = "pageToken")]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BqJobReference {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BqSchema {
    #[serde(default)]
    fields: Vec<BqField>,
}

#[derive(Debug, Deserialize)]
struct BqField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BqRow {
    #[serde(default)]
    f: Vec<BqCell>,
}

#[derive(Debug, Deserialize)]
struct BqCell {
    #[serde(default)]
    v: Value,
}
