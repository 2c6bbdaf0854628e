//! Internet Archive CDX capture index.
//!
//! Lists Wayback Machine captures of a URL or domain. No authentication.
//! API documentation: <https://github.com/internetarchive/wayback/tree/master/wayback-cdx-server>

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};
use crate::sources::{settle, Source, SourceError, SourceSet};
use crate::utils::{compact_end, compact_start, fetch_text, HttpClient};

const CDX_API_BASE: &str = "https://web.archive.org/cdx/search/cdx";

/// Base of every Wayback Machine snapshot address
pub(crate) const WAYBACK_WEB_BASE: &str = "https://web.archive.org/web";

/// Response format requested from the CDX server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdxOutput {
    /// Header row plus capture rows, parsed into records
    #[default]
    Json,
    /// Space-separated text lines, returned raw
    Cdx,
    /// Comma-separated text, returned raw
    Csv,
}

impl CdxOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            CdxOutput::Json => "json",
            CdxOutput::Cdx => "cdx",
            CdxOutput::Csv => "csv",
        }
    }
}

/// How the CDX server matches the queried URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdxMatchType {
    Exact,
    Prefix,
    Host,
    #[default]
    Domain,
}

impl CdxMatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CdxMatchType::Exact => "exact",
            CdxMatchType::Prefix => "prefix",
            CdxMatchType::Host => "host",
            CdxMatchType::Domain => "domain",
        }
    }
}

/// Options recognized by the CDX index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdxOptions {
    /// Response format (default `json`)
    pub output: CdxOutput,

    /// Keep only captures with this HTTP status (default `200`)
    pub filter_status: Option<String>,

    /// URL matching mode (default `domain`)
    pub match_type: CdxMatchType,

    /// Collapse adjacent captures sharing this field (default `statuscode`)
    pub collapse: Option<String>,

    /// Comma-separated field list (`fl`), e.g. `timestamp,statuscode`
    pub fields: Option<String>,

    /// Maximum number of captures
    pub limit: Option<u32>,
}

impl Default for CdxOptions {
    fn default() -> Self {
        Self {
            output: CdxOutput::Json,
            filter_status: Some("200".to_string()),
            match_type: CdxMatchType::Domain,
            collapse: Some("statuscode".to_string()),
            fields: None,
            limit: None,
        }
    }
}

/// Internet Archive CDX capture index source
#[derive(Debug, Clone)]
pub struct ArchiveIndexSource {
    client: Arc<HttpClient>,
    endpoint: String,
}

impl ArchiveIndexSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    /// Create a source sharing an existing client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            endpoint: CDX_API_BASE.to_string(),
        }
    }

    /// Point the source at a different CDX endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Native CDX parameters for a request
    pub fn build_params(request: &QueryRequest, options: &CdxOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("url", request.text.clone()),
            ("from", compact_start(request.start_year)),
            ("to", compact_end(request.end_year)),
            ("output", options.output.as_str().to_string()),
            ("matchType", options.match_type.as_str().to_string()),
        ];

        if let Some(collapse) = &options.collapse {
            params.push(("collapse", collapse.clone()));
        }
        if let Some(status) = &options.filter_status {
            params.push(("filter", format!("statuscode:{}", status)));
        }
        if let Some(fields) = &options.fields {
            params.push(("fl", fields.clone()));
        }
        if let Some(limit) = options.limit {
            params.push(("limit", limit.to_string()));
        }

        params
    }

    /// List captures of `request.text` between the request years
    pub async fn query(&self, request: &QueryRequest, options: &CdxOptions) -> ResultEnvelope {
        settle(self.id(), self.kind(), self.fetch(request, options).await)
    }

    async fn fetch(
        &self,
        request: &QueryRequest,
        options: &CdxOptions,
    ) -> Result<ResultEnvelope, SourceError> {
        let params = Self::build_params(request, options);
        tracing::debug!(url = %request.text, from = %params[1].1, to = %params[2].1, "querying CDX index");

        let body = fetch_text(self.client.get(&self.endpoint).query(&params), "CDX index").await?;

        match options.output {
            CdxOutput::Json => Self::parse_captures(&body),
            CdxOutput::Cdx | CdxOutput::Csv => Ok(ResultEnvelope::raw(RecordKind::Captures, body)),
        }
    }

    /// Parse a JSON CDX body: row 0 is the column header, rows 1..n captures.
    ///
    /// Each capture row is keyed by the header into a record.
    pub fn parse_captures(body: &str) -> Result<ResultEnvelope, SourceError> {
        if body.trim().is_empty() {
            return Ok(ResultEnvelope::success(RecordKind::Captures, Vec::new(), 0, 0)
                .columns(Vec::new()));
        }

        let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
        let mut rows = rows.into_iter();

        let columns: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|column| match column {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();

        let captures: Vec<Value> = rows
            .map(|row| {
                let record: Map<String, Value> = columns.iter().cloned().zip(row).collect();
                Value::Object(record)
            })
            .collect();

        let total = captures.len() as u64;
        Ok(ResultEnvelope::success(RecordKind::Captures, captures, total, 0).columns(columns))
    }

    /// Wayback Machine address of a capture.
    ///
    /// `timestamp` is the 14-digit `YYYYMMDDhhmmss` capture time.
    pub fn build_snapshot_url(original_url: &str, timestamp: &str) -> String {
        wayback_url(timestamp, original_url)
    }
}

/// `https://web.archive.org/web/{timestamp}/{url}`, adding `http://` to
/// schemeless URLs.
pub(crate) fn wayback_url(timestamp: &str, url: &str) -> String {
    if url.starts_with("http") {
        format!("{}/{}/{}", WAYBACK_WEB_BASE, timestamp, url)
    } else {
        format!("{}/{}/http://{}", WAYBACK_WEB_BASE, timestamp, url)
    }
}

#[async_trait]
impl Source for ArchiveIndexSource {
    fn id(&self) -> &str {
        "internet_archive"
    }

    fn name(&self) -> &str {
        "Internet Archive CDX"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Captures
    }

    fn coverage(&self) -> Coverage {
        Coverage::new(1996, None)
    }

    fn flag(&self) -> SourceSet {
        SourceSet::ARCHIVE
    }

    async fn search(&self, request: &QueryRequest) -> ResultEnvelope {
        self.query(request, &CdxOptions::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_build_params_defaults() {
        let request = QueryRequest::new("example.com", 1990, 2012);
        let params = ArchiveIndexSource::build_params(&request, &CdxOptions::default());

        assert_eq!(param(&params, "url"), Some("example.com"));
        assert_eq!(param(&params, "from"), Some("19900101"));
        assert_eq!(param(&params, "to"), Some("20121231"));
        assert_eq!(param(&params, "output"), Some("json"));
        assert_eq!(param(&params, "matchType"), Some("domain"));
        assert_eq!(param(&params, "collapse"), Some("statuscode"));
        assert_eq!(param(&params, "filter"), Some("statuscode:200"));
        assert_eq!(param(&params, "fl"), None);
    }

    #[test]
    fn test_build_params_options() {
        let request = QueryRequest::new("example.com", 2000, 2005);
        let options = CdxOptions {
            output: CdxOutput::Cdx,
            filter_status: None,
            fields: Some("timestamp,statuscode".into()),
            limit: Some(50),
            ..Default::default()
        };
        let params = ArchiveIndexSource::build_params(&request, &options);

        assert_eq!(param(&params, "output"), Some("cdx"));
        assert_eq!(param(&params, "filter"), None);
        assert_eq!(param(&params, "fl"), Some("timestamp,statuscode"));
        assert_eq!(param(&params, "limit"), Some("50"));
    }

    #[test]
    fn test_parse_captures() {
        let body = r#"[
            ["urlkey","timestamp","original","mimetype","statuscode","digest","length"],
            ["com,example)/","20020120142510","http://example.com:80/","text/html","200","HT2DYGA5UKZCPBSFVCV3JOBXGW2G5UUA","1792"],
            ["com,example)/","20060103102134","http://www.example.com/","text/html","200","4V4X5GNTDUMJ5KBXUV5GH3UDWO3FPZGV","1060"]
        ]"#;

        let envelope = ArchiveIndexSource::parse_captures(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.total, 2);
        assert_eq!(envelope.columns.as_ref().unwrap().len(), 7);
        assert_eq!(envelope.records[0]["timestamp"], "20020120142510");
        assert_eq!(envelope.records[1]["original"], "http://www.example.com/");
    }

    #[test]
    fn test_parse_captures_empty() {
        let envelope = ArchiveIndexSource::parse_captures("[]").unwrap();
        assert!(envelope.success);
        assert!(envelope.records.is_empty());
        assert_eq!(envelope.columns, Some(Vec::new()));

        let envelope = ArchiveIndexSource::parse_captures("\n").unwrap();
        assert_eq!(envelope.total, 0);
    }

    #[test]
    fn test_parse_captures_rejects_garbage() {
        assert!(ArchiveIndexSource::parse_captures("<html>busy</html>").is_err());
    }

    #[test]
    fn test_build_snapshot_url() {
        assert_eq!(
            ArchiveIndexSource::build_snapshot_url("example.com", "20110101000000"),
            "https://web.archive.org/web/20110101000000/http://example.com"
        );
        assert_eq!(
            ArchiveIndexSource::build_snapshot_url("https://example.com/a", "20110101000000"),
            "https://web.archive.org/web/20110101000000/https://example.com/a"
        );
    }
}
