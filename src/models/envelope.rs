//! Result envelopes returned by sources and the orchestrator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What kind of records an envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Discrete news or newspaper articles
    Articles,
    /// Archived snapshots of a URL
    Captures,
    /// Structured event rows
    Events,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Articles => "articles",
            RecordKind::Captures => "captures",
            RecordKind::Events => "events",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized success/data/error wrapper returned by every query.
///
/// A failed envelope never carries records and always carries an error
/// message; a successful one never carries an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the request succeeded
    pub success: bool,

    /// Kind of the records below
    pub kind: RecordKind,

    /// Provider records, untouched apart from CDX rows being keyed by column
    #[serde(default)]
    pub records: Vec<Value>,

    /// Provider-reported total (may exceed `records.len()`)
    #[serde(default)]
    pub total: u64,

    /// Page this envelope holds, in the provider's own numbering
    #[serde(default)]
    pub page: u32,

    /// Total page count, for providers that report one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,

    /// Column header row (archive index only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Unparsed response body, for non-JSON output modes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Error message if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    /// Create a successful envelope
    pub fn success(kind: RecordKind, records: Vec<Value>, total: u64, page: u32) -> Self {
        Self {
            success: true,
            kind,
            records,
            total,
            page,
            pages: None,
            columns: None,
            raw: None,
            error: None,
        }
    }

    /// Create a successful envelope holding an unparsed body
    pub fn raw(kind: RecordKind, body: impl Into<String>) -> Self {
        Self {
            raw: Some(body.into()),
            ..Self::success(kind, Vec::new(), 0, 0)
        }
    }

    /// Create a failed envelope
    pub fn failure(kind: RecordKind, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "unknown error".to_string();
        }
        Self {
            success: false,
            error: Some(error),
            ..Self::success(kind, Vec::new(), 0, 0)
        }
    }

    /// Set total page count
    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Set column header
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Number of records carried
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record count this envelope contributes to an article total
    pub fn article_count(&self) -> u64 {
        if self.success && self.kind == RecordKind::Articles {
            self.records.len() as u64
        } else {
            0
        }
    }
}

/// Results of one query fanned out over several sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Query text as given
    pub query: String,

    /// `START-END`
    pub date_range: String,

    /// Envelope per source, keyed by source name
    pub sources: BTreeMap<String, ResultEnvelope>,

    /// Sum of article counts over successful article sources
    pub total_articles: u64,
}

impl AggregatedResult {
    pub fn new(query: impl Into<String>, start_year: i32, end_year: i32) -> Self {
        Self {
            query: query.into(),
            date_range: format!("{}-{}", start_year, end_year),
            sources: BTreeMap::new(),
            total_articles: 0,
        }
    }

    /// Record a source's envelope and fold it into the article total
    pub fn insert(&mut self, source: impl Into<String>, envelope: ResultEnvelope) {
        self.total_articles += envelope.article_count();
        self.sources.insert(source.into(), envelope);
    }

    pub fn get(&self, source: &str) -> Option<&ResultEnvelope> {
        self.sources.get(source)
    }

    /// Names of sources whose envelope reports failure
    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, envelope)| !envelope.success)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// A Wayback Machine snapshot near a requested date
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotReference {
    /// Snapshot address (empty when none was found)
    pub url: String,

    /// 14-digit `YYYYMMDDhhmmss` capture time
    pub timestamp: String,

    /// Whether an archived snapshot exists
    pub available: bool,

    /// HTTP status recorded for the capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Lookup failure, if the availability check itself failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotReference {
    /// Reference for a lookup that could not be performed
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Capture time parsed from the timestamp, if it is well formed
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y%m%d%H%M%S").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_envelope_invariant() {
        let envelope = ResultEnvelope::failure(RecordKind::Articles, "connection refused");
        assert!(!envelope.success);
        assert!(envelope.records.is_empty());
        assert_eq!(envelope.error.as_deref(), Some("connection refused"));

        let empty = ResultEnvelope::failure(RecordKind::Articles, "");
        assert!(!empty.error.unwrap().is_empty());
    }

    #[test]
    fn test_success_envelope_has_no_error() {
        let envelope = ResultEnvelope::success(RecordKind::Captures, vec![json!({})], 1, 0);
        assert!(envelope.success);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.len(), 1);
    }

    #[test]
    fn test_raw_envelope() {
        let envelope = ResultEnvelope::raw(RecordKind::Captures, "com,example)/ 2001");
        assert!(envelope.success);
        assert!(envelope.is_empty());
        assert_eq!(envelope.raw.as_deref(), Some("com,example)/ 2001"));
    }

    #[test]
    fn test_aggregate_counts_only_successful_articles() {
        let mut result = AggregatedResult::new("flood", 1900, 1910);
        result.insert(
            "internet_archive",
            ResultEnvelope::success(RecordKind::Captures, vec![json!({}), json!({})], 2, 0),
        );
        result.insert(
            "chronicling_america",
            ResultEnvelope::success(RecordKind::Articles, vec![json!({}); 3], 300, 1),
        );
        result.insert(
            "nyt",
            ResultEnvelope::failure(RecordKind::Articles, "HTTP 500"),
        );

        assert_eq!(result.total_articles, 3);
        assert_eq!(result.date_range, "1900-1910");
        assert_eq!(result.failed_sources(), vec!["nyt"]);
    }

    #[test]
    fn test_serialized_envelope_omits_absent_fields() {
        let envelope = ResultEnvelope::success(RecordKind::Articles, Vec::new(), 0, 1);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "articles");
        assert!(value.get("error").is_none());
        assert!(value.get("raw").is_none());
    }

    #[test]
    fn test_snapshot_captured_at() {
        let snapshot = SnapshotReference {
            url: "http://web.archive.org/web/20000229041327/http://example.com:80/".into(),
            timestamp: "20000229041327".into(),
            available: true,
            status: Some("200".into()),
            error: None,
        };
        let captured = snapshot.captured_at().unwrap();
        assert_eq!(captured.format("%Y-%m-%d").to_string(), "2000-02-29");

        assert!(SnapshotReference::unavailable("timeout").captured_at().is_none());
    }
}
