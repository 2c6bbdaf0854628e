//! Historical search source clients.
//!
//! Each source wraps exactly one external search endpoint. It turns a
//! normalized [`QueryRequest`] plus a typed, source-specific options record
//! into the provider's native parameters, performs one request, and maps the
//! provider response into a [`ResultEnvelope`].
//!
//! | Source | Id | Records | Credential |
//! |---|---|---|---|
//! | [`ArchiveIndexSource`] | `internet_archive` | captures | none |
//! | [`ChroniclingAmericaSource`] | `chronicling_america` | articles | none |
//! | [`NytSource`] | `nyt` | articles | `api-key` |
//! | [`GuardianSource`] | `guardian` | articles | `api-key` |
//! | [`GdeltSource`] | `gdelt` | events | warehouse token |
//!
//! [`WaybackFallback`] sits beside them: it resolves snapshot addresses for
//! dead links rather than searching.
//!
//! The `query` methods never fail: transport errors, non-2xx statuses and
//! undecodable bodies are returned as failure envelopes. Missing fields in an
//! otherwise valid response fall back to empty lists and zero counts.

mod archive_index;
mod chronicling_america;
mod gdelt;
mod guardian;
pub mod mock;
mod nyt;
mod wayback;

pub use archive_index::{ArchiveIndexSource, CdxMatchType, CdxOptions, CdxOutput};
pub use chronicling_america::{
    ChroniclingAmericaOptions, ChroniclingAmericaSource, NewspaperOutput, CA_COVERAGE,
};
pub use gdelt::{BigQueryWarehouse, EventQuery, EventWarehouse, GdeltSource};
pub use guardian::{GuardianOptions, GuardianSource, GUARDIAN_FIRST_YEAR};
pub use mock::MockPagedSource;
pub use nyt::{NytOptions, NytSort, NytSource};
pub use wayback::WaybackFallback;

use async_trait::async_trait;

use crate::models::{Coverage, QueryRequest, RecordKind, ResultEnvelope};

bitflags::bitflags! {
    /// A set of sources, used to select which ones a search fans out to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SourceSet: u8 {
        const ARCHIVE = 1 << 0;
        const NEWSPAPERS = 1 << 1;
        const NYT = 1 << 2;
        const GUARDIAN = 1 << 3;
        const EVENTS = 1 << 4;
    }
}

impl SourceSet {
    /// Parse a single source name (short or long form)
    pub fn from_source_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "cdx" | "internet_archive" | "archive" => Some(Self::ARCHIVE),
            "ca" | "chronicling_america" | "newspapers" => Some(Self::NEWSPAPERS),
            "nyt" => Some(Self::NYT),
            "guardian" => Some(Self::GUARDIAN),
            "gdelt" | "events" => Some(Self::EVENTS),
            _ => None,
        }
    }

    /// Parse a comma-separated list of source names
    pub fn parse_list(list: &str) -> Result<Self, SourceError> {
        list.split(',')
            .filter(|name| !name.trim().is_empty())
            .try_fold(Self::empty(), |set, name| {
                Self::from_source_name(name)
                    .map(|flag| set | flag)
                    .ok_or_else(|| SourceError::InvalidRequest(format!("unknown source '{}'", name)))
            })
    }

    /// Key under which a single source's envelope is reported
    pub fn key(&self) -> Option<&'static str> {
        const KEYS: [(SourceSet, &str); 5] = [
            (SourceSet::ARCHIVE, "internet_archive"),
            (SourceSet::NEWSPAPERS, "chronicling_america"),
            (SourceSet::NYT, "nyt"),
            (SourceSet::GUARDIAN, "guardian"),
            (SourceSet::EVENTS, "gdelt"),
        ];
        KEYS.iter()
            .find(|(flag, _)| flag == self)
            .map(|(_, key)| *key)
    }
}

/// Common surface of every source client.
///
/// The typed `query` methods live on each client; `search` runs a query with
/// that source's default options.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier, also the key in aggregated results
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Kind of records this source returns
    fn kind(&self) -> RecordKind;

    /// Years the underlying data spans
    fn coverage(&self) -> Coverage;

    /// Selection flag for this source
    fn flag(&self) -> SourceSet;

    /// Query with default options
    async fn search(&self, request: &QueryRequest) -> ResultEnvelope;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API error from the source (non-2xx status)
    #[error("API error: {0}")]
    Api(String),

    /// Event warehouse rejected or failed the query
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

/// Collapse an internal result into an envelope, logging failures.
pub(crate) fn settle(
    source: &str,
    kind: RecordKind,
    result: Result<ResultEnvelope, SourceError>,
) -> ResultEnvelope {
    match result {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(source, error = %e, "query failed");
            ResultEnvelope::failure(kind, e.to_string())
        }
    }
}
