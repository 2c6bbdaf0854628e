//! Wayback Machine fallback for dead links.

use serde::Deserialize;
use std::sync::Arc;

use crate::models::SnapshotReference;
use crate::sources::archive_index::wayback_url;
use crate::sources::SourceError;
use crate::utils::{compact_start, day_stamp, fetch_text, HttpClient, LOOKUP_TIMEOUT};

const AVAILABILITY_API_BASE: &str = "https://archive.org/wayback/available";

/// Resolves archived snapshot addresses for links that have rotted
#[derive(Debug, Clone)]
pub struct WaybackFallback {
    client: Arc<HttpClient>,
    endpoint: String,
}

impl WaybackFallback {
    /// Create a resolver using the short lookup timeout
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::with_timeout(
            LOOKUP_TIMEOUT,
        )?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            endpoint: AVAILABILITY_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Snapshot address for mid-June of `year`
    pub fn closest_snapshot_url(url: &str, year: i32) -> String {
        Self::closest_snapshot_url_on(url, year, 6, 15)
    }

    /// Snapshot address for a given day.
    ///
    /// The Wayback Machine redirects to the capture nearest that day. Month
    /// and day are not range checked.
    pub fn closest_snapshot_url_on(url: &str, year: i32, month: u32, day: u32) -> String {
        wayback_url(&day_stamp(year, month, day), url)
    }

    /// Ask the availability API for the capture closest to January 1st of `year`.
    ///
    /// Never fails: a lookup error is reported through
    /// [`SnapshotReference::error`] with `available` false.
    pub async fn check_availability(&self, url: &str, year: i32) -> SnapshotReference {
        match self.lookup(url, year).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(%url, year, error = %e, "availability check failed");
                SnapshotReference::unavailable(e.to_string())
            }
        }
    }

    async fn lookup(&self, url: &str, year: i32) -> Result<SnapshotReference, SourceError> {
        let params = [("url", url.to_string()), ("timestamp", compact_start(year))];
        tracing::debug!(%url, year, "checking Wayback availability");

        let body = fetch_text(
            self.client.get(&self.endpoint).query(&params),
            "Wayback availability API",
        )
        .await?;

        Ok(Self::parse_availability(&body)?)
    }

    fn parse_availability(body: &str) -> Result<SnapshotReference, serde_json::Error> {
        let data: AvailabilityResponse = serde_json::from_str(body)?;
        let closest = data.archived_snapshots.closest.unwrap_or_default();

        Ok(SnapshotReference {
            url: closest.url,
            timestamp: closest.timestamp,
            available: closest.available,
            status: closest.status,
            error: None,
        })
    }
}

// ===== Availability API Types =====

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    #[serde(default)]
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Default, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    #[serde(default)]
    url: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    status: Option<String>,
}
