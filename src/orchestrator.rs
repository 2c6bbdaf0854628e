//! Multi-source search with per-source eligibility rules.
//!
//! The [`Orchestrator`] holds one client per source. The archive index and the
//! newspaper search need no credentials and are always present; the NYT,
//! Guardian and GDELT sources are attached through [`OrchestratorBuilder`]
//! only when their credentials exist.
//!
//! Sources are queried one after another (archive, newspapers, NYT,
//! Guardian, events) and each envelope is kept as returned. A failing source
//! shows up as a failure envelope; the aggregate itself never fails.

use std::sync::Arc;

use crate::config::Config;
use crate::models::{AggregatedResult, QueryRequest, RecordKind};
use crate::sources::{
    ArchiveIndexSource, BigQueryWarehouse, CdxOptions, ChroniclingAmericaOptions,
    ChroniclingAmericaSource, EventQuery, GdeltSource, GuardianOptions, GuardianSource,
    NytOptions, NytSource, Source, SourceError, SourceSet, WaybackFallback, CA_COVERAGE,
    GUARDIAN_FIRST_YEAR,
};
use crate::utils::{validate_endpoint, walk, HttpClient, PagedSource};

/// Records collected per paginated article source
pub const ARTICLE_CAP: usize = 100;

/// Event rows requested from the warehouse per search
pub const EVENT_CAP: u64 = 1_000;

/// Fans one query out over the configured sources
#[derive(Debug, Clone)]
pub struct Orchestrator {
    archive: ArchiveIndexSource,
    newspapers: ChroniclingAmericaSource,
    nyt: Option<NytSource>,
    guardian: Option<GuardianSource>,
    events: Option<GdeltSource>,
    fallback: WaybackFallback,
}

/// Builder for [`Orchestrator`]
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    archive: Option<ArchiveIndexSource>,
    newspapers: Option<ChroniclingAmericaSource>,
    nyt: Option<NytSource>,
    guardian: Option<GuardianSource>,
    events: Option<GdeltSource>,
    fallback: Option<WaybackFallback>,
}

impl OrchestratorBuilder {
    /// Replace the default archive index client
    pub fn archive(mut self, source: ArchiveIndexSource) -> Self {
        self.archive = Some(source);
        self
    }

    /// Replace the default newspaper search client
    pub fn newspapers(mut self, source: ChroniclingAmericaSource) -> Self {
        self.newspapers = Some(source);
        self
    }

    pub fn with_nyt(mut self, source: NytSource) -> Self {
        self.nyt = Some(source);
        self
    }

    pub fn with_guardian(mut self, source: GuardianSource) -> Self {
        self.guardian = Some(source);
        self
    }

    pub fn with_events(mut self, source: GdeltSource) -> Self {
        self.events = Some(source);
        self
    }

    /// Replace the default snapshot resolver
    pub fn fallback(mut self, fallback: WaybackFallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Build, creating default clients for anything not supplied
    pub fn build(self) -> Result<Orchestrator, SourceError> {
        let archive = match self.archive {
            Some(source) => source,
            None => ArchiveIndexSource::new()?,
        };
        let newspapers = match self.newspapers {
            Some(source) => source,
            None => ChroniclingAmericaSource::new()?,
        };
        let fallback = match self.fallback {
            Some(fallback) => fallback,
            None => WaybackFallback::new()?,
        };

        Ok(Orchestrator {
            archive,
            newspapers,
            nyt: self.nyt,
            guardian: self.guardian,
            events: self.events,
            fallback,
        })
    }
}

impl Orchestrator {
    /// Orchestrator with only the credential-free sources
    pub fn new() -> Result<Self, SourceError> {
        Self::builder().build()
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Wire every source the configuration has credentials for
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let search = Arc::new(HttpClient::with_timeout(config.timeouts.search())?);
        let lookup = Arc::new(HttpClient::with_timeout(config.timeouts.availability())?);
        let endpoints = &config.endpoints;

        let mut archive = ArchiveIndexSource::with_client(Arc::clone(&search));
        if let Some(endpoint) = &endpoints.cdx {
            archive = archive.with_endpoint(validate_endpoint(endpoint)?);
        }

        let mut newspapers = ChroniclingAmericaSource::with_client(Arc::clone(&search));
        if let Some(endpoint) = &endpoints.chronicling_america {
            newspapers = newspapers.with_endpoint(validate_endpoint(endpoint)?);
        }

        let mut fallback = WaybackFallback::with_client(lookup);
        if let Some(endpoint) = &endpoints.availability {
            fallback = fallback.with_endpoint(validate_endpoint(endpoint)?);
        }

        let mut builder = Self::builder()
            .archive(archive)
            .newspapers(newspapers)
            .fallback(fallback);

        if let Some(key) = &config.api_keys.nyt {
            let mut nyt = NytSource::with_client(Arc::clone(&search), key);
            if let Some(endpoint) = &endpoints.nyt {
                nyt = nyt.with_endpoint(validate_endpoint(endpoint)?);
            }
            builder = builder.with_nyt(nyt);
        }

        if let Some(key) = &config.api_keys.guardian {
            let mut guardian = GuardianSource::with_client(Arc::clone(&search), key);
            if let Some(endpoint) = &endpoints.guardian {
                guardian = guardian.with_endpoint(validate_endpoint(endpoint)?);
            }
            builder = builder.with_guardian(guardian);
        }

        if let Some((project, token)) = config.gdelt.credentials() {
            let mut warehouse = BigQueryWarehouse::with_client(Arc::clone(&search), project, token);
            if let Some(endpoint) = &endpoints.bigquery {
                warehouse = warehouse.with_endpoint(validate_endpoint(endpoint)?);
            }
            let mut events = GdeltSource::new(Arc::new(warehouse));
            if let Some(table) = &config.gdelt.table {
                events = events.with_table(table);
            }
            builder = builder.with_events(events);
        }

        builder.build()
    }

    /// Sources this orchestrator can query
    pub fn enabled(&self) -> SourceSet {
        self.sources()
            .iter()
            .fold(SourceSet::empty(), |set, source| set | source.flag())
    }

    /// Every attached source, in query order
    pub fn sources(&self) -> Vec<&dyn Source> {
        let mut sources: Vec<&dyn Source> = Vec::with_capacity(5);
        sources.push(&self.archive);
        sources.push(&self.newspapers);
        if let Some(nyt) = &self.nyt {
            sources.push(nyt);
        }
        if let Some(guardian) = &self.guardian {
            sources.push(guardian);
        }
        if let Some(events) = &self.events {
            sources.push(events);
        }
        sources
    }

    pub fn archive(&self) -> &ArchiveIndexSource {
        &self.archive
    }

    pub fn newspapers(&self) -> &ChroniclingAmericaSource {
        &self.newspapers
    }

    pub fn nyt(&self) -> Option<&NytSource> {
        self.nyt.as_ref()
    }

    pub fn guardian(&self) -> Option<&GuardianSource> {
        self.guardian.as_ref()
    }

    pub fn events(&self) -> Option<&GdeltSource> {
        self.events.as_ref()
    }

    /// Snapshot resolver for dead links
    pub fn fallback(&self) -> &WaybackFallback {
        &self.fallback
    }

    /// Sources selected when the caller does not name any.
    ///
    /// Archive and newspapers always; Guardian from 1999 on; NYT and events
    /// when attached.
    pub fn default_selection(&self, start_year: i32) -> SourceSet {
        let mut selected = SourceSet::ARCHIVE | SourceSet::NEWSPAPERS;
        if start_year >= GUARDIAN_FIRST_YEAR {
            selected |= SourceSet::GUARDIAN;
        }
        if self.nyt.is_some() {
            selected |= SourceSet::NYT;
        }
        if self.events.is_some() {
            selected |= SourceSet::EVENTS;
        }
        selected
    }

    /// Search every applicable source for `query` between two years.
    ///
    /// `include_sources` overrides [`default_selection`](Self::default_selection).
    /// Coverage gates still apply to an explicit selection: newspapers are
    /// skipped when the range starts after 1963, Guardian when it starts
    /// before 1999, and sources without credentials are never queried.
    pub async fn comprehensive_search(
        &self,
        query: &str,
        start_year: i32,
        end_year: i32,
        include_sources: Option<SourceSet>,
        verbose: bool,
    ) -> AggregatedResult {
        let selected = include_sources.unwrap_or_else(|| self.default_selection(start_year));
        let request = QueryRequest::new(query, start_year, end_year);
        let mut result = AggregatedResult::new(query, start_year, end_year);

        if selected.contains(SourceSet::ARCHIVE) {
            announce(verbose, self.archive.name());
            let domain = query.replace(' ', "").to_lowercase();
            let envelope = self
                .archive
                .query(&QueryRequest::new(domain, start_year, end_year), &CdxOptions::default())
                .await;
            result.insert(self.archive.id(), envelope);
        }

        if selected.contains(SourceSet::NEWSPAPERS) {
            match CA_COVERAGE.clamp(start_year, end_year) {
                Some((first, last)) => {
                    announce(verbose, self.newspapers.name());
                    let envelope = self
                        .newspapers
                        .query(
                            &request.with_years(first, last),
                            &ChroniclingAmericaOptions::default(),
                        )
                        .await;
                    result.insert(self.newspapers.id(), envelope);
                }
                None => tracing::debug!(
                    range = %request.date_range(),
                    coverage = %CA_COVERAGE,
                    "skipping Chronicling America"
                ),
            }
        }

        if selected.contains(SourceSet::NYT) {
            if let Some(nyt) = &self.nyt {
                announce(verbose, nyt.name());
                let envelope = walk(nyt, &request, Some(ARTICLE_CAP), &NytOptions::default())
                    .await
                    .into_envelope(RecordKind::Articles, nyt.first_page());
                result.insert(nyt.id(), envelope);
            }
        }

        if selected.contains(SourceSet::GUARDIAN) && start_year >= GUARDIAN_FIRST_YEAR {
            if let Some(guardian) = &self.guardian {
                announce(verbose, guardian.name());
                let request = request.with_years(start_year.max(GUARDIAN_FIRST_YEAR), end_year);
                let envelope = walk(guardian, &request, Some(ARTICLE_CAP), &GuardianOptions::default())
                    .await
                    .into_envelope(RecordKind::Articles, guardian.first_page());
                result.insert(guardian.id(), envelope);
            }
        }

        if selected.contains(SourceSet::EVENTS) {
            if let Some(events) = &self.events {
                announce(verbose, events.name());
                let filters = EventQuery {
                    limit: EVENT_CAP,
                    ..EventQuery::default()
                };
                let envelope = events.query(&request, &filters).await;
                result.insert(events.id(), envelope);
            }
        }

        if verbose {
            tracing::info!(
                sources = result.sources.len(),
                failed = result.failed_sources().len(),
                total_articles = result.total_articles,
                "search complete"
            );
        }

        result
    }
}

fn announce(verbose: bool, source: &str) {
    if verbose {
        tracing::info!("Querying {}...", source);
    } else {
        tracing::debug!(source, "querying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator_with_keys() -> Orchestrator {
        Orchestrator::builder()
            .with_nyt(NytSource::new("nyt-key").unwrap())
            .with_guardian(GuardianSource::new("guardian-key").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_selection_without_keys() {
        let orchestrator = Orchestrator::new().unwrap();

        let selected = orchestrator.default_selection(1970);
        assert_eq!(selected, SourceSet::ARCHIVE | SourceSet::NEWSPAPERS);

        let selected = orchestrator.default_selection(2001);
        assert!(selected.contains(SourceSet::GUARDIAN));
        assert!(!selected.contains(SourceSet::NYT));
        assert!(!selected.contains(SourceSet::EVENTS));
    }

    #[test]
    fn test_default_selection_with_keys() {
        let orchestrator = orchestrator_with_keys();

        let selected = orchestrator.default_selection(1970);
        assert!(selected.contains(SourceSet::NYT));
        assert!(!selected.contains(SourceSet::GUARDIAN));

        let selected = orchestrator.default_selection(1999);
        assert!(selected.contains(SourceSet::NYT | SourceSet::GUARDIAN));
    }

    #[test]
    fn test_enabled_sources() {
        let orchestrator = orchestrator_with_keys();
        assert_eq!(
            orchestrator.enabled(),
            SourceSet::ARCHIVE | SourceSet::NEWSPAPERS | SourceSet::NYT | SourceSet::GUARDIAN
        );

        let ids: Vec<&str> = orchestrator.sources().iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["internet_archive", "chronicling_america", "nyt", "guardian"]);
    }

    #[test]
    fn test_from_config_respects_credentials() {
        let mut config = Config::default();
        config.api_keys.nyt = Some("key".into());
        config.api_keys.guardian = None;
        config.gdelt.project_id = None;
        config.gdelt.access_token = None;

        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert!(orchestrator.nyt().is_some());
        assert!(orchestrator.guardian().is_none());
        assert!(orchestrator.events().is_none());
    }
}
