//! # Historical Search
//!
//! Search aggregator for historical news and documents across web archives,
//! digitized newspapers, news APIs and event databases.
//!
//! ## Architecture
//!
//! - [`models`]: Query requests, result envelopes and aggregated results
//! - [`sources`]: One client per external service, plus the Wayback fallback
//! - [`orchestrator`]: Fans a query out over the eligible sources
//! - [`utils`]: HTTP client, date formatting and page walking
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod orchestrator;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{AggregatedResult, QueryRequest, ResultEnvelope, SnapshotReference};
pub use orchestrator::Orchestrator;
pub use sources::{Source, SourceError, SourceSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
