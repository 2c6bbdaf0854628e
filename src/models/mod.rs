//! Core data models for historical search requests and results.

mod envelope;
mod query;

pub use envelope::{AggregatedResult, RecordKind, ResultEnvelope, SnapshotReference};
pub use query::{Coverage, QueryRequest};
