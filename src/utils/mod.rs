//! Utility modules supporting the sources.
//!
//! - [`HttpClient`]: shared HTTP client with a fixed per-request timeout
//! - [`fetch_text`]: send a request and return a 2xx body or a [`SourceError`](crate::sources::SourceError)
//! - [`compact_start`], [`iso_start`] and friends: range boundary formatting
//! - [`walk`] and [`iterate_all`]: sequential page walking over a [`PagedSource`]
//!
//! # Page walking
//!
//! ```rust,no_run
//! use historical_search::models::QueryRequest;
//! use historical_search::sources::{NytOptions, NytSource};
//! use historical_search::utils::iterate_all;
//!
//! # async fn example(nyt: NytSource) {
//! let request = QueryRequest::new("9/11", 2001, 2001);
//! let articles = iterate_all(&nyt, &request, Some(100), &NytOptions::default()).await;
//! println!("{} articles", articles.len());
//! # }
//! ```

mod dates;
mod http;
mod pagination;

pub use dates::{compact_end, compact_start, day_stamp, iso_end, iso_start};
pub use http::{fetch_text, validate_endpoint, HttpClient, LOOKUP_TIMEOUT, SEARCH_TIMEOUT};
pub use pagination::{iterate_all, walk, PageWalk, PagedSource, StopReason, SAFETY_CEILING};
