//! # Lucky Search
//!
//! Bibliographic search across several scholarly metadata APIs with a single
//! canonical request and a single canonical result schema.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Article, SearchRequest, etc.)
//! - [`sources`]: Source adapters (query translation, pagination, normalization)
//! - [`aggregator`]: Concurrent fan-out over every registered source
//! - [`utils`]: HTTP transport, validation and text helpers
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lucky_search::{config::Config, Aggregator, SearchRequest, SourceRegistry};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = SourceRegistry::from_config(&Config::default())?;
//! let aggregator = Aggregator::new(Arc::new(registry));
//! let response = aggregator.search(&SearchRequest::new("graphene")).await?;
//! println!("{} articles", response.total_results);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use aggregator::{Aggregator, SearchError};
pub use models::{Article, SearchRequest, SearchResponse};
pub use sources::{SourceAdapter, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
