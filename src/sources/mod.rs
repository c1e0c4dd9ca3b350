//! Search source adapters with an extensible trait-based architecture.
//!
//! Every external search API is wrapped in a type implementing
//! [`SourceAdapter`]: it translates a canonical [`SearchRequest`] into the
//! API's native parameters, drains the API page by page, and normalizes each
//! raw record into an [`Article`]. The [`SourceRegistry`] holds the adapters
//! in registration order and the [`Aggregator`](crate::aggregator::Aggregator)
//! runs them side by side.
//!
//! # Feature Flags
//!
//! Individual sources can be disabled at compile time using Cargo features:
//!
//! - `openalex` - Enable OpenAlex source (default: enabled)
//! - `crossref` - Enable Crossref source (default: enabled)
//!
//! # Runtime Source Configuration
//!
//! Compiled-in sources can be switched off in the configuration file or the
//! environment:
//!
//! ```bash
//! export LUCKY_SEARCH_SOURCES__CROSSREF__ENABLED=false
//! ```

#[cfg(feature = "source-crossref")]
mod crossref;
pub mod mapping;
pub mod mock;
#[cfg(feature = "source-openalex")]
mod openalex;
pub mod pagination;
mod registry;

#[cfg(feature = "source-crossref")]
pub use crossref::CrossrefSource;
pub use mapping::{FieldMapping, NativeTerm};
pub use mock::{MockSource, MockTransport};
#[cfg(feature = "source-openalex")]
pub use openalex::OpenAlexSource;
pub use pagination::{CursorAdvance, PageProtocol, PaginatedFetcher};
pub use registry::SourceRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Article, SearchRequest};

/// One record exactly as a source returned it
pub type RawRecord = serde_json::Value;

/// An ordered, string-keyed bag of native query parameters.
///
/// Serializes as a sequence of pairs, so it can be handed straight to
/// `reqwest::RequestBuilder::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeParams(Vec<(String, String)>);

impl NativeParams {
    /// Create an empty parameter bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing an existing value in place
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse a parameter as a number
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Whether the parameter is set
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The capability every search source provides.
///
/// # Implementing a New Source
///
/// 1. Define a static [`FieldMapping`] for the filters the API can express
/// 2. Implement `translate` (pure), `fetch` (fail-soft) and `normalize` (total)
/// 3. Register the adapter in [`SourceRegistry::from_config`]
///
/// `translate` and `normalize` never do I/O. `fetch` never returns an error:
/// failures end pagination and whatever was collected so far is returned.
#[async_trait]
pub trait SourceAdapter: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "openalex", "crossref")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Canonical filters this source understands
    fn field_mapping(&self) -> &FieldMapping;

    /// Turn a canonical request into this source's native parameters
    fn translate(&self, request: &SearchRequest) -> NativeParams;

    /// Fetch up to `max_results` raw records, page by page
    async fn fetch(&self, params: NativeParams, max_results: usize) -> Vec<RawRecord>;

    /// Map one raw record onto the canonical schema
    fn normalize(&self, record: &RawRecord) -> Article;

    /// Run the full translate → fetch → normalize pipeline
    async fn search(&self, request: &SearchRequest) -> Vec<Article> {
        for (key, _) in request.filters.present() {
            if !self.field_mapping().supports(key) {
                tracing::debug!("{} ignores filter {}", self.id(), key);
            }
        }
        let params = self.translate(request);
        tracing::debug!("{} native params: {:?}", self.id(), params);

        let records = self.fetch(params, request.max_results).await;
        records.iter().map(|record| self.normalize(record)).collect()
    }
}

/// Errors that can occur when talking to a source.
///
/// These never leave a source's fetch boundary; they end pagination and are
/// logged.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// DNS, connect or timeout failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the source
    #[error("{source_id} returned HTTP {status}")]
    UpstreamStatus { source_id: String, status: u16 },

    /// Response body that cannot be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::MalformedResponse(format!("JSON: {}", err))
    }
}

/// Deserialize one field leniently.
///
/// Upstream schemas send `null` for absent lists and objects as often as they
/// omit the key, and occasionally a value of the wrong type. Either becomes
/// the type's default so the rest of the record survives.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        tracing::debug!("ignoring malformed field: {}", e);
        T::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_params_set_replaces_in_place() {
        let mut params = NativeParams::new();
        params.set("search", "graphene");
        params.set("page", 1);
        params.set("search", "carbon");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("search", "carbon"), ("page", "1")]);
        assert_eq!(params.get_usize("page"), Some(1));
        assert!(!params.contains("filter"));
    }

    #[test]
    fn test_native_params_serialize_as_pairs() {
        let mut params = NativeParams::new();
        params.set("rows", 20);
        params.set("sort", "relevance");

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!([["rows", "20"], ["sort", "relevance"]]));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Record {
        #[serde(deserialize_with = "lenient")]
        title: Option<String>,
        #[serde(deserialize_with = "lenient")]
        tags: Vec<String>,
        #[serde(deserialize_with = "lenient")]
        count: u64,
    }

    #[test]
    fn test_lenient_field_defaults_alone() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "title": "Kept",
            "tags": "not-a-list",
            "count": null
        }))
        .unwrap();
        assert_eq!(record.title.as_deref(), Some("Kept"));
        assert!(record.tags.is_empty());
        assert_eq!(record.count, 0);

        let record: Record =
            serde_json::from_value(serde_json::json!({ "title": 12, "count": 3 })).unwrap();
        assert_eq!(record.title, None);
        assert_eq!(record.count, 3);
    }

    #[test]
    fn test_upstream_status_message() {
        let err = SourceError::UpstreamStatus {
            source_id: "crossref".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "crossref returned HTTP 503");
    }
}
