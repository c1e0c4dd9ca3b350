//! Registry of the search sources taking part in a search.

use std::sync::Arc;

use crate::config::Config;

use super::{SourceAdapter, SourceError};

/// Registry for all configured search sources
///
/// Sources are kept in registration order; the aggregator merges results in
/// that same order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every compiled-in source enabled in `config`
    #[cfg_attr(
        not(any(feature = "source-openalex", feature = "source-crossref")),
        allow(unused_variables)
    )]
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "source-openalex")]
        if config.sources.openalex.enabled {
            let source = super::OpenAlexSource::new(config.sources.openalex.clone())?;
            registry.register(Arc::new(source));
        }

        #[cfg(feature = "source-crossref")]
        if config.sources.crossref.enabled {
            let source = super::CrossrefSource::new(config.sources.crossref.clone())?;
            registry.register(Arc::new(source));
        }

        if registry.is_empty() {
            tracing::warn!("No search sources enabled");
        }

        Ok(registry)
    }

    /// Register a source. A source with the same id is replaced in place.
    pub fn register(&mut self, source: Arc<dyn SourceAdapter>) {
        match self.sources.iter_mut().find(|s| s.id() == source.id()) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Get all registered sources, in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.sources.iter()
    }

    /// Get all source IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Check if a source exists
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
