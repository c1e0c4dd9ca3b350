//! Concurrent multi-source search.
//!
//! Each registered source runs its own translate → fetch → normalize
//! pipeline on a separate task. Results are concatenated in registration
//! order once every pipeline has finished. A source that fails, panics or
//! returns nothing only contributes zero articles.

use std::sync::Arc;
use std::time::Instant;

use crate::models::{SearchRequest, SearchResponse};
use crate::sources::SourceRegistry;
use crate::utils::ValidationError;

/// Errors returned to the caller of [`Aggregator::search`]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    InvalidRequest(#[from] ValidationError),
}

/// Fans one request out to every registered source
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Validate the request, run all sources and merge their articles.
    ///
    /// Only an invalid request is an error; source failures are logged and
    /// yield an empty contribution.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        request.validate()?;

        let started = Instant::now();
        let request = Arc::new(request.clone());

        let handles: Vec<_> = self
            .registry
            .all()
            .map(|source| {
                let source = Arc::clone(source);
                let request = Arc::clone(&request);
                let id = source.id().to_string();
                let handle = tokio::spawn(async move { source.search(&request).await });
                (id, handle)
            })
            .collect();

        let mut articles = Vec::new();
        for (id, handle) in handles {
            match handle.await {
                Ok(found) => {
                    tracing::debug!("{}: {} articles", id, found.len());
                    articles.extend(found);
                }
                Err(e) => tracing::warn!("{}: search task failed: {}", id, e),
            }
        }

        let search_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            "Search for {:?} returned {} articles from {} sources in {:.1} ms",
            request.query,
            articles.len(),
            self.registry.len(),
            search_time_ms
        );

        Ok(SearchResponse {
            total_results: articles.len(),
            total_pages: 1,
            current_page: request.page,
            page_size: request.page_size,
            search_time_ms,
            articles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Filters, SearchRequest};
    use crate::sources::mock::{make_article, MockSource};
    use crate::sources::{FieldMapping, NativeParams, RawRecord, SourceAdapter};
    use async_trait::async_trait;

    fn aggregator(sources: Vec<MockSource>) -> Aggregator {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(Arc::new(source));
        }
        Aggregator::new(Arc::new(registry))
    }

    fn titles(response: &SearchResponse) -> Vec<&str> {
        response.articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_merges_in_registration_order() {
        let aggregator = aggregator(vec![
            MockSource::new("first").with_articles(vec![
                make_article("1", "A1"),
                make_article("2", "A2"),
                make_article("3", "A3"),
            ]),
            MockSource::new("second"),
            MockSource::new("third").with_articles(vec![make_article("4", "C1")]),
        ]);

        let response = aggregator
            .search(&SearchRequest::new("q").page(2).page_size(10))
            .await
            .unwrap();

        assert_eq!(titles(&response), vec!["A1", "A2", "A3", "C1"]);
        assert_eq!(response.total_results, 4);
        assert_eq!(response.total_pages, 1);
        assert_eq!(response.current_page, 2);
        assert_eq!(response.page_size, 10);
        assert!(response.search_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_others() {
        let aggregator = aggregator(vec![
            MockSource::failing("broken"),
            MockSource::new("ok").with_articles(vec![make_article("1", "B1")]),
        ]);

        let response = aggregator.search(&SearchRequest::new("q")).await.unwrap();
        assert_eq!(titles(&response), vec!["B1"]);
    }

    #[tokio::test]
    async fn test_no_sources_returns_empty() {
        let aggregator = Aggregator::new(Arc::new(SourceRegistry::new()));
        let response = aggregator.search(&SearchRequest::new("q")).await.unwrap();
        assert!(response.articles.is_empty());
        assert_eq!(response.total_results, 0);
    }

    #[tokio::test]
    async fn test_budget_applies_per_source() {
        let many: Vec<Article> = (0..5).map(|i| make_article(&i.to_string(), "x")).collect();
        let aggregator = aggregator(vec![
            MockSource::new("a").with_articles(many.clone()),
            MockSource::new("b").with_articles(many),
        ]);

        let response = aggregator
            .search(&SearchRequest::new("q").max_results(2))
            .await
            .unwrap();
        assert_eq!(response.total_results, 4);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let aggregator = aggregator(vec![
            MockSource::new("a").with_articles(vec![make_article("1", "A1")])
        ]);
        let request =
            SearchRequest::new("q").filters(Filters::default().years(Some(2023), Some(2020)));

        let result = aggregator.search(&request).await;
        assert!(matches!(
            result,
            Err(SearchError::InvalidRequest(
                ValidationError::YearRangeReversed { .. }
            ))
        ));
    }

    #[derive(Debug)]
    struct PanickingSource;

    static NO_FIELDS: FieldMapping = FieldMapping::new(&[]);

    #[async_trait]
    impl SourceAdapter for PanickingSource {
        fn id(&self) -> &str {
            "panics"
        }

        fn name(&self) -> &str {
            "Panics"
        }

        fn field_mapping(&self) -> &FieldMapping {
            &NO_FIELDS
        }

        fn translate(&self, _request: &SearchRequest) -> NativeParams {
            NativeParams::new()
        }

        async fn fetch(&self, _params: NativeParams, _max_results: usize) -> Vec<RawRecord> {
            panic!("boom")
        }

        fn normalize(&self, _record: &RawRecord) -> Article {
            Article::default()
        }
    }

    #[tokio::test]
    async fn test_panicking_source_is_isolated() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(PanickingSource));
        registry.register(Arc::new(
            MockSource::new("ok").with_articles(vec![make_article("1", "B1")]),
        ));
        let aggregator = Aggregator::new(Arc::new(registry));

        let response = aggregator.search(&SearchRequest::new("q")).await.unwrap();
        assert_eq!(titles(&response), vec!["B1"]);
    }
}
