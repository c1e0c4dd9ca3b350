//! Mock source and transport for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Article, SearchRequest};
use crate::sources::mapping::FieldMapping;
use crate::sources::{NativeParams, RawRecord, SourceAdapter, SourceError};
use crate::utils::{HttpTransport, JsonResponse};

static MOCK_FIELDS: FieldMapping = FieldMapping::new(&[]);

/// A mock source for testing that returns predefined articles.
///
/// Raw records are serialized [`Article`]s, so `normalize` is a plain
/// deserialization.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    records: Mutex<Vec<RawRecord>>,
    fail: bool,
}

impl MockSource {
    /// Create a new mock source with no articles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A mock source whose fetch always fails (and therefore yields nothing).
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    /// Set the articles to return.
    pub fn set_articles(&self, articles: Vec<Article>) {
        let mut guard = self.records.lock().unwrap();
        *guard = articles
            .iter()
            .map(|a| serde_json::to_value(a).unwrap_or_default())
            .collect();
    }

    /// Builder form of [`set_articles`](Self::set_articles).
    pub fn with_articles(self, articles: Vec<Article>) -> Self {
        self.set_articles(articles);
        self
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn field_mapping(&self) -> &FieldMapping {
        &MOCK_FIELDS
    }

    fn translate(&self, request: &SearchRequest) -> NativeParams {
        let mut params = NativeParams::new();
        params.set("q", &request.query);
        params
    }

    async fn fetch(&self, _params: NativeParams, max_results: usize) -> Vec<RawRecord> {
        if self.fail {
            tracing::warn!("{}: simulated failure", self.id);
            return Vec::new();
        }
        let guard = self.records.lock().unwrap();
        guard.iter().take(max_results).cloned().collect()
    }

    fn normalize(&self, record: &RawRecord) -> Article {
        serde_json::from_value(record.clone()).unwrap_or_default()
    }
}

/// One request seen by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockCall {
    pub url: String,
    pub params: NativeParams,
    pub timeout: Duration,
}

/// An [`HttpTransport`] that replays scripted responses in order.
///
/// Once the script runs out every request fails with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<JsonResponse, SourceError>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and JSON body.
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(JsonResponse::new(status, body)));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: SourceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Requests made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get_json(
        &self,
        url: &str,
        params: &NativeParams,
        timeout: Duration,
    ) -> Result<JsonResponse, SourceError> {
        self.calls.lock().unwrap().push(MockCall {
            url: url.to_string(),
            params: params.clone(),
            timeout,
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SourceError::Transport("no scripted response".to_string())))
    }
}

/// Helper function to create a mock article for testing.
pub fn make_article(id: &str, title: &str) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("http://example.com/{}", id),
        ..Default::default()
    }
}
