//! Paginated fetching against a single source.
//!
//! The fetcher requests one page at a time and stops when the result budget
//! is met, when a page comes back shorter than requested, or when a request
//! fails. Failures are logged and the records gathered so far are returned.

use std::time::Duration;

use crate::sources::{NativeParams, RawRecord, SourceError};
use crate::utils::HttpTransport;

/// How the pagination cursor moves after each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAdvance {
    /// Offset cursor, moved by the number of records actually received
    ByReceived,
    /// Page index, moved by one per page
    ByOne,
}

/// A source's pagination protocol
#[derive(Debug, Clone, PartialEq)]
pub struct PageProtocol {
    /// JSON pointer to the array of records in a page body
    pub items_pointer: &'static str,
    /// Parameter carrying the page size
    pub size_param: &'static str,
    /// Parameter carrying the cursor
    pub cursor_param: &'static str,
    /// Cursor value when the translated params do not set one
    pub first_cursor: usize,
    pub advance: CursorAdvance,
    /// Largest page the source serves
    pub max_page_size: usize,
    /// Page size when the translated params do not set one
    pub default_page_size: usize,
}

impl PageProtocol {
    /// Effective page size for a translated parameter bag
    pub fn page_size(&self, params: &NativeParams) -> usize {
        params
            .get_usize(self.size_param)
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
            .max(1)
    }

    /// Cursor value after a page of `received` records
    pub fn next_cursor(&self, cursor: usize, received: usize) -> usize {
        match self.advance {
            CursorAdvance::ByReceived => cursor + received,
            CursorAdvance::ByOne => cursor + 1,
        }
    }
}

/// Drains one source through an [`HttpTransport`]
#[derive(Debug)]
pub struct PaginatedFetcher<'a> {
    transport: &'a dyn HttpTransport,
    url: &'a str,
    protocol: &'a PageProtocol,
    timeout: Duration,
    source_id: &'a str,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        url: &'a str,
        protocol: &'a PageProtocol,
        timeout: Duration,
        source_id: &'a str,
    ) -> Self {
        Self {
            transport,
            url,
            protocol,
            timeout,
            source_id,
        }
    }

    /// Fetch up to `max_results` records.
    ///
    /// Never fails: a failed page ends pagination and the records already
    /// collected are returned.
    pub async fn fetch(&self, mut params: NativeParams, max_results: usize) -> Vec<RawRecord> {
        let page_size = self.protocol.page_size(&params);
        let mut cursor = params
            .get_usize(self.protocol.cursor_param)
            .unwrap_or(self.protocol.first_cursor);
        let mut records: Vec<RawRecord> = Vec::new();

        while records.len() < max_results {
            params.set(self.protocol.size_param, page_size);
            params.set(self.protocol.cursor_param, cursor);

            let page = match self.fetch_page(&params).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        "{}: stopping after {} records: {}",
                        self.source_id,
                        records.len(),
                        e
                    );
                    break;
                }
            };

            let received = page.len();
            tracing::debug!(
                "{}: {}={} requested={} received={}",
                self.source_id,
                self.protocol.cursor_param,
                cursor,
                page_size,
                received
            );

            records.extend(page);
            cursor = self.protocol.next_cursor(cursor, received);

            if received < page_size {
                tracing::debug!("{}: last page reached", self.source_id);
                break;
            }
        }

        records.truncate(max_results);
        records
    }

    async fn fetch_page(&self, params: &NativeParams) -> Result<Vec<RawRecord>, SourceError> {
        let response = self
            .transport
            .get_json(self.url, params, self.timeout)
            .await?;

        if !response.is_success() {
            return Err(SourceError::UpstreamStatus {
                source_id: self.source_id.to_string(),
                status: response.status,
            });
        }

        match response.body.pointer(self.protocol.items_pointer) {
            Some(serde_json::Value::Array(items)) => Ok(items.clone()),
            Some(serde_json::Value::Null) => Ok(Vec::new()),
            _ => Err(SourceError::MalformedResponse(format!(
                "{}: no record array at {}",
                self.source_id, self.protocol.items_pointer
            ))),
        }
    }
}
