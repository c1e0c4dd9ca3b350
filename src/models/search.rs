//! Search request and response models.

use serde::{Deserialize, Serialize};

use crate::models::Article;
use crate::utils::{
    validate_countries, validate_page, validate_page_size, validate_year, validate_year_range,
    ValidationError,
};

/// Default page size when the request does not carry one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default per-source result budget
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Canonical filter keys understood by the engine.
///
/// Each source maps a subset of these onto its own vocabulary; keys a source
/// has no mapping for are ignored by that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Authors,
    JournalTitle,
    Issn,
    ArticleTitle,
    ArticleText,
    Abstract,
    Affiliation,
    YearFrom,
    YearTo,
    AuthorsCount,
    CollaborationCountries,
}

impl FilterKey {
    /// All keys in canonical order
    pub const ALL: [FilterKey; 11] = [
        FilterKey::Authors,
        FilterKey::JournalTitle,
        FilterKey::Issn,
        FilterKey::ArticleTitle,
        FilterKey::ArticleText,
        FilterKey::Abstract,
        FilterKey::Affiliation,
        FilterKey::YearFrom,
        FilterKey::YearTo,
        FilterKey::AuthorsCount,
        FilterKey::CollaborationCountries,
    ];

    /// Field name as it appears in the request body
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Authors => "authors",
            FilterKey::JournalTitle => "journal_title",
            FilterKey::Issn => "issn",
            FilterKey::ArticleTitle => "article_title",
            FilterKey::ArticleText => "article_text",
            FilterKey::Abstract => "abstract",
            FilterKey::Affiliation => "affiliation",
            FilterKey::YearFrom => "year_from",
            FilterKey::YearTo => "year_to",
            FilterKey::AuthorsCount => "authors_count",
            FilterKey::CollaborationCountries => "collaboration_countries",
        }
    }
}

impl std::fmt::Display for FilterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present filter value, borrowed from [`Filters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterValue<'a> {
    /// Free text, possibly comma-separated
    Text(&'a str),
    /// Explicit list of values
    List(&'a [String]),
    Year(i32),
    Count(u32),
}

impl FilterValue<'_> {
    /// Split the value into trimmed, non-empty tokens.
    ///
    /// Text is split on commas, list items are taken one by one. `"US, CN"`
    /// and `["US", "CN"]` produce the same tokens.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            FilterValue::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            FilterValue::List(items) => items
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            FilterValue::Year(year) => vec![year.to_string()],
            FilterValue::Count(count) => vec![count.to_string()],
        }
    }
}

/// A multi-value filter field: either one comma-separated string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    Text(String),
    List(Vec<String>),
}

impl MultiValue {
    /// Borrow as a [`FilterValue`]
    pub fn as_filter_value(&self) -> FilterValue<'_> {
        match self {
            MultiValue::Text(text) => FilterValue::Text(text),
            MultiValue::List(items) => FilterValue::List(items),
        }
    }

    /// Trimmed, non-empty tokens
    pub fn tokens(&self) -> Vec<String> {
        self.as_filter_value().tokens()
    }
}

impl From<&str> for MultiValue {
    fn from(text: &str) -> Self {
        MultiValue::Text(text.to_string())
    }
}

impl From<String> for MultiValue {
    fn from(text: String) -> Self {
        MultiValue::Text(text)
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(items: Vec<String>) -> Self {
        MultiValue::List(items)
    }
}

/// Structured search filters. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Author names
    pub authors: Option<MultiValue>,

    pub journal_title: Option<MultiValue>,

    pub issn: Option<MultiValue>,

    pub article_title: Option<MultiValue>,

    /// Full-text search terms
    pub article_text: Option<MultiValue>,

    pub r#abstract: Option<MultiValue>,

    pub affiliation: Option<MultiValue>,

    pub year_from: Option<i32>,

    pub year_to: Option<i32>,

    /// Exact number of authors
    pub authors_count: Option<u32>,

    /// Country codes of collaborating institutions (at most 4)
    pub collaboration_countries: Option<MultiValue>,
}

impl Filters {
    /// Get the value for a key, if the field is set
    pub fn get(&self, key: FilterKey) -> Option<FilterValue<'_>> {
        fn multi(value: &Option<MultiValue>) -> Option<FilterValue<'_>> {
            value.as_ref().map(MultiValue::as_filter_value)
        }
        match key {
            FilterKey::Authors => multi(&self.authors),
            FilterKey::JournalTitle => multi(&self.journal_title),
            FilterKey::Issn => multi(&self.issn),
            FilterKey::ArticleTitle => multi(&self.article_title),
            FilterKey::ArticleText => multi(&self.article_text),
            FilterKey::Abstract => multi(&self.r#abstract),
            FilterKey::Affiliation => multi(&self.affiliation),
            FilterKey::YearFrom => self.year_from.map(FilterValue::Year),
            FilterKey::YearTo => self.year_to.map(FilterValue::Year),
            FilterKey::AuthorsCount => self.authors_count.map(FilterValue::Count),
            FilterKey::CollaborationCountries => multi(&self.collaboration_countries),
        }
    }

    /// Iterate over the set fields in canonical key order
    pub fn present(&self) -> impl Iterator<Item = (FilterKey, FilterValue<'_>)> {
        FilterKey::ALL
            .into_iter()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }

    /// True when no field carries a usable token
    pub fn is_empty(&self) -> bool {
        self.present().all(|(_, value)| value.tokens().is_empty())
    }

    /// Set authors
    pub fn authors(mut self, authors: impl Into<MultiValue>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    /// Set year range bounds
    pub fn years(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    /// Set collaboration countries
    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collaboration_countries = Some(MultiValue::List(
            countries.into_iter().map(Into::into).collect(),
        ));
        self
    }
}

/// A normalized search request, as received at the inbound boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    #[serde(default)]
    pub query: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Filters,

    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,

    /// Records per upstream HTTP call
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on records fetched per source
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: Filters::default(),
            page: default_page(),
            page_size: default_page_size(),
            max_results: default_max_results(),
        }
    }
}

impl SearchRequest {
    /// Create a new search request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set filters
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Set page number
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set page size
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set per-source result budget
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Check the field ranges and the cross-field year ordering
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_page(self.page)?;
        validate_page_size(self.page_size)?;

        let filters = &self.filters;
        if let Some(year) = filters.year_from {
            validate_year(year)?;
        }
        if let Some(year) = filters.year_to {
            validate_year(year)?;
        }
        validate_year_range(filters.year_from, filters.year_to)?;

        if filters.authors_count == Some(0) {
            return Err(ValidationError::InvalidAuthorsCount);
        }
        if let Some(countries) = &filters.collaboration_countries {
            validate_countries(&countries.tokens())?;
        }

        Ok(())
    }
}

/// Aggregated search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub articles: Vec<Article>,

    /// Number of articles in this response
    pub total_results: usize,

    pub total_pages: usize,

    pub current_page: u32,

    pub page_size: u32,

    /// Wall-clock time of the aggregation
    pub search_time_ms: f64,
}
