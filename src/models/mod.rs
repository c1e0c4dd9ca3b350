//! Core data models for search requests and normalized articles.

mod article;
mod search;

pub use article::{
    annual_citations, bare_doi, countries_from_authors, Article, ArticleBuilder, Author,
    CountryInfo,
};
pub use search::{
    FilterKey, FilterValue, Filters, MultiValue, SearchRequest, SearchResponse,
    DEFAULT_MAX_RESULTS, DEFAULT_PAGE_SIZE,
};
