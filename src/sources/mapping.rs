//! Static per-source field mappings.
//!
//! A [`FieldMapping`] says how each canonical [`FilterKey`] is expressed in a
//! source's query language. Mappings are plain statics: built at compile
//! time, shared read-only by every request.

use crate::models::{FilterKey, FilterValue};

/// How one canonical filter is written in a source's native query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTerm {
    /// `key:value` inside the source's `filter` parameter
    Filter(&'static str),
    /// `prefix:"value"` appended to the free-text query, once per value
    QueryField(&'static str),
    /// Bare `"value"` phrase appended to the free-text query
    QueryPhrase,
}

/// Mapping from canonical filter keys to a source's vocabulary
#[derive(Debug)]
pub struct FieldMapping {
    entries: &'static [(FilterKey, NativeTerm)],
}

impl FieldMapping {
    pub const fn new(entries: &'static [(FilterKey, NativeTerm)]) -> Self {
        Self { entries }
    }

    /// Native term for a key, `None` if the source cannot express it
    pub fn get(&self, key: FilterKey) -> Option<NativeTerm> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, term)| *term)
    }

    /// Whether the source understands this key
    pub fn supports(&self, key: FilterKey) -> bool {
        self.get(key).is_some()
    }

    /// Keys this source understands, in mapping order
    pub fn keys(&self) -> impl Iterator<Item = FilterKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }
}

/// OpenAlex `/works` filter vocabulary.
///
/// Every entry is a `filter=` clause; multiple values are OR-ed with `|`.
pub static OPENALEX_FIELDS: FieldMapping = FieldMapping::new(&[
    (FilterKey::Authors, NativeTerm::Filter("raw_author_name.search")),
    (
        FilterKey::JournalTitle,
        NativeTerm::Filter("primary_location.source.display_name.search"),
    ),
    (FilterKey::Issn, NativeTerm::Filter("primary_location.source.issn")),
    (FilterKey::ArticleTitle, NativeTerm::Filter("title.search")),
    (FilterKey::ArticleText, NativeTerm::Filter("fulltext.search")),
    (FilterKey::Abstract, NativeTerm::Filter("abstract.search")),
    (
        FilterKey::Affiliation,
        NativeTerm::Filter("raw_affiliation_strings.search"),
    ),
    (FilterKey::YearFrom, NativeTerm::Filter("from_publication_date")),
    (FilterKey::YearTo, NativeTerm::Filter("to_publication_date")),
    (FilterKey::AuthorsCount, NativeTerm::Filter("authors_count")),
    (
        FilterKey::CollaborationCountries,
        NativeTerm::Filter("authorships.institutions.country_code"),
    ),
]);

/// Crossref `/works` vocabulary.
///
/// Text filters become quoted fragments of the free-text `query`; dates and
/// ISSN go to `filter=`. Author count and countries have no equivalent.
pub static CROSSREF_FIELDS: FieldMapping = FieldMapping::new(&[
    (FilterKey::Authors, NativeTerm::QueryField("author")),
    (FilterKey::JournalTitle, NativeTerm::QueryField("container-title")),
    (FilterKey::Issn, NativeTerm::Filter("issn")),
    (FilterKey::ArticleTitle, NativeTerm::QueryField("title")),
    (FilterKey::ArticleText, NativeTerm::QueryPhrase),
    (FilterKey::Abstract, NativeTerm::QueryField("abstract")),
    (FilterKey::Affiliation, NativeTerm::QueryField("affiliation")),
    (FilterKey::YearFrom, NativeTerm::Filter("from-pub-date")),
    (FilterKey::YearTo, NativeTerm::Filter("until-pub-date")),

]);

/// Whether a native key takes a date literal rather than the raw value
fn is_date_key(native_key: &str) -> bool {
    native_key.ends_with("date")
}

/// Date literal for a year bound: `from…` keys open the year, others close it
pub fn date_bound(native_key: &str, year: i32) -> String {
    if native_key.starts_with("from") {
        format!("{:04}-01-01", year)
    } else {
        format!("{:04}-12-31", year)
    }
}

/// Native values for a filter under `native_key`.
///
/// Date keys turn a year into a date literal; everything else is tokenized.
/// Returns an empty list when nothing usable remains.
pub fn native_values(native_key: &str, value: &FilterValue<'_>) -> Vec<String> {
    if is_date_key(native_key) {
        return match value {
            FilterValue::Year(year) => vec![date_bound(native_key, *year)],
            _ => Vec::new(),
        };
    }
    value.tokens()
}

/// Single `key:v1|v2` clause with OR-joined values
pub fn or_clause(native_key: &str, value: &FilterValue<'_>) -> Option<String> {
    let values = native_values(native_key, value);
    if values.is_empty() {
        return None;
    }
    Some(format!("{}:{}", native_key, values.join("|")))
}

/// One `key:value` fragment per value
pub fn repeated_clauses(native_key: &str, value: &FilterValue<'_>) -> Vec<String> {
    native_values(native_key, value)
        .into_iter()
        .map(|v| format!("{}:{}", native_key, v))
        .collect()
}

/// One quoted free-text fragment per value; `prefix` of `None` gives bare phrases
pub fn quoted_fragments(prefix: Option<&str>, value: &FilterValue<'_>) -> Vec<String> {
    value
        .tokens()
        .into_iter()
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.trim().is_empty())
        .map(|token| match prefix {
            Some(prefix) => format!("{}:\"{}\"", prefix, token),
            None => format!("\"{}\"", token),
        })
        .collect()
}
