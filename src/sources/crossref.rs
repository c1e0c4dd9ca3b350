//! CrossRef search source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::CrossrefConfig;
use crate::models::{bare_doi, Article, ArticleBuilder, Author, SearchRequest};
use crate::sources::mapping::{
    quoted_fragments, repeated_clauses, FieldMapping, NativeTerm, CROSSREF_FIELDS,
};
use crate::sources::pagination::{CursorAdvance, PageProtocol, PaginatedFetcher};
use crate::sources::{lenient, NativeParams, RawRecord, SourceAdapter, SourceError};
use crate::utils::{current_year, split_display_name, strip_markup, HttpClient, HttpTransport};

/// CrossRef search source
///
/// Uses the CrossRef REST API `/works` endpoint. Text filters are folded into
/// the free-text `query` as quoted fragments; dates and ISSN go into
/// `filter`. Pagination is offset-based.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    transport: Arc<dyn HttpTransport>,
    config: CrossrefConfig,
    works_url: String,
    protocol: PageProtocol,
}

impl CrossrefSource {
    pub fn new(config: CrossrefConfig) -> Result<Self, SourceError> {
        let user_agent = match &config.mailto {
            Some(email) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                email
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };
        let client = HttpClient::with_user_agent(&user_agent)?;
        Ok(Self::with_transport(config, Arc::new(client)))
    }

    /// Create with an explicit transport
    pub fn with_transport(config: CrossrefConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let protocol = PageProtocol {
            items_pointer: "/message/items",
            size_param: "rows",
            cursor_param: "offset",
            first_cursor: 0,
            advance: CursorAdvance::ByReceived,
            max_page_size: config.max_page_size,
            default_page_size: 20,
        };
        Self {
            transport,
            works_url: config.works_url(),
            config,
            protocol,
        }
    }

    /// Parse a CrossRef work item
    fn parse_item(item: &CrossRefItem, current_year: i32) -> Article {
        let doi = item.doi.as_deref().map(bare_doi).unwrap_or_default();
        let doi_url = if doi.is_empty() {
            String::new()
        } else {
            format!("https://doi.org/{}", doi)
        };

        let title = item
            .title
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let year = [
            &item.published_print,
            &item.published_online,
            &item.published,
        ]
        .into_iter()
        .find_map(|date| date.as_ref().and_then(CrossRefDate::year))
        .unwrap_or(0);

        let url = item
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| doi_url.clone());

        let abstract_text = item
            .r#abstract
            .as_ref()
            .map(abstract_markup)
            .map(|markup| strip_markup(&markup))
            .unwrap_or_default();

        let authors = item.author.iter().map(Self::parse_author).collect();

        ArticleBuilder::new(doi_url, title)
            .doi(&doi)
            .authors(authors)
            .year(year)
            .journal(
                item.container_title.first().cloned().unwrap_or_default(),
                item.short_container_title
                    .first()
                    .cloned()
                    .unwrap_or_default(),
            )
            .publisher(item.publisher.clone().unwrap_or_default())
            .citations(item.is_referenced_by_count.unwrap_or(0))
            .volume_issue(item.volume.clone(), item.issue.clone())
            .url(url)
            .abstract_text(abstract_text)
            .build(current_year)
    }

    fn parse_author(author: &CrossRefAuthor) -> Author {
        let (name, surname) = match (&author.given, &author.family) {
            (None, None) => split_display_name(author.name.as_deref().unwrap_or_default()),
            (given, family) => (
                given.clone().unwrap_or_default(),
                family.clone().unwrap_or_default(),
            ),
        };

        let first = author.affiliation.first();
        let ror_id = first.and_then(|a| {
            a.id.iter()
                .find(|id| {
                    id.id_type
                        .as_deref()
                        .is_some_and(|t| t.eq_ignore_ascii_case("ror"))
                })
                .and_then(|id| id.id.clone())
        });

        Author::new(name.trim(), surname.trim())
            .affiliation(first.and_then(|a| a.name.clone()))
            .country(first.and_then(|a| a.country.clone()))
            .ror_id(ror_id)
    }
}

/// Abstracts arrive either as a JATS string or wrapped as `{ "jats": ... }`
fn abstract_markup(value: &Value) -> String {
    match value {
        Value::String(markup) => markup.clone(),
        Value::Object(map) => map
            .get("jats")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl SourceAdapter for CrossrefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn field_mapping(&self) -> &FieldMapping {
        &CROSSREF_FIELDS
    }

    fn translate(&self, request: &SearchRequest) -> NativeParams {
        let mut params = NativeParams::new();
        let mut fragments: Vec<String> = Vec::new();
        let mut filters: Vec<String> = Vec::new();

        let query = request.query.trim();
        if !query.is_empty() {
            fragments.push(query.to_string());
        }

        for (key, value) in request.filters.present() {
            match self.field_mapping().get(key) {
                Some(NativeTerm::QueryField(prefix)) => {
                    fragments.extend(quoted_fragments(Some(prefix), &value))
                }
                Some(NativeTerm::QueryPhrase) => fragments.extend(quoted_fragments(None, &value)),
                Some(NativeTerm::Filter(native_key)) => {
                    filters.extend(repeated_clauses(native_key, &value))
                }
                None => tracing::trace!("crossref: no mapping for {}", key),
            }
        }

        if !fragments.is_empty() {
            params.set("query", fragments.join(" "));
        }
        if !filters.is_empty() {
            params.set("filter", filters.join(","));
        }

        let rows = (request.page_size as usize).min(self.config.max_page_size);
        params.set("rows", rows);
        params.set("offset", request.page.saturating_sub(1) as usize * rows);
        params.set("sort", "relevance");
        params.set("order", "desc");

        if let Some(mailto) = &self.config.mailto {
            params.set("mailto", mailto);
        }

        params
    }

    async fn fetch(&self, params: NativeParams, max_results: usize) -> Vec<RawRecord> {
        PaginatedFetcher::new(
            self.transport.as_ref(),
            &self.works_url,
            &self.protocol,
            self.config.timeout(),
            self.id(),
        )
        .fetch(params, max_results)
        .await
    }

    fn normalize(&self, record: &RawRecord) -> Article {
        let item = CrossRefItem::deserialize(record).unwrap_or_else(|e| {
            tracing::warn!("crossref: unreadable work item, using defaults: {}", e);
            CrossRefItem::default()
        });
        Self::parse_item(&item, current_year())
    }
}

// ===== CrossRef API Types =====
//
// Every field goes through `lenient`: a null or mistyped value defaults that
// field alone.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossRefItem {
    #[serde(rename = "DOI", deserialize_with = "lenient")]
    doi: Option<String>,
    #[serde(deserialize_with = "lenient")]
    title: Vec<String>,
    #[serde(rename = "container-title", deserialize_with = "lenient")]
    container_title: Vec<String>,
    #[serde(rename = "short-container-title", deserialize_with = "lenient")]
    short_container_title: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    publisher: Option<String>,
    #[serde(rename = "is-referenced-by-count", deserialize_with = "lenient")]
    is_referenced_by_count: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    author: Vec<CrossRefAuthor>,
    #[serde(rename = "published-print", deserialize_with = "lenient")]
    published_print: Option<CrossRefDate>,
    #[serde(rename = "published-online", deserialize_with = "lenient")]
    published_online: Option<CrossRefDate>,
    #[serde(deserialize_with = "lenient")]
    published: Option<CrossRefDate>,
    #[serde(deserialize_with = "lenient")]
    volume: Option<String>,
    #[serde(deserialize_with = "lenient")]
    issue: Option<String>,
    #[serde(rename = "URL", deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    r#abstract: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossRefAuthor {
    #[serde(deserialize_with = "lenient")]
    given: Option<String>,
    #[serde(deserialize_with = "lenient")]
    family: Option<String>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    affiliation: Vec<CrossRefAffiliation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossRefAffiliation {
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    country: Option<String>,
    #[serde(deserialize_with = "lenient")]
    id: Vec<CrossRefAffiliationId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossRefAffiliationId {
    #[serde(deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(rename = "id-type", deserialize_with = "lenient")]
    id_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossRefDate {
    #[serde(rename = "date-parts", deserialize_with = "lenient")]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossRefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts
            .first()
            .and_then(|parts| parts.first().copied().flatten())
            .and_then(|year| i32::try_from(year).ok())
            .filter(|year| *year > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Filters, MultiValue};
    use crate::sources::mock::MockTransport;
    use serde_json::json;

    fn config() -> CrossrefConfig {
        CrossrefConfig {
            mailto: None,
            ..Default::default()
        }
    }

    fn source() -> CrossrefSource {
        CrossrefSource::with_transport(config(), Arc::new(MockTransport::new()))
    }

    fn sample_item() -> Value {
        json!({
            "DOI": "10.1038/nature12373",
            "title": ["Nanometre-scale thermometry", "in a living cell"],
            "container-title": ["Nature"],
            "short-container-title": ["Nature"],
            "publisher": "Springer Science and Business Media LLC",
            "is-referenced-by-count": 1200,
            "volume": "500",
            "issue": "7460",
            "URL": "http://dx.doi.org/10.1038/nature12373",
            "published-print": { "date-parts": [[2013, 8]] },
            "published-online": { "date-parts": [[2013, 7, 31]] },
            "abstract": "<jats:p>Sensitive probing of <jats:italic>temperature</jats:italic> &amp; heat</jats:p>",
            "author": [
                {
                    "given": "G.",
                    "family": "Kucsko",
                    "affiliation": [{
                        "name": "Harvard University",
                        "country": "us",
                        "id": [{ "id": "https://ror.org/03vek6s52", "id-type": "ROR" }]
                    }]
                },
                { "name": "Mikhail Lukin", "affiliation": [] }
            ]
        })
    }

    #[test]
    fn test_translate_query_fragments() {
        let filters = Filters {
            authors: Some("Smith, Doe".into()),
            journal_title: Some("Nature".into()),
            article_text: Some("quantum \"dots\"".into()),
            ..Default::default()
        };
        let params = source().translate(&SearchRequest::new(" graphene ").filters(filters));

        assert_eq!(
            params.get("query"),
            Some(
                "graphene author:\"Smith\" author:\"Doe\" \
                 container-title:\"Nature\" \"quantum dots\""
            )
        );
        assert!(!params.contains("filter"));
    }

    #[test]
    fn test_translate_dates_and_issn_go_to_filter() {
        let filters = Filters {
            issn: Some("0028-0836, 1476-4687".into()),
            year_from: Some(2020),
            year_to: Some(2023),
            ..Default::default()
        };
        let params = source().translate(&SearchRequest::new("q").filters(filters));

        assert_eq!(
            params.get("filter"),
            Some(
                "issn:0028-0836,issn:1476-4687,\
                 from-pub-date:2020-01-01,until-pub-date:2023-12-31"
            )
        );
    }

    #[test]
    fn test_translate_drops_unsupported_filters() {
        let filters = Filters {
            authors_count: Some(3),
            collaboration_countries: Some(MultiValue::List(vec!["RU".into(), "US".into()])),
            ..Default::default()
        };
        let params = source().translate(&SearchRequest::new("q").filters(filters));

        assert_eq!(params.get("query"), Some("q"));
        assert!(!params.contains("filter"));
        assert!(params.iter().all(|(_, v)| !v.contains("RU")));
    }

    #[test]
    fn test_translate_pagination_and_sort() {
        let params = source().translate(&SearchRequest::new("q").page(3).page_size(50));
        assert_eq!(params.get("rows"), Some("50"));
        assert_eq!(params.get("offset"), Some("100"));
        assert_eq!(params.get("sort"), Some("relevance"));
        assert_eq!(params.get("order"), Some("desc"));

        let params = source().translate(&SearchRequest::new("").page_size(20));
        assert!(!params.contains("query"));
        assert_eq!(params.get("offset"), Some("0"));
    }

    #[test]
    fn test_translate_rows_capped() {
        let config = CrossrefConfig {
            max_page_size: 100,
            mailto: Some("me@example.org".into()),
            ..Default::default()
        };
        let source = CrossrefSource::with_transport(config, Arc::new(MockTransport::new()));
        let params = source.translate(&SearchRequest::new("q").page(2).page_size(150));

        assert_eq!(params.get("rows"), Some("100"));
        assert_eq!(params.get("offset"), Some("100"));
        assert_eq!(params.get("mailto"), Some("me@example.org"));
    }

    #[test]
    fn test_normalize_item() {
        let article = source().normalize(&sample_item());

        assert_eq!(article.id, "https://doi.org/10.1038/nature12373");
        assert_eq!(article.doi, "10.1038/nature12373");
        assert_eq!(article.title, "Nanometre-scale thermometry in a living cell");
        assert_eq!(article.year, 2013);
        assert_eq!(article.journal_full, "Nature");
        assert_eq!(article.journal_abbreviation, "Nature");
        assert_eq!(article.citations, 1200);
        assert_eq!(article.volume.as_deref(), Some("500"));
        assert_eq!(article.issue.as_deref(), Some("7460"));
        assert_eq!(article.url, "http://dx.doi.org/10.1038/nature12373");
        assert_eq!(article.r#abstract, "Sensitive probing of temperature & heat");
        assert_eq!(article.authors_count, 2);

        let first = &article.authors[0];
        assert_eq!(first.name, "G.");
        assert_eq!(first.surname, "Kucsko");
        assert_eq!(first.affiliation.as_deref(), Some("Harvard University"));
        assert_eq!(first.country.as_deref(), Some("US"));
        assert_eq!(first.ror_id.as_deref(), Some("https://ror.org/03vek6s52"));

        let second = &article.authors[1];
        assert_eq!(second.name, "Mikhail");
        assert_eq!(second.surname, "Lukin");
        assert_eq!(second.affiliation, None);

        assert_eq!(article.countries.len(), 1);
        assert_eq!(article.countries[0].organizations, vec!["Harvard University"]);
    }

    #[test]
    fn test_normalize_empty_item() {
        let article = source().normalize(&json!({}));
        assert_eq!(article, Article::default());
    }

    #[test]
    fn test_normalize_mistyped_field_keeps_the_rest() {
        let item = json!({
            "DOI": "10.1/x",
            "title": ["Kept title"],
            "volume": 12,
            "author": [{ "given": "A", "family": "B" }]
        });
        let article = source().normalize(&item);

        assert_eq!(article.doi, "10.1/x");
        assert_eq!(article.title, "Kept title");
        assert_eq!(article.authors_count, 1);
        assert_eq!(article.authors[0].surname, "B");
        assert_eq!(article.volume, None);
    }

    #[test]
    fn test_normalize_mistyped_nested_fields() {
        let item = json!({
            "DOI": "10.1/y",
            "is-referenced-by-count": "lots",
            "published-print": { "date-parts": "2020" },
            "published-online": { "date-parts": [[2019]] },
            "author": [{
                "family": "Curie",
                "given": 7,
                "affiliation": [{ "name": "Sorbonne", "id": { "id": "x" } }]
            }]
        });
        let article = source().normalize(&item);

        assert_eq!(article.citations, 0);
        assert_eq!(article.year, 2019);
        assert_eq!(article.authors[0].surname, "Curie");
        assert_eq!(article.authors[0].affiliation.as_deref(), Some("Sorbonne"));
        assert_eq!(article.authors[0].ror_id, None);
    }

    #[test]
    fn test_year_fallbacks() {
        let online_only = json!({ "published-online": { "date-parts": [[2019, 2]] } });
        assert_eq!(source().normalize(&online_only).year, 2019);

        let null_print = json!({
            "published-print": { "date-parts": [[null]] },
            "published-online": { "date-parts": [[2021]] }
        });
        assert_eq!(source().normalize(&null_print).year, 2021);

        let none = json!({ "published-print": null, "title": null });
        assert_eq!(source().normalize(&none).year, 0);
    }

    #[test]
    fn test_abstract_object_form() {
        let item = json!({ "abstract": { "jats": "<p>Plain   text</p>" } });
        assert_eq!(source().normalize(&item).r#abstract, "Plain text");
    }

    #[test]
    fn test_missing_url_falls_back_to_doi() {
        let item = json!({ "DOI": "10.5555/abc" });
        let article = source().normalize(&item);
        assert_eq!(article.url, "https://doi.org/10.5555/abc");
    }

    #[tokio::test]
    async fn test_search_pages_by_offset() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({ "status": "ok", "message": { "items": [sample_item(), sample_item()] } }),
        );
        transport.push_json(200, json!({ "status": "ok", "message": { "items": [] } }));
        let source = CrossrefSource::with_transport(config(), transport.clone());

        let articles = source
            .search(&SearchRequest::new("thermometry").page_size(2).max_results(5))
            .await;

        assert_eq!(articles.len(), 2);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].url, "https://api.crossref.org/works");
        assert_eq!(calls[0].params.get("offset"), Some("0"));
        assert_eq!(calls[1].params.get("offset"), Some("2"));
    }
}
