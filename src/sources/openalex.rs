//! OpenAlex search source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::OpenAlexConfig;
use crate::models::{bare_doi, Article, ArticleBuilder, Author, SearchRequest};
use crate::sources::mapping::{or_clause, FieldMapping, NativeTerm, OPENALEX_FIELDS};
use crate::sources::pagination::{CursorAdvance, PageProtocol, PaginatedFetcher};
use crate::sources::{lenient, NativeParams, RawRecord, SourceAdapter, SourceError};
use crate::utils::{
    current_year, rebuild_inverted_index, split_display_name, HttpClient, HttpTransport,
};

/// OpenAlex search source
///
/// Uses the OpenAlex `/works` endpoint. Filters go into a single `filter`
/// parameter of comma-joined `key:v1|v2` clauses; pagination uses a page
/// index.
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    transport: Arc<dyn HttpTransport>,
    config: OpenAlexConfig,
    works_url: String,
    protocol: PageProtocol,
}

impl OpenAlexSource {
    /// Create a new OpenAlex source with its own HTTP client
    pub fn new(config: OpenAlexConfig) -> Result<Self, SourceError> {
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
    pub fn with_transport(config: OpenAlexConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let protocol = PageProtocol {
            items_pointer: "/results",
            size_param: "per-page",
            cursor_param: "page",
            first_cursor: 1,
            advance: CursorAdvance::ByOne,
            max_page_size: config.max_page_size,
            default_page_size: 25,
        };
        Self {
            transport,
            works_url: config.works_url(),
            config,
            protocol,
        }
    }

    /// Parse OpenAlex work data
    fn parse_work(work: &OAWork, current_year: i32) -> Article {
        let doi = work.doi.as_deref().map(bare_doi).unwrap_or_default();
        let id = work.id.clone().unwrap_or_default();

        let title = work
            .title
            .clone()
            .or_else(|| work.display_name.clone())
            .unwrap_or_default();

        let location = work.primary_location.as_ref();
        let source = location.and_then(|l| l.source.as_ref());

        let url = location
            .and_then(|l| l.landing_page_url.clone())
            .or_else(|| (!doi.is_empty()).then(|| format!("https://doi.org/{}", doi)))
            .unwrap_or_else(|| id.clone());

        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .map(rebuild_inverted_index)
            .unwrap_or_default();

        let authors = work.authorships.iter().map(Self::parse_author).collect();

        ArticleBuilder::new(id, title)
            .doi(&doi)
            .authors(authors)
            .year(work.publication_year.unwrap_or(0))
            .journal(
                source.and_then(|s| s.display_name.clone()).unwrap_or_default(),
                source
                    .and_then(|s| s.abbreviated_title.clone())
                    .unwrap_or_default(),
            )
            .publisher(
                source
                    .and_then(|s| s.host_organization_name.clone())
                    .unwrap_or_default(),
            )
            .citations(work.cited_by_count.unwrap_or(0))
            .volume_issue(work.biblio.volume.clone(), work.biblio.issue.clone())
            .url(url)
            .abstract_text(abstract_text)
            .build(current_year)
    }

    /// Authors only carry a display name; affiliation data comes from the
    /// first institution, falling back to the raw affiliation strings.
    fn parse_author(authorship: &OAAuthorship) -> Author {
        let display_name = authorship
            .author
            .display_name
            .as_deref()
            .or(authorship.raw_author_name.as_deref())
            .unwrap_or_default();
        let (name, surname) = split_display_name(display_name);

        let institution = authorship.institutions.first();
        let affiliation = institution
            .and_then(|i| i.display_name.clone())
            .or_else(|| authorship.raw_affiliation_strings.first().cloned());
        let country = institution
            .and_then(|i| i.country_code.clone())
            .or_else(|| authorship.countries.first().cloned());
        let ror_id = institution.and_then(|i| i.ror.clone());

        Author::new(name, surname)
            .affiliation(affiliation)
            .country(country)
            .ror_id(ror_id)
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn field_mapping(&self) -> &FieldMapping {
        &OPENALEX_FIELDS
    }

    fn translate(&self, request: &SearchRequest) -> NativeParams {
        let mut params = NativeParams::new();

        let query = request.query.trim();
        if !query.is_empty() {
            params.set("search", query);
        }

        let clauses: Vec<String> = request
            .filters
            .present()
            .filter_map(|(key, value)| match self.field_mapping().get(key)? {
                NativeTerm::Filter(native_key) => or_clause(native_key, &value),
                _ => None,
            })
            .collect();
        if !clauses.is_empty() {
            params.set("filter", clauses.join(","));
        }

        params.set("page", request.page);
        params.set(
            "per-page",
            (request.page_size as usize).min(self.config.max_page_size),
        );

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
        let work = OAWork::deserialize(record).unwrap_or_else(|e| {
            tracing::warn!("openalex: unreadable work record, using defaults: {}", e);
            OAWork::default()
        });
        Self::parse_work(&work, current_year())
    }
}

// ===== OpenAlex API Types =====
//
// Every field goes through `lenient`: a null or mistyped value defaults that
// field alone.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OAWork {
    #[serde(deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    doi: Option<String>,
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    publication_year: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    cited_by_count: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    authorships: Vec<OAAuthorship>,
    #[serde(deserialize_with = "lenient")]
    primary_location: Option<OALocation>,
    #[serde(deserialize_with = "lenient")]
    biblio: OABiblio,
    #[serde(deserialize_with = "lenient")]
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OALocation {
    #[serde(deserialize_with = "lenient")]
    landing_page_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    source: Option<OASource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OASource {
    #[serde(deserialize_with = "lenient")]
    display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    abbreviated_title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    host_organization_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OABiblio {
    #[serde(deserialize_with = "lenient")]
    volume: Option<String>,
    #[serde(deserialize_with = "lenient")]
    issue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OAAuthorship {
    #[serde(deserialize_with = "lenient")]
    author: OAAuthor,
    #[serde(deserialize_with = "lenient")]
    raw_author_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    institutions: Vec<OAInstitution>,
    #[serde(deserialize_with = "lenient")]
    countries: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    raw_affiliation_strings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OAAuthor {
    #[serde(deserialize_with = "lenient")]
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OAInstitution {
    #[serde(deserialize_with = "lenient")]
    display_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    ror: Option<String>,
    #[serde(deserialize_with = "lenient")]
    country_code: Option<String>,
}
