//! Canonical article model shared by every source.

use serde::{Deserialize, Serialize};

use crate::utils::country_name;

/// One author of an article.
///
/// `name` holds the given name(s) and `surname` the family name. Sources that
/// only expose a display name get a best-effort split (see
/// [`split_display_name`](crate::utils::split_display_name)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub surname: String,

    /// First affiliation reported for this author
    #[serde(default)]
    pub affiliation: Option<String>,

    /// ISO 3166-1 alpha-2 country code of the first affiliation
    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub ror_id: Option<String>,
}

impl Author {
    /// Create an author from already separated name parts
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            ..Default::default()
        }
    }

    /// Set the affiliation, ignoring blank values
    pub fn affiliation(mut self, affiliation: Option<impl Into<String>>) -> Self {
        self.affiliation = non_blank(affiliation);
        self
    }

    /// Set the country code, upper-cased, ignoring blank values
    pub fn country(mut self, country: Option<impl Into<String>>) -> Self {
        self.country = non_blank(country).map(|c| c.to_uppercase());
        self
    }

    /// Set the ROR identifier, ignoring blank values
    pub fn ror_id(mut self, ror_id: Option<impl Into<String>>) -> Self {
        self.ror_id = non_blank(ror_id);
        self
    }

    /// Full display name ("given surname")
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

fn non_blank(value: Option<impl Into<String>>) -> Option<String> {
    value
        .map(Into::into)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A country that appears in an article's author affiliations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryInfo {
    pub code: String,
    pub name: String,
    /// Affiliations attached to the first author seen with this country
    pub organizations: Vec<String>,
}

/// Collapse the authors' countries into a deduplicated list.
///
/// Order follows the first time a code is seen. Each entry keeps only the
/// affiliation of that first occurrence; later authors from the same country
/// do not add organizations.
pub fn countries_from_authors(authors: &[Author]) -> Vec<CountryInfo> {
    let mut countries: Vec<CountryInfo> = Vec::new();

    for author in authors {
        let Some(code) = author.country.as_deref() else {
            continue;
        };
        if countries.iter().any(|c| c.code == code) {
            continue;
        }

        countries.push(CountryInfo {
            code: code.to_string(),
            name: country_name(code).unwrap_or(code).to_string(),
            organizations: author.affiliation.iter().cloned().collect(),
        });
    }

    countries
}

/// A research article in the canonical schema.
///
/// Every source normalizes into this shape; fields a source does not provide
/// stay at their defaults (empty string, zero, empty list, `None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    /// Source-specific identifier (OpenAlex work URL, DOI URL, ...)
    pub id: String,

    /// Bare DOI without resolver prefix
    pub doi: String,

    pub title: String,

    pub authors: Vec<Author>,

    /// Publication year, 0 when unknown
    pub year: i32,

    pub journal_full: String,

    pub journal_abbreviation: String,

    pub publisher: String,

    pub citations: u64,

    /// Citations per year since publication
    pub annual_citations: f64,

    pub volume: Option<String>,

    pub issue: Option<String>,

    pub authors_count: usize,

    pub countries: Vec<CountryInfo>,

    pub url: String,

    pub r#abstract: String,
}

/// Average citations per year, counting the publication year itself.
///
/// Returns 0.0 when the year is unknown. Rounded to two decimals.
pub fn annual_citations(citations: u64, year: i32, current_year: i32) -> f64 {
    if year <= 0 {
        return 0.0;
    }
    let years = (current_year - year + 1).max(1) as f64;
    (citations as f64 / years * 100.0).round() / 100.0
}

/// Strip a `https://doi.org/` style resolver prefix from a DOI.
pub fn bare_doi(doi: &str) -> String {
    let doi = doi.trim();
    let lower = doi.to_ascii_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"] {
        if lower.starts_with(prefix) {
            return doi[prefix.len()..].to_string();
        }
    }
    doi.to_string()
}

/// Builder for constructing Article objects
#[derive(Debug, Clone, Default)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    /// Create a new builder with the identifier and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            article: Article {
                id: id.into(),
                title: title.into(),
                ..Default::default()
            },
        }
    }

    /// Set DOI (resolver prefix is stripped)
    pub fn doi(mut self, doi: impl AsRef<str>) -> Self {
        self.article.doi = bare_doi(doi.as_ref());
        self
    }

    /// Set authors; also derives `authors_count` and `countries`
    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.article.authors_count = authors.len();
        self.article.countries = countries_from_authors(&authors);
        self.article.authors = authors;
        self
    }

    /// Set publication year
    pub fn year(mut self, year: i32) -> Self {
        self.article.year = year;
        self
    }

    /// Set journal full name and abbreviation
    pub fn journal(mut self, full: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        self.article.journal_full = full.into();
        self.article.journal_abbreviation = abbreviation.into();
        self
    }

    /// Set publisher
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.article.publisher = publisher.into();
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: u64) -> Self {
        self.article.citations = count;
        self
    }

    /// Set volume and issue, dropping blank values
    pub fn volume_issue(mut self, volume: Option<String>, issue: Option<String>) -> Self {
        self.article.volume = volume.filter(|v| !v.trim().is_empty());
        self.article.issue = issue.filter(|i| !i.trim().is_empty());
        self
    }

    /// Set landing page URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.article.url = url.into();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.article.r#abstract = abstract_text.into();
        self
    }

    /// Build the Article, computing annual citations against `current_year`
    pub fn build(mut self, current_year: i32) -> Article {
        self.article.annual_citations =
            annual_citations(self.article.citations, self.article.year, current_year);
        self.article
    }
}
