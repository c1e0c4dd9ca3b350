//! Utility modules supporting the search engine.
//!
//! - [`HttpClient`] / [`HttpTransport`]: the HTTP capability sources fetch through
//! - [`split_display_name`], [`strip_markup`], [`rebuild_inverted_index`]: text
//!   helpers for the normalizers
//! - [`country_name`]: ISO country code lookup
//! - [`validate_year`] and friends: request validation
//!
//! # HTTP transport
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lucky_search::sources::NativeParams;
//! use lucky_search::utils::{HttpClient, HttpTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let mut params = NativeParams::new();
//! params.set("search", "graphene");
//! let response = client
//!     .get_json("https://api.openalex.org/works", &params, Duration::from_secs(10))
//!     .await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```

mod countries;
mod http;
mod text;
mod validate;

pub use countries::country_name;
pub use http::{HttpClient, HttpTransport, JsonResponse};
pub use text::{rebuild_inverted_index, split_display_name, strip_markup};
pub use validate::{
    current_year, validate_countries, validate_page, validate_page_size, validate_year,
    validate_year_range, ValidationError, MAX_COLLABORATION_COUNTRIES, MAX_PAGE_SIZE, MIN_YEAR,
};
