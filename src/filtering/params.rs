//! Wire-level list parameters and the per-request [`SearchQuery`] value
//! object they resolve into.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::errors::Error;
use crate::filtering::sort::SortDirection;

/// Free-text search input.
///
/// The choice between a pre-formed native query and a structured multi-field
/// search is explicit at the API boundary; compilers never sniff string
/// shape. HTTP `q=` maps to [`TextSearch::Structured`]; [`TextSearch::Raw`]
/// is only reachable programmatically by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSearch {
    /// Backend-native query, passed through verbatim.
    Raw(String),
    /// Compiled as an OR search across all searchable, unique and
    /// identifier fields of the schema.
    Structured(String),
}

/// Query parameters of a list endpoint.
///
/// Filtering uses additional `<fieldName>_<operatorName>=<value>` pairs
/// (e.g. `price_gte=10`, `tags_contains=Ryan`) parsed separately via
/// [`parse_filters`](crate::filtering::parse_filters); the keys declared
/// here are reserved.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Free-text search across all searchable fields.
    #[param(example = "search text")]
    pub q: Option<String>,
    /// Field to sort by; defaults to the model's configured sort, then the
    /// identifier.
    #[param(example = "price")]
    pub sort_by: Option<String>,
    /// ASC or DESC.
    #[param(example = "ASC")]
    pub sort_order: Option<SortDirection>,
    /// 1-based page number.
    #[param(example = 1)]
    pub page_number: Option<u64>,
    /// Items per page.
    #[param(example = 25)]
    pub page_size: Option<u64>,
}

/// Default page size when the caller supplies none.
pub const DEFAULT_PAGE_SIZE: u64 = 25;

impl ListParams {
    /// Resolve wire parameters into a [`SearchQuery`].
    #[must_use]
    pub fn into_search_query(self) -> SearchQuery {
        SearchQuery {
            text: self.q.map(TextSearch::Structured),
            sort_by: self.sort_by,
            sort_order: self.sort_order.unwrap_or_default(),
            page_number: self.page_number.unwrap_or(1),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

/// Per-request search/pagination value object. No shared mutable state;
/// constructed fresh per request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: Option<TextSearch>,
    pub sort_by: Option<String>,
    pub sort_order: SortDirection,
    pub page_number: u64,
    pub page_size: u64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            sort_by: None,
            sort_order: SortDirection::Asc,
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchQuery {
    /// # Errors
    ///
    /// `Error::InvalidPage` for a non-positive page number or size.
    pub fn validate(&self) -> Result<(), Error> {
        crate::pagination::validate_page(self.page_number, self.page_size)
    }

    /// Offset of the first item of the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        crate::pagination::offset(self.page_number, self.page_size)
    }
}
