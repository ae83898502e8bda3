//! # Filtering & Search
//!
//! Backend-agnostic representation of list-endpoint input: typed filter
//! predicates parsed from `<field>_<operator>=<value>` query pairs, explicit
//! raw-vs-structured free-text search, and deterministic sort resolution.
//! The backend compilers in [`crate::query`] turn these into native queries.

pub mod params;
pub mod predicate;
pub mod sort;

pub use params::{DEFAULT_PAGE_SIZE, ListParams, SearchQuery, TextSearch};
pub use predicate::{FilterOperator, FilterPredicate, FilterSet, parse_filters};
pub use sort::{SortDirection, resolve_sort};
