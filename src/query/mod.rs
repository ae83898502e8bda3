//! # Query Compilation
//!
//! Per-backend compilers turning a [`FilterSet`] plus free-text search into
//! a backend-native query with bound parameters. Values are never
//! interpolated into the query body. The backend is selected at
//! configuration time by constructing the matching compiler/store pair; both
//! implement the same [`QueryCompiler`] contract.

pub mod document;
pub mod relational;

pub use document::{DocumentCompiler, DocumentQuery, Selector};
pub use relational::{RelationalCompiler, RelationalQuery};

use crate::errors::Error;
use crate::filtering::{FilterSet, SearchQuery, TextSearch};
use crate::schema::Schema;

/// Compilation contract implemented once per storage backend.
pub trait QueryCompiler {
    /// Backend-native query for a search call, sort applied.
    type Query;
    /// Backend-native query for a count call.
    type Count;

    /// Compile filters plus optional free text into a search query.
    ///
    /// # Errors
    ///
    /// `Error::UnknownField` when a filter or sort references a field absent
    /// from the schema, `Error::UnsupportedFilter` when an operator does not
    /// apply to its field's type.
    fn compile(
        &self,
        filters: &FilterSet,
        query: &SearchQuery,
        schema: &Schema,
    ) -> Result<Self::Query, Error>;

    /// Compile filters plus optional free text into a count query.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`QueryCompiler::compile`].
    fn compile_count(
        &self,
        filters: &FilterSet,
        text: Option<&TextSearch>,
        schema: &Schema,
    ) -> Result<Self::Count, Error>;
}
