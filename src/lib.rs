pub mod errors;
pub mod filtering;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod store;
pub mod validation;

pub use errors::Error;
pub use filtering::{
    FilterOperator, FilterPredicate, FilterSet, ListParams, SearchQuery, SortDirection,
    TextSearch, parse_filters,
};
pub use pagination::Page;
pub use query::{DocumentCompiler, QueryCompiler, RelationalCompiler};
pub use schema::{
    FieldDescriptor, FieldKind, ModelDescriptor, Schema, SchemaRegistry, build_schema,
};
pub use store::{CrudStore, MemoryDocumentStore, RelationalStore};
pub use validation::validate_against_schema;
