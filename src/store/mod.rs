//! Storage contract and backends.
//!
//! [`CrudStore`] is the backend-agnostic persistence contract: typed items
//! in and out, filters and search queries compiled by the matching
//! [`QueryCompiler`](crate::query::QueryCompiler) backend. Two
//! implementations ship here: an in-memory document store and a sea-orm
//! relational store.

pub mod memory;
pub mod relational;

pub use memory::MemoryDocumentStore;
pub use relational::RelationalStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::filtering::{FilterSet, SearchQuery};
use crate::pagination::Page;
use crate::schema::Schema;

/// Backend-agnostic CRUD persistence for one modeled type.
#[async_trait]
pub trait CrudStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Persist a new item. The identifier field must be present.
    async fn create(&self, item: &T) -> Result<(), Error>;

    /// Persist several items atomically: if any item is rejected, none are
    /// persisted.
    async fn create_batch(&self, items: &[T]) -> Result<(), Error>;

    /// Fetch by identifier. Matches the storage-native id or the modeled
    /// identifier field.
    async fn get_by_id(&self, id: &Value) -> Result<Option<T>, Error>;

    /// Replace the stored item with the same identifier.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no stored item has that identifier.
    async fn update(&self, item: &T) -> Result<(), Error>;

    /// Delete by identifier.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no stored item has that identifier.
    async fn delete(&self, id: &Value) -> Result<(), Error>;

    /// Filtered, sorted, paginated search.
    async fn search(&self, filters: &FilterSet, query: &SearchQuery) -> Result<Page<T>, Error>;

    /// Number of items matching the filters.
    async fn count(&self, filters: &FilterSet) -> Result<u64, Error>;
}

/// Serialize a typed item into its JSON record form.
pub(crate) fn to_record<T: Serialize>(item: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(item) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(Error::validation(vec![
            "Items must serialize to JSON objects".to_string(),
        ])),
        Err(err) => Err(Error::storage(err)),
    }
}

pub(crate) fn from_record<T: DeserializeOwned>(record: Map<String, Value>) -> Result<T, Error> {
    serde_json::from_value(Value::Object(record)).map_err(Error::storage)
}

/// The modeled identifier value of a record.
///
/// # Errors
///
/// `Error::Validation` when the identifier field is absent or null.
pub(crate) fn identifier_value(
    record: &Map<String, Value>,
    schema: &Schema,
) -> Result<Value, Error> {
    match record.get(&schema.id_property) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(Error::validation(vec![format!(
            "'{}' must be set",
            schema.id_property
        )])),
    }
}

/// Display form of an identifier for `NotFound` payloads.
pub(crate) fn id_display(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
