//! In-memory document store.
//!
//! Reference implementation of the document backend: JSON documents in a
//! `RwLock<Vec<_>>`, each carrying a storage-native `_id` (uuid) alongside
//! the modeled identifier. Queries run by evaluating the compiled
//! [`Selector`](crate::query::Selector) against each document. Useful for
//! tests and as the executable definition of document-backend semantics.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::Error;
use crate::filtering::{FilterSet, SearchQuery, SortDirection};
use crate::pagination::Page;
use crate::query::document::{json_eq, json_order};
use crate::query::{DocumentCompiler, QueryCompiler};
use crate::schema::Schema;
use crate::store::{CrudStore, from_record, id_display, identifier_value, to_record};
use crate::validation::validate_against_schema;

/// Storage-native identifier field, distinct from the modeled identifier.
const NATIVE_ID: &str = "_id";

pub struct MemoryDocumentStore<T> {
    schema: Arc<Schema>,
    compiler: DocumentCompiler,
    documents: RwLock<Vec<Map<String, Value>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MemoryDocumentStore<T> {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            compiler: DocumentCompiler,
            documents: RwLock::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// A document matches when either its storage-native `_id` or its
    /// modeled identifier equals the given id.
    fn matches_id(&self, document: &Map<String, Value>, id: &Value) -> bool {
        if let (Some(native), Value::String(wanted)) = (document.get(NATIVE_ID), id)
            && native.as_str() == Some(wanted.as_str())
        {
            return true;
        }
        document
            .get(&self.schema.id_property)
            .is_some_and(|modeled| json_eq(modeled, id))
    }

    fn prepare(&self, item: &impl Serialize) -> Result<Map<String, Value>, Error> {
        let mut record = to_record(item)?;
        identifier_value(&record, &self.schema)?;
        validate_against_schema(&self.schema, &Value::Object(record.clone()))?;
        record.insert(
            NATIVE_ID.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        Ok(record)
    }
}

#[async_trait]
impl<T> CrudStore<T> for MemoryDocumentStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn create(&self, item: &T) -> Result<(), Error> {
        let record = self.prepare(item)?;
        let id = identifier_value(&record, &self.schema)?;
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if documents.iter().any(|existing| self.matches_id(existing, &id)) {
            return Err(Error::validation(vec![format!(
                "A {} with id '{}' already exists",
                self.schema.name,
                id_display(&id)
            )]));
        }
        documents.push(record);
        Ok(())
    }

    async fn create_batch(&self, items: &[T]) -> Result<(), Error> {
        // Validate every item before touching storage so a bad item leaves
        // the store untouched.
        let mut records = Vec::with_capacity(items.len());
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let record = self.prepare(item)?;
            ids.push(identifier_value(&record, &self.schema)?);
            records.push(record);
        }

        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (index, id) in ids.iter().enumerate() {
            let duplicated_in_batch = ids[..index].iter().any(|earlier| json_eq(earlier, id));
            let duplicated_in_store =
                documents.iter().any(|existing| self.matches_id(existing, id));
            if duplicated_in_batch || duplicated_in_store {
                return Err(Error::validation(vec![format!(
                    "A {} with id '{}' already exists",
                    self.schema.name,
                    id_display(id)
                )]));
            }
        }
        documents.extend(records);
        Ok(())
    }

    async fn get_by_id(&self, id: &Value) -> Result<Option<T>, Error> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(found) = documents.iter().find(|doc| self.matches_id(doc, id)) else {
            return Ok(None);
        };
        let mut record = found.clone();
        record.remove(NATIVE_ID);
        from_record(record).map(Some)
    }

    async fn update(&self, item: &T) -> Result<(), Error> {
        let mut record = to_record(item)?;
        let id = identifier_value(&record, &self.schema)?;
        validate_against_schema(&self.schema, &Value::Object(record.clone()))?;

        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(existing) = documents.iter_mut().find(|doc| self.matches_id(doc, &id)) else {
            return Err(Error::not_found(&self.schema.name, Some(id_display(&id))));
        };
        if let Some(native) = existing.get(NATIVE_ID).cloned() {
            record.insert(NATIVE_ID.to_string(), native);
        }
        *existing = record;
        Ok(())
    }

    async fn delete(&self, id: &Value) -> Result<(), Error> {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = documents.len();
        documents.retain(|doc| !self.matches_id(doc, id));
        if documents.len() == before {
            return Err(Error::not_found(&self.schema.name, Some(id_display(id))));
        }
        Ok(())
    }

    async fn search(&self, filters: &FilterSet, query: &SearchQuery) -> Result<Page<T>, Error> {
        let compiled = self.compiler.compile(filters, query, &self.schema)?;

        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut matched = Vec::new();
        for document in documents.iter() {
            if compiled.selector.matches(document)? {
                matched.push(document.clone());
            }
        }
        drop(documents);

        // Stable sort keeps insertion order for unordered value pairs.
        matched.sort_by(|left, right| {
            let l = left.get(&compiled.sort_by).unwrap_or(&Value::Null);
            let r = right.get(&compiled.sort_by).unwrap_or(&Value::Null);
            let ordering = json_order(l, r).unwrap_or(Ordering::Equal);
            match compiled.sort_order {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let mut items = Vec::new();
        for mut record in matched
            .into_iter()
            .skip(offset)
            .take(usize::try_from(query.page_size).unwrap_or(usize::MAX))
        {
            record.remove(NATIVE_ID);
            items.push(from_record(record)?);
        }

        Page::new(items, query.page_number, query.page_size, total)
    }

    async fn count(&self, filters: &FilterSet) -> Result<u64, Error> {
        let selector = self.compiler.compile_count(filters, None, &self.schema)?;
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut total = 0;
        for document in documents.iter() {
            if selector.matches(document)? {
                total += 1;
            }
        }
        Ok(total)
    }
}
