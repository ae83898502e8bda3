//! Per-type schema cache.
//!
//! An explicit registry object owned by the serving context, not a process
//! global. Trees are built lazily on first access and immutable afterwards,
//! so concurrent readers never lock against each other for long. Racing
//! first callers may both build a tree; building is a pure function of the
//! descriptor, so both obtain an equivalent result and the first insert
//! wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::Error;
use crate::schema::builder::build_schema;
use crate::schema::descriptor::ModelDescriptor;
use crate::schema::property::Schema;

#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached schema for this descriptor's model name, building it on
    /// first access.
    ///
    /// # Errors
    ///
    /// Propagates `Error::Schema` from [`build_schema`]; a failed build is
    /// not cached.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn get_or_build(&self, descriptor: &ModelDescriptor) -> Result<Arc<Schema>, Error> {
        if let Some(schema) = self.schemas.read().unwrap().get(&descriptor.name) {
            return Ok(schema.clone());
        }

        let built = Arc::new(build_schema(descriptor)?);

        let mut schemas = self.schemas.write().unwrap();
        // First insert wins if another request built concurrently.
        Ok(schemas
            .entry(descriptor.name.clone())
            .or_insert(built)
            .clone())
    }

    /// The already-built schema for a model name, if present.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, model_name: &str) -> Option<Arc<Schema>> {
        self.schemas.read().unwrap().get(model_name).cloned()
    }
}
