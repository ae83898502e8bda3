//! Relational store on sea-orm.
//!
//! Executes compiled [`RelationalQuery`] statements against a
//! [`DatabaseConnection`] and issues writes as bound sea_query
//! insert/update/delete statements. Rows are materialized through
//! `JsonValue::find_by_statement`, then fixed up per schema: ARRAY and
//! OBJECT columns are stored as JSON text and re-parsed, BOOLEAN columns
//! come back as 0/1 on SQLite.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue, TransactionTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::filtering::{FilterSet, SearchQuery};
use crate::pagination::Page;
use crate::query::relational::sea_value;
use crate::query::{QueryCompiler, RelationalCompiler};
use crate::schema::{FieldType, Schema};
use crate::store::{CrudStore, from_record, id_display, identifier_value, to_record};
use crate::validation::validate_against_schema;

pub struct RelationalStore<T> {
    db: DatabaseConnection,
    schema: Arc<Schema>,
    table: String,
    compiler: RelationalCompiler,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RelationalStore<T> {
    #[must_use]
    pub fn new(db: DatabaseConnection, schema: Arc<Schema>, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            db,
            schema,
            compiler: RelationalCompiler::new(&table),
            table,
            _marker: PhantomData,
        }
    }

    fn insert_statement(
        &self,
        record: &Map<String, Value>,
    ) -> Result<sea_orm::sea_query::InsertStatement, Error> {
        let mut columns = Vec::new();
        let mut values: Vec<sea_orm::sea_query::SimpleExpr> = Vec::new();
        for property in &self.schema.properties {
            if let Some(value) = record.get(&property.name) {
                columns.push(Alias::new(&property.name));
                values.push(sea_value(value).into());
            }
        }
        let mut statement = Query::insert();
        statement
            .into_table(Alias::new(&self.table))
            .columns(columns);
        statement.values(values).map_err(Error::storage)?;
        Ok(statement.to_owned())
    }

    /// Re-parse JSON-text columns and normalize 0/1 booleans after a raw
    /// row fetch.
    fn materialize(&self, mut record: Map<String, Value>) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        for property in &self.schema.properties {
            let Some(value) = record.get_mut(&property.name) else {
                continue;
            };
            match property.field_type {
                FieldType::Array | FieldType::Object => {
                    if let Value::String(text) = value {
                        *value = serde_json::from_str(text).map_err(Error::storage)?;
                    }
                }
                FieldType::Boolean => {
                    if let Some(number) = value.as_i64() {
                        *value = Value::Bool(number != 0);
                    }
                }
                _ => {}
            }
        }
        from_record(record)
    }

    async fn fetch_count(&self, statement: &sea_orm::sea_query::SelectStatement) -> Result<u64, Error> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(backend.build(statement))
            .await?
            .ok_or_else(|| Error::storage("count query returned no row"))?;
        let count: i64 = row.try_get("", "count").map_err(Error::storage)?;
        u64::try_from(count).map_err(Error::storage)
    }

    fn id_condition(&self, id: &Value) -> sea_orm::sea_query::SimpleExpr {
        Expr::col(Alias::new(&self.schema.id_property)).eq(sea_value(id))
    }
}

#[async_trait]
impl<T> CrudStore<T> for RelationalStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn create(&self, item: &T) -> Result<(), Error> {
        let record = to_record(item)?;
        identifier_value(&record, &self.schema)?;
        validate_against_schema(&self.schema, &Value::Object(record.clone()))?;

        let statement = self.insert_statement(&record)?;
        let backend = self.db.get_database_backend();
        self.db.execute(backend.build(&statement)).await?;
        Ok(())
    }

    async fn create_batch(&self, items: &[T]) -> Result<(), Error> {
        let mut statements = Vec::with_capacity(items.len());
        for item in items {
            let record = to_record(item)?;
            identifier_value(&record, &self.schema)?;
            validate_against_schema(&self.schema, &Value::Object(record.clone()))?;
            statements.push(self.insert_statement(&record)?);
        }

        // One transaction: a failing insert rolls back the whole batch.
        let txn = self.db.begin().await?;
        let backend = self.db.get_database_backend();
        for statement in &statements {
            txn.execute(backend.build(statement)).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &Value) -> Result<Option<T>, Error> {
        let statement = Query::select()
            .column(Asterisk)
            .from(Alias::new(&self.table))
            .and_where(self.id_condition(id))
            .limit(1)
            .take();
        let backend = self.db.get_database_backend();
        let row = JsonValue::find_by_statement(backend.build(&statement))
            .one(&self.db)
            .await?;
        match row {
            Some(Value::Object(record)) => self.materialize(record).map(Some),
            Some(_) => Err(Error::storage("row did not materialize as an object")),
            None => Ok(None),
        }
    }

    async fn update(&self, item: &T) -> Result<(), Error> {
        let record = to_record(item)?;
        let id = identifier_value(&record, &self.schema)?;
        validate_against_schema(&self.schema, &Value::Object(record.clone()))?;

        let mut statement = Query::update();
        statement.table(Alias::new(&self.table));
        for property in &self.schema.properties {
            if property.name == self.schema.id_property {
                continue;
            }
            if let Some(value) = record.get(&property.name) {
                statement.value(Alias::new(&property.name), sea_value(value));
            }
        }
        statement.and_where(self.id_condition(&id));

        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&statement.to_owned())).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(&self.schema.name, Some(id_display(&id))));
        }
        Ok(())
    }

    async fn delete(&self, id: &Value) -> Result<(), Error> {
        let statement = Query::delete()
            .from_table(Alias::new(&self.table))
            .and_where(self.id_condition(id))
            .to_owned();
        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(&statement)).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(&self.schema.name, Some(id_display(id))));
        }
        Ok(())
    }

    async fn search(&self, filters: &FilterSet, query: &SearchQuery) -> Result<Page<T>, Error> {
        let compiled = self.compiler.compile(filters, query, &self.schema)?;
        let backend = self.db.get_database_backend();

        let total = self.fetch_count(&compiled.count).await?;
        let rows = JsonValue::find_by_statement(backend.build(&compiled.select))
            .all(&self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(record) = row else {
                return Err(Error::storage("row did not materialize as an object"));
            };
            items.push(self.materialize(record)?);
        }

        Page::new(items, query.page_number, query.page_size, total)
    }

    async fn count(&self, filters: &FilterSet) -> Result<u64, Error> {
        let statement = self.compiler.compile_count(filters, None, &self.schema)?;
        self.fetch_count(&statement).await
    }
}
