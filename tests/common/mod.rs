//! Shared fixtures for the store integration tests.

use std::sync::{Arc, Once};

use crudkit::schema::descriptor::{FieldDescriptor, FieldKind, ModelDescriptor};
use crudkit::{CrudStore, Schema, build_schema};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub short_description: Option<String>,
    pub price: Option<f64>,
    pub tags: Vec<String>,
}

impl Product {
    pub fn new(id: i64, description: Option<&str>, price: Option<f64>, tags: &[&str]) -> Self {
        Self {
            id,
            short_description: description.map(str::to_string),
            price,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

static TRACING: Once = Once::new();

/// Capture the `tracing` output the stores emit on storage errors.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_test_writer()
            .compact()
            .init();
    });
}

pub fn product_schema() -> Arc<Schema> {
    let descriptor = ModelDescriptor::new("Product")
        .field(FieldDescriptor::new("id", FieldKind::Integer).identifier())
        .field(FieldDescriptor::new("shortDescription", FieldKind::Text).searchable())
        .field(FieldDescriptor::new("price", FieldKind::Float))
        .field(FieldDescriptor::new(
            "tags",
            FieldKind::Array(Box::new(FieldKind::Text)),
        ));
    Arc::new(build_schema(&descriptor).unwrap())
}

pub async fn setup_product_database() -> DatabaseConnection {
    init_tracing();
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    db.execute(sea_orm::Statement::from_string(
        db.get_database_backend(),
        r#"CREATE TABLE products (
            "id" INTEGER PRIMARY KEY NOT NULL,
            "shortDescription" TEXT,
            "price" REAL,
            "tags" TEXT NOT NULL
        );"#
        .to_owned(),
    ))
    .await
    .expect("Failed to create products table");
    db
}

/// The catalogue most filter scenarios run against.
pub async fn seed_catalogue(store: &impl CrudStore<Product>) {
    let items = vec![
        Product::new(1, Some("Ryan ice cream"), Some(10.0), &["Ryan", "Made", "This"]),
        Product::new(2, Some("NotRyan sorbet"), Some(20.0), &["Other"]),
        Product::new(3, None, Some(30.0), &["Made"]),
        Product::new(4, Some("Plain biscuit"), None, &[]),
    ];
    store.create_batch(&items).await.expect("Failed to seed");
}
