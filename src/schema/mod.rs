//! Schema introspection: declarative model descriptors, the property tree
//! built from them, and the per-type cache.

pub mod builder;
pub mod descriptor;
pub mod property;
pub mod registry;

pub use builder::{MAX_ARRAY_RECURSION, MAX_OBJECT_RECURSION, build_schema};
pub use descriptor::{FieldDescriptor, FieldKind, ModelDescriptor};
pub use property::{FieldType, ObjectOptions, Property, PropertyOptions, Schema};
pub use registry::SchemaRegistry;
