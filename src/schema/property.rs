//! Structural schema model: the property tree produced by introspecting a
//! model descriptor. One [`Schema`] per modeled type, built once and served
//! read-only to the admin UI and to the query compilers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::Error;
use crate::filtering::sort::SortDirection;

/// Structural kind of a property, as rendered by the admin UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Boolean,
    Enum,
    Object,
    Array,
    FileReference,
}

impl FieldType {
    /// Whether values of this type have a total order usable by the
    /// `gt`/`gte`/`lt`/`lte` filter operators.
    #[must_use]
    pub fn is_orderable(self) -> bool {
        matches!(self, Self::Number | Self::Date)
    }
}

/// Nested structure carried by `OBJECT` properties (and `ARRAY`-of-object
/// elements).
#[derive(Debug, Clone, Serialize)]
pub struct ObjectOptions {
    /// Name of the nested object type
    pub object_name: String,
    /// The nested object's featured property, if it declares one
    pub featured_property: Option<String>,
    /// Nested property tree, declaration order preserved
    pub properties: Vec<Property>,
}

impl ObjectOptions {
    /// Look up a nested property by name, ignoring hidden ones. Used by
    /// tests and UI consumers walking the tree.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name == name && !p.hidden)
    }
}

/// Type-specific constraint payload of a property.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyOptions {
    None,
    Text {
        minimum_length: Option<u32>,
        maximum_length: Option<u32>,
    },
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Date {
        minimum: Option<DateTime<Utc>>,
        maximum: Option<DateTime<Utc>>,
    },
    Enum {
        available_values: Vec<String>,
    },
    Object(ObjectOptions),
    Array {
        element_type: FieldType,
        /// Options of the element type; `Some(Object(..))` for arrays of
        /// modeled objects.
        element: Option<Box<PropertyOptions>>,
    },
    FileReference {
        allowed_mime_type: String,
        maximum_file_size: u64,
    },
}

impl PropertyOptions {
    /// The nested object carried by this options payload, whether the
    /// property is an `OBJECT` or an `ARRAY` of objects.
    #[must_use]
    pub fn nested_object(&self) -> Option<&ObjectOptions> {
        match self {
            Self::Object(object) => Some(object),
            Self::Array {
                element: Some(element),
                ..
            } => element.nested_object(),
            _ => None,
        }
    }
}

/// One structural field of a model's schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub editable: bool,
    /// Hidden properties stay in the tree but are excluded from
    /// lookup-by-name; see [`Schema::property`].
    pub hidden: bool,
    pub featured: bool,
    pub searchable: bool,
    pub options: PropertyOptions,
}

/// The built property tree of one modeled type.
///
/// Owned by the [`SchemaRegistry`](crate::schema::SchemaRegistry): built
/// once, cached, immutable afterwards, safe to share across request
/// handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Model name (e.g. "Product")
    pub name: String,
    /// Name of the identifier property
    pub id_property: String,
    /// The property used as display summary in UI contexts, if any
    pub featured_property: Option<String>,
    /// Model-level default sort, applied when a caller supplies none
    pub default_sort: Option<(String, SortDirection)>,
    /// Declaration order preserved
    pub properties: Vec<Property>,
}

impl Schema {
    /// Look up a visible property by name.
    ///
    /// A hidden property fails distinctly from an absent one: hidden lookups
    /// are a configuration error (`Error::Schema`), absent ones are
    /// `Error::UnknownField`.
    ///
    /// # Errors
    ///
    /// `Error::Schema` when the property exists but is hidden,
    /// `Error::UnknownField` when no property has that name.
    pub fn property(&self, name: &str) -> Result<&Property, Error> {
        match self.find_property(name) {
            Some(property) if property.hidden => Err(Error::schema(format!(
                "Property '{name}' is hidden and cannot be looked up"
            ))),
            Some(property) => Ok(property),
            None => Err(Error::unknown_field(name)),
        }
    }

    /// Look up a property by name, hidden ones included.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The identifier property.
    #[must_use]
    pub fn id(&self) -> &Property {
        // Invariant upheld by the builder: the id property always exists.
        self.properties
            .iter()
            .find(|p| p.name == self.id_property)
            .unwrap_or_else(|| unreachable!("schema built without id property"))
    }

    /// Fields targeted by structured free-text search: `Searchable`-marked
    /// properties plus unique and identifier properties.
    #[must_use]
    pub fn searchable_field_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|p| !p.hidden && (p.searchable || p.unique || p.name == self.id_property))
            .map(|p| p.name.as_str())
            .collect()
    }
}
