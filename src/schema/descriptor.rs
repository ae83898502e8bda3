//! Declarative model descriptors.
//!
//! A model is described by an explicit field table built at registration
//! time, not by reflecting over live values. Nested objects reference a
//! *provider function* rather than an owned descriptor so self-referential
//! type graphs stay finite; the builder bounds their expansion with explicit
//! depth counters.

use chrono::{DateTime, Utc};

/// Provider of a nested object's descriptor, invoked lazily by the builder.
pub type DescriptorFn = fn() -> ModelDescriptor;

/// Declared value kind of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Bool,
    Date,
    Uuid,
    Enumeration(Vec<String>),
    Object(DescriptorFn),
    Array(Box<FieldKind>),
    FileReference,
}

/// One declared field of a model, with its metadata.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub identifier: bool,
    pub required: bool,
    pub unique: bool,
    pub editable: bool,
    pub hidden: bool,
    pub featured: bool,
    pub searchable: bool,
    /// Explicit textarea directive; overrides text kind inference
    pub textarea: bool,
    pub minimum_length: Option<u32>,
    pub maximum_length: Option<u32>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum_date: Option<DateTime<Utc>>,
    pub maximum_date: Option<DateTime<Utc>>,
    pub allowed_mime_type: Option<String>,
    pub maximum_file_size: Option<u64>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            identifier: false,
            required: false,
            unique: false,
            editable: true,
            hidden: false,
            featured: false,
            searchable: false,
            textarea: false,
            minimum_length: None,
            maximum_length: None,
            minimum: None,
            maximum: None,
            minimum_date: None,
            maximum_date: None,
            allowed_mime_type: None,
            maximum_file_size: None,
        }
    }

    #[must_use]
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn uneditable(mut self) -> Self {
        self.editable = false;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    #[must_use]
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Render as a multi-line text area instead of a single-line input.
    #[must_use]
    pub fn textarea(mut self) -> Self {
        self.textarea = true;
        self
    }

    #[must_use]
    pub fn text_length(mut self, minimum: u32, maximum: u32) -> Self {
        self.minimum_length = Some(minimum);
        self.maximum_length = Some(maximum);
        self
    }

    #[must_use]
    pub fn number_bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    #[must_use]
    pub fn date_bounds(mut self, minimum: DateTime<Utc>, maximum: DateTime<Utc>) -> Self {
        self.minimum_date = Some(minimum);
        self.maximum_date = Some(maximum);
        self
    }

    #[must_use]
    pub fn file_constraints(mut self, mime_type: impl Into<String>, maximum_size: u64) -> Self {
        self.allowed_mime_type = Some(mime_type.into());
        self.maximum_file_size = Some(maximum_size);
        self
    }
}

/// The declarative field table of one modeled type.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub name: String,
    /// Whether this descriptor is registered as a CRUD model. Nested object
    /// types are described but not marked; only marked descriptors can be
    /// built into a top-level schema.
    pub marked: bool,
    pub default_sort: Option<(String, crate::filtering::sort::SortDirection)>,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    /// A descriptor marked as a CRUD model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marked: true,
            default_sort: None,
            fields: Vec::new(),
        }
    }

    /// A plain nested-object descriptor, not registerable as a model.
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            marked: false,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn default_sort(
        mut self,
        field: impl Into<String>,
        direction: crate::filtering::sort::SortDirection,
    ) -> Self {
        self.default_sort = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}
