//! # Schema Introspection
//!
//! Turns a [`ModelDescriptor`] into a [`Schema`] property tree. Field kinds
//! are inferred from the declared value kind unless an explicit directive
//! (textarea, enum values, file constraints) overrides them.
//!
//! Self-referential type graphs are bounded with explicit depth counters
//! keyed by the nested type's name, passed down the walk rather than relying
//! on unbounded call-stack recursion. Once a ceiling is reached the recursive
//! property is omitted from the deepest node's children, so looking it up by
//! name fails instead of looping forever.

use std::collections::HashMap;

use crate::errors::Error;
use crate::schema::descriptor::{FieldDescriptor, FieldKind, ModelDescriptor};
use crate::schema::property::{FieldType, ObjectOptions, Property, PropertyOptions, Schema};

/// Depth ceiling for self-referential `OBJECT` chains.
pub const MAX_OBJECT_RECURSION: usize = 8;

/// Depth ceiling for self-referential `ARRAY`-of-object chains.
pub const MAX_ARRAY_RECURSION: usize = 20;

/// Default maximum upload size for file references without an explicit
/// constraint (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Build the property tree of a marked model descriptor.
///
/// Builds are a pure function of the descriptor: idempotent and cacheable
/// (see [`SchemaRegistry`](crate::schema::SchemaRegistry)).
///
/// # Errors
///
/// `Error::Schema` when the descriptor is not marked as a model, has no
/// identifier field, the identifier's kind is not integer/text/uuid,
/// sibling names collide, more than one property is featured, or the
/// declared default sort references a missing field.
pub fn build_schema(descriptor: &ModelDescriptor) -> Result<Schema, Error> {
    if !descriptor.marked {
        return Err(Error::schema(format!(
            "Type '{}' is not marked as a model",
            descriptor.name
        )));
    }

    let mut depths = RecursionDepths::default();
    let properties = describe_fields(&descriptor.fields, &mut depths)?;

    let id_property = resolve_identifier(descriptor)?;
    let featured_property = resolve_featured(&descriptor.name, &properties)?;

    if let Some((field, _)) = &descriptor.default_sort
        && !properties.iter().any(|p| &p.name == field)
    {
        return Err(Error::schema(format!(
            "Default sort field '{field}' does not exist on model '{}'",
            descriptor.name
        )));
    }

    Ok(Schema {
        name: descriptor.name.clone(),
        id_property,
        featured_property,
        default_sort: descriptor.default_sort.clone(),
        properties,
    })
}

/// Per-type expansion counters, object and array chains tracked separately.
#[derive(Default)]
struct RecursionDepths {
    object: HashMap<String, usize>,
    array: HashMap<String, usize>,
}

fn describe_fields(
    fields: &[FieldDescriptor],
    depths: &mut RecursionDepths,
) -> Result<Vec<Property>, Error> {
    let mut properties = Vec::with_capacity(fields.len());

    for field in fields {
        if properties.iter().any(|p: &Property| p.name == field.name) {
            return Err(Error::schema(format!(
                "Duplicate property name '{}'",
                field.name
            )));
        }
        if let Some(property) = describe_field(field, depths)? {
            properties.push(property);
        }
    }

    Ok(properties)
}

/// Describe one field. Returns `None` when a recursive expansion hit its
/// ceiling and the property is omitted.
fn describe_field(
    field: &FieldDescriptor,
    depths: &mut RecursionDepths,
) -> Result<Option<Property>, Error> {
    let typed = match &field.kind {
        FieldKind::Text => Some(text_property(field)),
        FieldKind::Integer | FieldKind::Float => Some((
            FieldType::Number,
            PropertyOptions::Number {
                minimum: field.minimum,
                maximum: field.maximum,
            },
        )),
        FieldKind::Bool => Some((FieldType::Boolean, PropertyOptions::None)),
        FieldKind::Uuid => Some((FieldType::Text, PropertyOptions::None)),
        FieldKind::Date => Some((
            FieldType::Date,
            PropertyOptions::Date {
                minimum: field.minimum_date,
                maximum: field.maximum_date,
            },
        )),
        FieldKind::Enumeration(values) => Some((
            FieldType::Enum,
            PropertyOptions::Enum {
                available_values: values.clone(),
            },
        )),
        FieldKind::FileReference => Some((
            FieldType::FileReference,
            PropertyOptions::FileReference {
                allowed_mime_type: field
                    .allowed_mime_type
                    .clone()
                    .unwrap_or_else(|| "*/*".to_string()),
                maximum_file_size: field.maximum_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            },
        )),
        FieldKind::Object(provider) => expand_object(*provider, depths, false)?
            .map(|object| (FieldType::Object, PropertyOptions::Object(object))),
        FieldKind::Array(element) => match describe_array_element(field, element, depths)? {
            Some((element_type, element_options)) => Some((
                FieldType::Array,
                PropertyOptions::Array {
                    element_type,
                    element: element_options.map(Box::new),
                },
            )),
            None => None,
        },
    };

    Ok(typed.map(|(field_type, options)| Property {
        name: field.name.clone(),
        field_type,
        required: field.required,
        unique: field.unique,
        editable: field.editable,
        hidden: field.hidden,
        featured: field.featured,
        searchable: field.searchable,
        options,
    }))
}

fn text_property(field: &FieldDescriptor) -> (FieldType, PropertyOptions) {
    let field_type = if field.textarea {
        FieldType::Textarea
    } else {
        FieldType::Text
    };
    (
        field_type,
        PropertyOptions::Text {
            minimum_length: field.minimum_length,
            maximum_length: field.maximum_length,
        },
    )
}

fn describe_array_element(
    field: &FieldDescriptor,
    element: &FieldKind,
    depths: &mut RecursionDepths,
) -> Result<Option<(FieldType, Option<PropertyOptions>)>, Error> {
    match element {
        FieldKind::Text => Ok(Some((
            if field.textarea {
                FieldType::Textarea
            } else {
                FieldType::Text
            },
            None,
        ))),
        FieldKind::Integer | FieldKind::Float => Ok(Some((FieldType::Number, None))),
        FieldKind::Bool => Ok(Some((FieldType::Boolean, None))),
        FieldKind::Uuid => Ok(Some((FieldType::Text, None))),
        FieldKind::Date => Ok(Some((FieldType::Date, None))),
        FieldKind::Enumeration(values) => Ok(Some((
            FieldType::Enum,
            Some(PropertyOptions::Enum {
                available_values: values.clone(),
            }),
        ))),
        FieldKind::FileReference => Ok(Some((FieldType::FileReference, None))),
        FieldKind::Object(provider) => Ok(expand_object(*provider, depths, true)?
            .map(|object| (FieldType::Object, Some(PropertyOptions::Object(object))))),
        FieldKind::Array(_) => Err(Error::schema(format!(
            "Property '{}': arrays of arrays are not supported",
            field.name
        ))),
    }
}

/// Expand a nested object type, bounded per type name. Returns `None` once
/// the matching ceiling is reached.
fn expand_object(
    provider: fn() -> ModelDescriptor,
    depths: &mut RecursionDepths,
    via_array: bool,
) -> Result<Option<ObjectOptions>, Error> {
    let nested = provider();

    let (counter, ceiling) = if via_array {
        (&mut depths.array, MAX_ARRAY_RECURSION)
    } else {
        (&mut depths.object, MAX_OBJECT_RECURSION)
    };

    let depth = counter.get(&nested.name).copied().unwrap_or(0);
    if depth >= ceiling {
        return Ok(None);
    }
    counter.insert(nested.name.clone(), depth + 1);

    let properties = describe_fields(&nested.fields, depths)?;
    let featured_property = resolve_featured(&nested.name, &properties)?;

    let counter = if via_array {
        &mut depths.array
    } else {
        &mut depths.object
    };
    counter.insert(nested.name.clone(), depth);

    Ok(Some(ObjectOptions {
        object_name: nested.name,
        featured_property,
        properties,
    }))
}

fn resolve_identifier(descriptor: &ModelDescriptor) -> Result<String, Error> {
    let flagged: Vec<&FieldDescriptor> = descriptor
        .fields
        .iter()
        .filter(|f| f.identifier)
        .collect();

    let id_field = match flagged.as_slice() {
        [] => descriptor
            .fields
            .iter()
            .find(|f| f.name == "id")
            .ok_or_else(|| {
                Error::schema(format!(
                    "Model '{}' has no identifier field",
                    descriptor.name
                ))
            })?,
        [single] => single,
        _ => {
            return Err(Error::schema(format!(
                "Model '{}' declares more than one identifier field",
                descriptor.name
            )));
        }
    };

    match id_field.kind {
        FieldKind::Integer | FieldKind::Text | FieldKind::Uuid => Ok(id_field.name.clone()),
        _ => Err(Error::schema(format!(
            "Identifier '{}' of model '{}' must be an integer, text or uuid field",
            id_field.name, descriptor.name
        ))),
    }
}

fn resolve_featured(model_name: &str, properties: &[Property]) -> Result<Option<String>, Error> {
    let mut featured = properties.iter().filter(|p| p.featured);
    let first = featured.next().map(|p| p.name.clone());
    if featured.next().is_some() {
        return Err(Error::schema(format!(
            "Model '{model_name}' declares more than one featured property"
        )));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::sort::SortDirection;
    use chrono::TimeZone;

    fn resource_descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Resource")
            .field(FieldDescriptor::new("id", FieldKind::Integer).identifier())
            .field(FieldDescriptor::new("hidden", FieldKind::Text).hidden())
            .field(
                FieldDescriptor::new("shortDescription", FieldKind::Text)
                    .searchable()
                    .featured(),
            )
            .field(
                FieldDescriptor::new("longDescription", FieldKind::Text)
                    .textarea()
                    .text_length(10, 50),
            )
            .field(FieldDescriptor::new(
                "textType",
                FieldKind::Enumeration(vec!["HTML".to_string(), "MARKDOWN".to_string()]),
            ))
            .field(FieldDescriptor::new("price", FieldKind::Float).number_bounds(10.0, 50.0))
            .field(FieldDescriptor::new("unique", FieldKind::Text).unique())
            .field(
                FieldDescriptor::new("fileReference", FieldKind::FileReference)
                    .file_constraints("image/png", 2048),
            )
            .field(FieldDescriptor::new("required", FieldKind::Text).required())
            .field(FieldDescriptor::new("nonEditable", FieldKind::Text).uneditable())
            .field(FieldDescriptor::new(
                "date",
                FieldKind::Date,
            ))
            .field(FieldDescriptor::new(
                "tags",
                FieldKind::Array(Box::new(FieldKind::Text)),
            ))
    }

    fn strong_recursive_model() -> ModelDescriptor {
        ModelDescriptor::object("StrongRecursiveModel")
            .field(FieldDescriptor::new("name", FieldKind::Text))
            .field(FieldDescriptor::new(
                "recursiveObject",
                FieldKind::Object(strong_recursive_model),
            ))
    }

    fn menu_item() -> ModelDescriptor {
        ModelDescriptor::object("MenuItem")
            .field(FieldDescriptor::new("label", FieldKind::Text))
            .field(FieldDescriptor::new(
                "children",
                FieldKind::Array(Box::new(FieldKind::Object(menu_item))),
            ))
    }

    fn navigation_menu() -> ModelDescriptor {
        ModelDescriptor::new("NavigationMenu")
            .field(FieldDescriptor::new("id", FieldKind::Integer).identifier())
            .field(FieldDescriptor::new(
                "menuItems",
                FieldKind::Array(Box::new(FieldKind::Object(menu_item))),
            ))
    }

    /// Descend into the nested object tree behind `name`, as the admin UI
    /// does when rendering nested forms.
    fn go_deeper<'a>(properties: &'a [Property], name: &str) -> Option<&'a [Property]> {
        properties
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.options.nested_object())
            .map(|object| object.properties.as_slice())
    }

    // ========================================================================
    // Property tree shape
    // ========================================================================

    #[test]
    fn test_property_count_and_declaration_order() {
        let descriptor = resource_descriptor();
        let schema = build_schema(&descriptor).unwrap();

        // Hidden fields stay in the tree
        assert_eq!(schema.properties.len(), descriptor.fields.len());
        assert_eq!(schema.properties[0].name, "id");
        assert_eq!(schema.properties.last().unwrap().name, "tags");
    }

    #[test]
    fn test_hidden_lookup_fails_distinctly() {
        let schema = build_schema(&resource_descriptor()).unwrap();

        let hidden = schema.property("hidden").unwrap_err();
        assert!(matches!(hidden, Error::Schema { .. }));
        assert!(hidden.user_message().contains("hidden"));

        let absent = schema.property("nope").unwrap_err();
        assert!(matches!(absent, Error::UnknownField { .. }));
    }

    #[test]
    fn test_textarea_directive_overrides_inference() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        let property = schema.property("longDescription").unwrap();
        assert_eq!(property.field_type, FieldType::Textarea);
        assert!(matches!(
            property.options,
            PropertyOptions::Text {
                minimum_length: Some(10),
                maximum_length: Some(50),
            }
        ));
    }

    #[test]
    fn test_number_bounds() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        let property = schema.property("price").unwrap();
        assert_eq!(property.field_type, FieldType::Number);
        match property.options {
            PropertyOptions::Number { minimum, maximum } => {
                assert_eq!(minimum, Some(10.0));
                assert_eq!(maximum, Some(50.0));
            }
            _ => panic!("expected number options"),
        }
    }

    #[test]
    fn test_enum_values() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        let property = schema.property("textType").unwrap();
        assert_eq!(property.field_type, FieldType::Enum);
        match &property.options {
            PropertyOptions::Enum { available_values } => {
                assert!(available_values.contains(&"HTML".to_string()));
            }
            _ => panic!("expected enum options"),
        }
    }

    #[test]
    fn test_file_reference_constraints() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        let property = schema.property("fileReference").unwrap();
        assert_eq!(property.field_type, FieldType::FileReference);
        match &property.options {
            PropertyOptions::FileReference {
                allowed_mime_type,
                maximum_file_size,
            } => {
                assert_eq!(allowed_mime_type, "image/png");
                assert_eq!(*maximum_file_size, 2048);
            }
            _ => panic!("expected file reference options"),
        }
    }

    #[test]
    fn test_flags() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        assert!(schema.property("unique").unwrap().unique);
        assert!(schema.property("required").unwrap().required);
        assert!(!schema.property("nonEditable").unwrap().editable);
    }

    #[test]
    fn test_array_of_text() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        let property = schema.property("tags").unwrap();
        assert_eq!(property.field_type, FieldType::Array);
        match &property.options {
            PropertyOptions::Array { element_type, .. } => {
                assert_eq!(*element_type, FieldType::Text);
            }
            _ => panic!("expected array options"),
        }
    }

    #[test]
    fn test_id_and_featured_properties() {
        let schema = build_schema(&resource_descriptor()).unwrap();
        assert_eq!(schema.id_property, "id");
        assert_eq!(
            schema.featured_property.as_deref(),
            Some("shortDescription")
        );
    }

    #[test]
    fn test_date_bounds() {
        let min = chrono::Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let max = chrono::Utc.with_ymd_and_hms(2019, 12, 22, 0, 0, 0).unwrap();
        let descriptor = ModelDescriptor::new("Dated")
            .field(FieldDescriptor::new("id", FieldKind::Integer))
            .field(FieldDescriptor::new("date", FieldKind::Date).date_bounds(min, max));
        let schema = build_schema(&descriptor).unwrap();
        match schema.property("date").unwrap().options {
            PropertyOptions::Date { minimum, maximum } => {
                assert_eq!(minimum, Some(min));
                assert_eq!(maximum, Some(max));
            }
            _ => panic!("expected date options"),
        }
    }

    // ========================================================================
    // Failure modes
    // ========================================================================

    #[test]
    fn test_unmarked_descriptor_fails() {
        let descriptor = ModelDescriptor::object("NotAModel")
            .field(FieldDescriptor::new("id", FieldKind::Integer));
        let err = build_schema(&descriptor).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert!(err.user_message().contains("not marked"));
    }

    #[test]
    fn test_missing_identifier_fails() {
        let descriptor =
            ModelDescriptor::new("NoId").field(FieldDescriptor::new("name", FieldKind::Text));
        let err = build_schema(&descriptor).unwrap_err();
        assert!(err.user_message().contains("no identifier"));
    }

    #[test]
    fn test_unsupported_identifier_kind_fails() {
        let descriptor = ModelDescriptor::new("FloatId")
            .field(FieldDescriptor::new("id", FieldKind::Float).identifier());
        let err = build_schema(&descriptor).unwrap_err();
        assert!(err.user_message().contains("must be an integer"));
    }

    #[test]
    fn test_conventional_id_field_used_without_flag() {
        let descriptor = ModelDescriptor::new("Conventional")
            .field(FieldDescriptor::new("name", FieldKind::Text))
            .field(FieldDescriptor::new("id", FieldKind::Uuid));
        let schema = build_schema(&descriptor).unwrap();
        assert_eq!(schema.id_property, "id");
    }

    #[test]
    fn test_duplicate_sibling_names_fail() {
        let descriptor = ModelDescriptor::new("Dup")
            .field(FieldDescriptor::new("id", FieldKind::Integer))
            .field(FieldDescriptor::new("name", FieldKind::Text))
            .field(FieldDescriptor::new("name", FieldKind::Text));
        let err = build_schema(&descriptor).unwrap_err();
        assert!(err.user_message().contains("Duplicate"));
    }

    #[test]
    fn test_two_featured_properties_fail() {
        let descriptor = ModelDescriptor::new("TwoStars")
            .field(FieldDescriptor::new("id", FieldKind::Integer))
            .field(FieldDescriptor::new("a", FieldKind::Text).featured())
            .field(FieldDescriptor::new("b", FieldKind::Text).featured());
        let err = build_schema(&descriptor).unwrap_err();
        assert!(err.user_message().contains("featured"));
    }

    #[test]
    fn test_default_sort_must_reference_existing_field() {
        let descriptor = ModelDescriptor::new("BadSort")
            .default_sort("missing", SortDirection::Asc)
            .field(FieldDescriptor::new("id", FieldKind::Integer));
        let err = build_schema(&descriptor).unwrap_err();
        assert!(err.user_message().contains("Default sort"));
    }

    // ========================================================================
    // Recursion guards
    // ========================================================================

    #[test]
    fn test_strong_recursive_object_stops_at_ceiling() {
        let descriptor = ModelDescriptor::new("StrongRecursiveRoot")
            .field(FieldDescriptor::new("id", FieldKind::Integer))
            .field(FieldDescriptor::new(
                "recursiveObject",
                FieldKind::Object(strong_recursive_model),
            ));
        let schema = build_schema(&descriptor).unwrap();

        let mut current: &[Property] = &schema.properties;
        for level in 0..MAX_OBJECT_RECURSION {
            current = go_deeper(current, "recursiveObject")
                .unwrap_or_else(|| panic!("recursion cut off early at level {level}"));
        }

        // Beyond the ceiling the recursive property is simply absent.
        assert!(go_deeper(current, "recursiveObject").is_none());
        assert!(current.iter().any(|p| p.name == "name"));
    }

    #[test]
    fn test_strong_recursive_array_stops_at_larger_ceiling() {
        let schema = build_schema(&navigation_menu()).unwrap();

        let mut current: &[Property] = &schema.properties;
        for level in 0..MAX_ARRAY_RECURSION {
            let name = if level == 0 { "menuItems" } else { "children" };
            current = go_deeper(current, name)
                .unwrap_or_else(|| panic!("recursion cut off early at level {level}"));
        }

        assert!(go_deeper(current, "children").is_none());
        assert!(current.iter().any(|p| p.name == "label"));
    }

    #[test]
    fn test_builds_are_idempotent() {
        let descriptor = navigation_menu();
        let first = build_schema(&descriptor).unwrap();
        let second = build_schema(&descriptor).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
