//! Payload validation against a built schema.
//!
//! Checks what the property constraints can express: required presence,
//! text length bounds, numeric bounds, date windows, enum membership.
//! Everything is collected into one `Error::Validation` so a caller sees
//! all problems at once.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::Error;
use crate::schema::{FieldType, Property, PropertyOptions, Schema};

/// Validate one payload against the schema's property constraints.
///
/// # Errors
///
/// `Error::Validation` with one message per violated constraint.
pub fn validate_against_schema(schema: &Schema, payload: &Value) -> Result<(), Error> {
    let Some(record) = payload.as_object() else {
        return Err(Error::validation(vec![format!(
            "Expected a {} object",
            schema.name
        )]));
    };

    let mut errors = Vec::new();
    for property in &schema.properties {
        let value = record.get(&property.name).unwrap_or(&Value::Null);
        check_property(property, value, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(errors))
    }
}

fn check_property(property: &Property, value: &Value, errors: &mut Vec<String>) {
    if value.is_null() {
        if property.required {
            errors.push(format!("'{}' is required", property.name));
        }
        return;
    }

    match &property.options {
        PropertyOptions::Text {
            minimum_length,
            maximum_length,
        } => check_text(property, value, *minimum_length, *maximum_length, errors),
        PropertyOptions::Number { minimum, maximum } => {
            check_number(property, value, *minimum, *maximum, errors);
        }
        PropertyOptions::Date { minimum, maximum } => {
            check_date(property, value, *minimum, *maximum, errors);
        }
        PropertyOptions::Enum { available_values } => {
            check_enum(property, value, available_values, errors);
        }
        PropertyOptions::Array { element, .. } => {
            let Some(elements) = value.as_array() else {
                errors.push(format!("'{}' must be an array", property.name));
                return;
            };
            if let Some(element_options) = element {
                // Element constraints reuse the property checks with a
                // synthetic single-element property.
                let element_property = Property {
                    options: (**element_options).clone(),
                    required: false,
                    ..property.clone()
                };
                for item in elements {
                    check_property(&element_property, item, errors);
                }
            }
        }
        PropertyOptions::Object(object) => {
            let Some(nested) = value.as_object() else {
                errors.push(format!("'{}' must be an object", property.name));
                return;
            };
            for nested_property in &object.properties {
                let nested_value = nested.get(&nested_property.name).unwrap_or(&Value::Null);
                check_property(nested_property, nested_value, errors);
            }
        }
        PropertyOptions::None | PropertyOptions::FileReference { .. } => {
            if property.field_type == FieldType::Boolean && !value.is_boolean() {
                errors.push(format!("'{}' must be a boolean", property.name));
            }
        }
    }
}

fn check_text(
    property: &Property,
    value: &Value,
    minimum: Option<u32>,
    maximum: Option<u32>,
    errors: &mut Vec<String>,
) {
    let Some(text) = value.as_str() else {
        errors.push(format!("'{}' must be a string", property.name));
        return;
    };
    let length = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    if let Some(min) = minimum
        && length < min
    {
        errors.push(format!(
            "'{}' must be at least {min} characters",
            property.name
        ));
    }
    if let Some(max) = maximum
        && length > max
    {
        errors.push(format!(
            "'{}' must be at most {max} characters",
            property.name
        ));
    }
}

fn check_number(
    property: &Property,
    value: &Value,
    minimum: Option<f64>,
    maximum: Option<f64>,
    errors: &mut Vec<String>,
) {
    let Some(number) = value.as_f64() else {
        errors.push(format!("'{}' must be a number", property.name));
        return;
    };
    if let Some(min) = minimum
        && number < min
    {
        errors.push(format!("'{}' must be at least {min}", property.name));
    }
    if let Some(max) = maximum
        && number > max
    {
        errors.push(format!("'{}' must be at most {max}", property.name));
    }
}

fn check_date(
    property: &Property,
    value: &Value,
    minimum: Option<DateTime<Utc>>,
    maximum: Option<DateTime<Utc>>,
    errors: &mut Vec<String>,
) {
    let parsed = value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|date| date.with_timezone(&Utc));
    let Some(date) = parsed else {
        errors.push(format!(
            "'{}' must be an RFC 3339 date string",
            property.name
        ));
        return;
    };
    if let Some(min) = minimum
        && date < min
    {
        errors.push(format!("'{}' must not be before {min}", property.name));
    }
    if let Some(max) = maximum
        && date > max
    {
        errors.push(format!("'{}' must not be after {max}", property.name));
    }
}

fn check_enum(property: &Property, value: &Value, available: &[String], errors: &mut Vec<String>) {
    let Some(text) = value.as_str() else {
        errors.push(format!("'{}' must be a string", property.name));
        return;
    };
    if !available.iter().any(|candidate| candidate == text) {
        errors.push(format!(
            "'{}' must be one of: {}",
            property.name,
            available.join(", ")
        ));
    }
}
