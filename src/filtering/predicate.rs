//! Backend-agnostic filter predicates.
//!
//! HTTP query pairs of the form `<fieldName>_<operatorName>=<value>` map 1:1
//! to [`FilterPredicate`] entries; the predicates of a [`FilterSet`] combine
//! with logical AND and an empty set means "no filtering". Values stay
//! opaque (`serde_json::Value`) until a backend compiler binds them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Error;
use crate::schema::property::{FieldType, Property, PropertyOptions, Schema};

/// Comparison operator of one filter predicate.
///
/// Wire names are the lowerCamel forms used in query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    IsNull,
    NotNull,
    Contains,
    StartsWith,
    GreaterThan,
    GreaterThanOrEquals,
    LesserThan,
    LesserThanOrEquals,
}

impl FilterOperator {
    /// The lowerCamel query-parameter suffix.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::IsNull => "isNull",
            Self::NotNull => "notNull",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEquals => "gte",
            Self::LesserThan => "lt",
            Self::LesserThanOrEquals => "lte",
        }
    }

    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "equals" => Some(Self::Equals),
            "notEquals" => Some(Self::NotEquals),
            "isNull" => Some(Self::IsNull),
            "notNull" => Some(Self::NotNull),
            "contains" => Some(Self::Contains),
            "startsWith" => Some(Self::StartsWith),
            "gt" => Some(Self::GreaterThan),
            "gte" => Some(Self::GreaterThanOrEquals),
            "lt" => Some(Self::LesserThan),
            "lte" => Some(Self::LesserThanOrEquals),
            _ => None,
        }
    }

    /// Whether this operator applies to fields of the given type.
    #[must_use]
    pub fn supports(self, field_type: FieldType) -> bool {
        match self {
            Self::Contains | Self::StartsWith => matches!(
                field_type,
                FieldType::Text | FieldType::Textarea | FieldType::Array
            ),
            Self::GreaterThan
            | Self::GreaterThanOrEquals
            | Self::LesserThan
            | Self::LesserThanOrEquals => field_type.is_orderable(),
            Self::Equals | Self::NotEquals | Self::IsNull | Self::NotNull => true,
        }
    }

    /// Whether the predicate's carried value participates in compilation.
    /// Existence tests ignore it.
    #[must_use]
    pub fn uses_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::NotNull)
    }
}

/// One `(field, operator, value)` constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl FilterPredicate {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// An unordered, AND-combined collection of predicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSet {
    predicates: Vec<FilterPredicate>,
}

impl FilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, predicate: FilterPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: FilterPredicate) {
        self.predicates.push(predicate);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterPredicate> {
        self.predicates.iter()
    }
}

impl FromIterator<FilterPredicate> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterPredicate>>(iter: I) -> Self {
        Self {
            predicates: iter.into_iter().collect(),
        }
    }
}

/// Query-parameter keys that are not filter pairs.
pub const RESERVED_KEYS: [&str; 5] = ["q", "sortBy", "sortOrder", "pageNumber", "pageSize"];

/// Parse `<field>_<operator>=<value>` query pairs into a [`FilterSet`],
/// validated against the schema.
///
/// Reserved list-endpoint keys (`q`, `sortBy`, `sortOrder`, `pageNumber`,
/// `pageSize`) are skipped. Values are coerced to the field's type so the
/// compilers receive typed predicates.
///
/// # Errors
///
/// `Error::UnknownField` when the pair does not match a visible property,
/// `Error::UnsupportedFilter` when the key carries no recognized operator
/// suffix, the operator does not apply to the field's type, or the value
/// cannot be coerced.
pub fn parse_filters(pairs: &[(String, String)], schema: &Schema) -> Result<FilterSet, Error> {
    let mut filters = FilterSet::new();

    for (key, raw_value) in pairs {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }

        let (field, operator) = split_filter_key(key)?;
        let property = match schema.find_property(field) {
            Some(property) if !property.hidden => property,
            _ => return Err(Error::unknown_field(field)),
        };

        if !operator.supports(property.field_type) {
            return Err(Error::unsupported_filter(format!(
                "Operator '{}' is not valid for field '{}' of type {:?}",
                operator.wire_name(),
                field,
                property.field_type
            )));
        }

        let value = if operator.uses_value() {
            coerce_value(raw_value, property)?
        } else {
            Value::Null
        };

        filters.push(FilterPredicate::new(field, operator, value));
    }

    Ok(filters)
}

fn split_filter_key(key: &str) -> Result<(&str, FilterOperator), Error> {
    let (field, suffix) = key.rsplit_once('_').ok_or_else(|| {
        Error::unsupported_filter(format!(
            "Filter parameter '{key}' has no operator suffix"
        ))
    })?;

    let operator = FilterOperator::from_wire(suffix).ok_or_else(|| {
        Error::unsupported_filter(format!(
            "Filter parameter '{key}' carries unknown operator '{suffix}'"
        ))
    })?;

    Ok((field, operator))
}

/// Coerce a raw query-parameter value to the field's type. Array fields
/// coerce by their element type.
fn coerce_value(raw: &str, property: &Property) -> Result<Value, Error> {
    let target = match (&property.field_type, &property.options) {
        (FieldType::Array, PropertyOptions::Array { element_type, .. }) => *element_type,
        (other, _) => *other,
    };

    match target {
        FieldType::Number => {
            if let Ok(int) = raw.parse::<i64>() {
                Ok(Value::from(int))
            } else if let Ok(float) = raw.parse::<f64>() {
                Ok(Value::from(float))
            } else {
                Err(Error::unsupported_filter(format!(
                    "Value '{raw}' for field '{}' is not a number",
                    property.name
                )))
            }
        }
        FieldType::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Error::unsupported_filter(format!(
                "Value '{raw}' for field '{}' is not a boolean",
                property.name
            ))),
        },
        FieldType::Date => {
            let parsed = chrono::DateTime::parse_from_rfc3339(raw).map_err(|_| {
                Error::unsupported_filter(format!(
                    "Value '{raw}' for field '{}' is not an RFC 3339 date",
                    property.name
                ))
            })?;
            // Normalized UTC form keeps lexicographic ordering valid.
            Ok(Value::String(
                parsed
                    .with_timezone(&chrono::Utc)
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_schema;
    use crate::schema::descriptor::{FieldDescriptor, FieldKind, ModelDescriptor};

    fn product_schema() -> Schema {
        let descriptor = ModelDescriptor::new("Product")
            .field(FieldDescriptor::new("id", FieldKind::Integer).identifier())
            .field(FieldDescriptor::new("shortDescription", FieldKind::Text).searchable())
            .field(FieldDescriptor::new("price", FieldKind::Float))
            .field(FieldDescriptor::new("released", FieldKind::Date))
            .field(FieldDescriptor::new("inStock", FieldKind::Bool))
            .field(FieldDescriptor::new("secret", FieldKind::Text).hidden())
            .field(FieldDescriptor::new(
                "tags",
                FieldKind::Array(Box::new(FieldKind::Text)),
            ));
        build_schema(&descriptor).unwrap()
    }

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_wire_names_round_trip() {
        for op in [
            FilterOperator::Equals,
            FilterOperator::NotEquals,
            FilterOperator::IsNull,
            FilterOperator::NotNull,
            FilterOperator::Contains,
            FilterOperator::StartsWith,
            FilterOperator::GreaterThan,
            FilterOperator::GreaterThanOrEquals,
            FilterOperator::LesserThan,
            FilterOperator::LesserThanOrEquals,
        ] {
            assert_eq!(FilterOperator::from_wire(op.wire_name()), Some(op));
        }
    }

    #[test]
    fn test_parse_single_filter() {
        let schema = product_schema();
        let filters =
            parse_filters(&pairs(&[("price_gte", "10")]), &schema).unwrap();
        assert_eq!(filters.len(), 1);
        let predicate = filters.iter().next().unwrap();
        assert_eq!(predicate.field, "price");
        assert_eq!(predicate.operator, FilterOperator::GreaterThanOrEquals);
        assert_eq!(predicate.value, Value::from(10));
    }

    #[test]
    fn test_reserved_keys_are_skipped() {
        let schema = product_schema();
        let filters = parse_filters(
            &pairs(&[
                ("q", "ryan"),
                ("pageNumber", "2"),
                ("pageSize", "10"),
                ("sortBy", "price"),
                ("sortOrder", "DESC"),
                ("price_equals", "10"),
            ]),
            &schema,
        )
        .unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let schema = product_schema();
        let err = parse_filters(&pairs(&[("nope_equals", "x")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_hidden_field_not_filterable() {
        let schema = product_schema();
        let err = parse_filters(&pairs(&[("secret_equals", "x")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_missing_operator_suffix_rejected() {
        let schema = product_schema();
        let err = parse_filters(&pairs(&[("price", "10")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_ordering_operator_on_text_rejected() {
        let schema = product_schema();
        let err =
            parse_filters(&pairs(&[("shortDescription_gt", "a")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_ordering_operators_accepted_on_number_and_date() {
        let schema = product_schema();
        for key in ["price_gt", "price_gte", "price_lt", "price_lte"] {
            assert!(parse_filters(&pairs(&[(key, "10")]), &schema).is_ok());
        }
        assert!(
            parse_filters(&pairs(&[("released_gt", "2024-01-01T00:00:00Z")]), &schema).is_ok()
        );
    }

    #[test]
    fn test_contains_valid_for_text_and_array_only() {
        let schema = product_schema();
        assert!(parse_filters(&pairs(&[("tags_contains", "Ryan")]), &schema).is_ok());
        assert!(
            parse_filters(&pairs(&[("shortDescription_contains", "Rya")]), &schema).is_ok()
        );
        let err = parse_filters(&pairs(&[("price_contains", "1")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_null_operators_ignore_value() {
        let schema = product_schema();
        let filters =
            parse_filters(&pairs(&[("shortDescription_isNull", "true")]), &schema).unwrap();
        assert_eq!(filters.iter().next().unwrap().value, Value::Null);
    }

    #[test]
    fn test_boolean_coercion() {
        let schema = product_schema();
        let filters = parse_filters(&pairs(&[("inStock_equals", "true")]), &schema).unwrap();
        assert_eq!(filters.iter().next().unwrap().value, Value::Bool(true));

        let err = parse_filters(&pairs(&[("inStock_equals", "yes")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_bad_number_rejected() {
        let schema = product_schema();
        let err = parse_filters(&pairs(&[("price_equals", "cheap")]), &schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter { .. }));
    }

    #[test]
    fn test_date_normalized_to_utc() {
        let schema = product_schema();
        let filters = parse_filters(
            &pairs(&[("released_gte", "2024-06-01T12:00:00+02:00")]),
            &schema,
        )
        .unwrap();
        assert_eq!(
            filters.iter().next().unwrap().value,
            Value::String("2024-06-01T10:00:00Z".to_string())
        );
    }

    #[test]
    fn test_empty_pairs_mean_no_filtering() {
        let schema = product_schema();
        let filters = parse_filters(&[], &schema).unwrap();
        assert!(filters.is_empty());
    }
}
