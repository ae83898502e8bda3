//! Document-store query compilation.
//!
//! The native representation is a [`Selector`] expression tree. It renders
//! to a Jongo-style wire template (`{"price": {"$gt": #}}` with ordered `#`
//! parameters, never interpolated) for document databases, and it is
//! directly evaluable against `serde_json` documents, which is how the
//! in-memory store executes it.
//!
//! Explicit `Contains`/`StartsWith` filters are case-sensitive here
//! (regex-without-flags document semantics); structured free-text search is
//! case-insensitive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Write as _;

use crate::errors::Error;
use crate::filtering::{
    FilterOperator, FilterPredicate, FilterSet, SearchQuery, SortDirection, TextSearch,
    resolve_sort,
};
use crate::query::QueryCompiler;
use crate::schema::{FieldType, Property, Schema};

/// Field-level comparison of a compiled selector node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match on a text field
    Substring { case_insensitive: bool },
    /// Prefix match on a text field
    Prefix,
    /// Element membership in an array field
    ElementEquals,
    /// Prefix match against any element of an array field
    ElementPrefix,
}

/// Compiled document selector.
///
/// Serializable so it can cross a wire protocol boundary to a remote
/// document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    /// Conjunction; empty means "match everything"
    All(Vec<Selector>),
    /// Disjunction
    Any(Vec<Selector>),
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Presence/nullity test; `present` is true for `notNull`
    Exists { field: String, present: bool },
    /// Pre-formed native query, passed through verbatim
    Raw(String),
}

impl Selector {
    /// Render to the wire template plus ordered bound parameters.
    #[must_use]
    pub fn to_wire(&self) -> (String, Vec<Value>) {
        let mut body = String::new();
        let mut parameters = Vec::new();
        self.render(&mut body, &mut parameters);
        (body, parameters)
    }

    fn render(&self, out: &mut String, parameters: &mut Vec<Value>) {
        match self {
            Self::All(children) => Self::render_group("$and", children, out, parameters),
            Self::Any(children) => Self::render_group("$or", children, out, parameters),
            Self::Compare { field, op, value } => {
                render_compare(field, op, value, out, parameters);
            }
            Self::Exists { field, present } => {
                // Document null semantics: an absent field and an explicit
                // null are both "no value".
                if *present {
                    let _ = write!(out, "{{\"{field}\": {{\"$ne\": null}}}}");
                } else {
                    let _ = write!(out, "{{\"{field}\": null}}");
                }
            }
            Self::Raw(query) => out.push_str(query),
        }
    }

    fn render_group(
        keyword: &str,
        children: &[Selector],
        out: &mut String,
        parameters: &mut Vec<Value>,
    ) {
        match children {
            [] => out.push_str("{}"),
            [single] => single.render(out, parameters),
            many => {
                let _ = write!(out, "{{\"{keyword}\": [");
                for (index, child) in many.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    child.render(out, parameters);
                }
                out.push_str("]}");
            }
        }
    }

    /// Evaluate this selector against one document.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedFilter` for [`Selector::Raw`], which only a real
    /// document database can execute.
    pub fn matches(&self, document: &Map<String, Value>) -> Result<bool, Error> {
        match self {
            Self::All(children) => {
                for child in children {
                    if !child.matches(document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(children) => {
                for child in children {
                    if child.matches(document)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Compare { field, op, value } => {
                let actual = document.get(field).unwrap_or(&Value::Null);
                Ok(compare(actual, op, value))
            }
            Self::Exists { field, present } => {
                let has_value = document.get(field).is_some_and(|v| !v.is_null());
                Ok(has_value == *present)
            }
            Self::Raw(_) => Err(Error::unsupported_filter(
                "Raw selectors cannot be evaluated by the in-memory store",
            )),
        }
    }
}

fn render_compare(
    field: &str,
    op: &CompareOp,
    value: &Value,
    out: &mut String,
    parameters: &mut Vec<Value>,
) {
    match op {
        CompareOp::Eq | CompareOp::ElementEquals => {
            let _ = write!(out, "{{\"{field}\": #}}");
            parameters.push(value.clone());
        }
        CompareOp::Ne => {
            let _ = write!(out, "{{\"{field}\": {{\"$ne\": #}}}}");
            parameters.push(value.clone());
        }
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            let keyword = match op {
                CompareOp::Gt => "$gt",
                CompareOp::Gte => "$gte",
                CompareOp::Lt => "$lt",
                _ => "$lte",
            };
            let _ = write!(out, "{{\"{field}\": {{\"{keyword}\": #}}}}");
            parameters.push(value.clone());
        }
        CompareOp::Substring { case_insensitive } => {
            let pattern = escape_regex(value.as_str().unwrap_or_default());
            if *case_insensitive {
                let _ = write!(out, "{{\"{field}\": {{\"$regex\": #, \"$options\": \"i\"}}}}");
            } else {
                let _ = write!(out, "{{\"{field}\": {{\"$regex\": #}}}}");
            }
            parameters.push(Value::String(pattern));
        }
        CompareOp::Prefix | CompareOp::ElementPrefix => {
            let pattern = format!("^{}", escape_regex(value.as_str().unwrap_or_default()));
            let _ = write!(out, "{{\"{field}\": {{\"$regex\": #}}}}");
            parameters.push(Value::String(pattern));
        }
    }
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn compare(actual: &Value, op: &CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => json_eq(actual, expected),
        CompareOp::Ne => !json_eq(actual, expected),
        CompareOp::Gt => json_order(actual, expected) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            json_order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => json_order(actual, expected) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            json_order(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Substring { case_insensitive } => {
            match (actual.as_str(), expected.as_str()) {
                (Some(haystack), Some(needle)) => {
                    if *case_insensitive {
                        haystack.to_lowercase().contains(&needle.to_lowercase())
                    } else {
                        haystack.contains(needle)
                    }
                }
                _ => false,
            }
        }
        CompareOp::Prefix => match (actual.as_str(), expected.as_str()) {
            (Some(haystack), Some(prefix)) => haystack.starts_with(prefix),
            _ => false,
        },
        // Document equality over an array matches any element
        CompareOp::ElementEquals => match actual.as_array() {
            Some(elements) => elements.iter().any(|element| json_eq(element, expected)),
            None => json_eq(actual, expected),
        },
        CompareOp::ElementPrefix => match actual.as_array() {
            Some(elements) => elements.iter().any(|element| {
                matches!(
                    (element.as_str(), expected.as_str()),
                    (Some(haystack), Some(prefix)) if haystack.starts_with(prefix)
                )
            }),
            None => compare(actual, &CompareOp::Prefix, expected),
        },
    }
}

/// Equality with numeric coercion: `10` and `10.0` are the same value.
/// Integer pairs compare exactly, so identifiers above 2^53 do not collide
/// through the float path.
pub(crate) fn json_eq(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return l == r;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => (l - r).abs() < f64::EPSILON,
        _ => left == right,
    }
}

/// Ordering over numbers and (date) strings; other shapes do not order.
pub(crate) fn json_order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r);
    }
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        return Some(l.cmp(r));
    }
    None
}

/// Compiled search query for a document backend.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub selector: Selector,
    pub sort_by: String,
    pub sort_order: SortDirection,
}

impl DocumentQuery {
    /// Wire form: selector template plus ordered bound parameters.
    #[must_use]
    pub fn to_wire(&self) -> (String, Vec<Value>) {
        self.selector.to_wire()
    }
}

/// Filter/search compiler for document backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCompiler;

impl DocumentCompiler {
    fn selector(
        filters: &FilterSet,
        text: Option<&TextSearch>,
        schema: &Schema,
    ) -> Result<Selector, Error> {
        let mut children = Vec::with_capacity(filters.len() + 1);
        for predicate in filters.iter() {
            children.push(compile_predicate(predicate, schema)?);
        }
        if let Some(text) = text {
            children.push(text_selector(text, schema));
        }
        Ok(Selector::All(children))
    }
}

impl QueryCompiler for DocumentCompiler {
    type Query = DocumentQuery;
    type Count = Selector;

    fn compile(
        &self,
        filters: &FilterSet,
        query: &SearchQuery,
        schema: &Schema,
    ) -> Result<DocumentQuery, Error> {
        let selector = Self::selector(filters, query.text.as_ref(), schema)?;
        let (sort_by, sort_order) = resolve_sort(query, schema)?;
        Ok(DocumentQuery {
            selector,
            sort_by,
            sort_order,
        })
    }

    fn compile_count(
        &self,
        filters: &FilterSet,
        text: Option<&TextSearch>,
        schema: &Schema,
    ) -> Result<Selector, Error> {
        Self::selector(filters, text, schema)
    }
}

fn compile_predicate(predicate: &FilterPredicate, schema: &Schema) -> Result<Selector, Error> {
    let property = resolve_filterable(&predicate.field, schema)?;
    ensure_supported(predicate.operator, property)?;

    let is_array = property.field_type == FieldType::Array;
    let selector = match predicate.operator {
        FilterOperator::Equals => Selector::Compare {
            field: predicate.field.clone(),
            op: if is_array {
                CompareOp::ElementEquals
            } else {
                CompareOp::Eq
            },
            value: predicate.value.clone(),
        },
        FilterOperator::NotEquals => Selector::Compare {
            field: predicate.field.clone(),
            op: CompareOp::Ne,
            value: predicate.value.clone(),
        },
        FilterOperator::IsNull => Selector::Exists {
            field: predicate.field.clone(),
            present: false,
        },
        FilterOperator::NotNull => Selector::Exists {
            field: predicate.field.clone(),
            present: true,
        },
        FilterOperator::Contains => Selector::Compare {
            field: predicate.field.clone(),
            op: if is_array {
                CompareOp::ElementEquals
            } else {
                CompareOp::Substring {
                    case_insensitive: false,
                }
            },
            value: predicate.value.clone(),
        },
        FilterOperator::StartsWith => Selector::Compare {
            field: predicate.field.clone(),
            op: if is_array {
                CompareOp::ElementPrefix
            } else {
                CompareOp::Prefix
            },
            value: predicate.value.clone(),
        },
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEquals
        | FilterOperator::LesserThan
        | FilterOperator::LesserThanOrEquals => Selector::Compare {
            field: predicate.field.clone(),
            op: match predicate.operator {
                FilterOperator::GreaterThan => CompareOp::Gt,
                FilterOperator::GreaterThanOrEquals => CompareOp::Gte,
                FilterOperator::LesserThan => CompareOp::Lt,
                _ => CompareOp::Lte,
            },
            value: predicate.value.clone(),
        },
    };

    Ok(selector)
}

fn text_selector(text: &TextSearch, schema: &Schema) -> Selector {
    match text {
        TextSearch::Raw(query) => Selector::Raw(query.clone()),
        TextSearch::Structured(query) => Selector::Any(
            schema
                .searchable_field_names()
                .into_iter()
                .map(|field| Selector::Compare {
                    field: field.to_string(),
                    op: CompareOp::Substring {
                        case_insensitive: true,
                    },
                    value: Value::String(query.clone()),
                })
                .collect(),
        ),
    }
}

pub(crate) fn resolve_filterable<'a>(
    field: &str,
    schema: &'a Schema,
) -> Result<&'a Property, Error> {
    match schema.find_property(field) {
        Some(property) if !property.hidden => Ok(property),
        _ => Err(Error::unknown_field(field)),
    }
}

pub(crate) fn ensure_supported(
    operator: FilterOperator,
    property: &Property,
) -> Result<(), Error> {
    if operator.supports(property.field_type) {
        Ok(())
    } else {
        Err(Error::unsupported_filter(format!(
            "Operator '{}' is not valid for field '{}' of type {:?}",
            operator.wire_name(),
            property.name,
            property.field_type
        )))
    }
}
