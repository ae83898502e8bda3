//! Relational query compilation on `sea_query`.
//!
//! Produces bound [`SelectStatement`]s, never interpolated SQL. Text
//! `contains`/`startsWith` filters and structured free-text search compile
//! to `UPPER(col) LIKE UPPER(pattern)` so matching is case-insensitive
//! across database backends. Array fields are stored as JSON text, so
//! membership checks compile to a LIKE over the serialized column.

use sea_orm::sea_query::{
    Alias, Asterisk, Condition, Expr, Func, Order, Query, SelectStatement, SimpleExpr,
    Value as SeaValue,
};
use serde_json::Value;

use crate::errors::Error;
use crate::filtering::{
    FilterOperator, FilterPredicate, FilterSet, SearchQuery, TextSearch, resolve_sort,
};
use crate::query::QueryCompiler;
use crate::query::document::{ensure_supported, resolve_filterable};
use crate::schema::{FieldType, Schema};

/// Compiled search query for a relational backend: the page select plus its
/// matching count statement.
#[derive(Debug, Clone)]
pub struct RelationalQuery {
    pub select: SelectStatement,
    pub count: SelectStatement,
}

/// Filter/search compiler targeting one table.
#[derive(Debug, Clone)]
pub struct RelationalCompiler {
    table: String,
}

impl RelationalCompiler {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    fn condition(
        filters: &FilterSet,
        text: Option<&TextSearch>,
        schema: &Schema,
    ) -> Result<Condition, Error> {
        let mut condition = Condition::all();
        for predicate in filters.iter() {
            condition = condition.add(compile_predicate(predicate, schema)?);
        }
        if let Some(text) = text {
            condition = condition.add(text_condition(text, schema));
        }
        Ok(condition)
    }

    fn count_statement(&self, condition: Condition) -> SelectStatement {
        Query::select()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
            .from(Alias::new(&self.table))
            .cond_where(condition)
            .take()
    }
}

impl QueryCompiler for RelationalCompiler {
    type Query = RelationalQuery;
    type Count = SelectStatement;

    fn compile(
        &self,
        filters: &FilterSet,
        query: &SearchQuery,
        schema: &Schema,
    ) -> Result<RelationalQuery, Error> {
        query.validate()?;
        let condition = Self::condition(filters, query.text.as_ref(), schema)?;
        let (sort_by, sort_order) = resolve_sort(query, schema)?;

        let select = Query::select()
            .column(Asterisk)
            .from(Alias::new(&self.table))
            .cond_where(condition.clone())
            .order_by(Alias::new(sort_by), Order::from(sort_order))
            .limit(query.page_size)
            .offset(query.offset())
            .take();

        Ok(RelationalQuery {
            select,
            count: self.count_statement(condition),
        })
    }

    fn compile_count(
        &self,
        filters: &FilterSet,
        text: Option<&TextSearch>,
        schema: &Schema,
    ) -> Result<SelectStatement, Error> {
        let condition = Self::condition(filters, text, schema)?;
        Ok(self.count_statement(condition))
    }
}

fn compile_predicate(predicate: &FilterPredicate, schema: &Schema) -> Result<SimpleExpr, Error> {
    let property = resolve_filterable(&predicate.field, schema)?;
    ensure_supported(predicate.operator, property)?;

    let column = Expr::col(Alias::new(&predicate.field));
    let is_array = property.field_type == FieldType::Array;

    let expr = match predicate.operator {
        FilterOperator::Equals if is_array => array_membership(&predicate.field, &predicate.value),
        FilterOperator::Equals => column.eq(sea_value(&predicate.value)),
        FilterOperator::NotEquals => column.ne(sea_value(&predicate.value)),
        FilterOperator::IsNull => column.is_null(),
        FilterOperator::NotNull => column.is_not_null(),
        FilterOperator::Contains if is_array => {
            array_membership(&predicate.field, &predicate.value)
        }
        FilterOperator::Contains => upper_like(&predicate.field, &text_of(&predicate.value), Affix::Both),
        FilterOperator::StartsWith if is_array => {
            // JSON-text array column: any element starting with the value
            let needle = text_of(&predicate.value).replace('"', "\\\"");
            Expr::col(Alias::new(&predicate.field)).like(format!("%\"{needle}%"))
        }
        FilterOperator::StartsWith => {
            upper_like(&predicate.field, &text_of(&predicate.value), Affix::Prefix)
        }
        FilterOperator::GreaterThan => column.gt(sea_value(&predicate.value)),
        FilterOperator::GreaterThanOrEquals => column.gte(sea_value(&predicate.value)),
        FilterOperator::LesserThan => column.lt(sea_value(&predicate.value)),
        FilterOperator::LesserThanOrEquals => column.lte(sea_value(&predicate.value)),
    };

    Ok(expr)
}

fn text_condition(text: &TextSearch, schema: &Schema) -> Condition {
    match text {
        TextSearch::Raw(clause) => Condition::all().add(SimpleExpr::Custom(clause.clone())),
        TextSearch::Structured(query) => {
            let mut any = Condition::any();
            for field in schema.searchable_field_names() {
                any = any.add(upper_like(field, query, Affix::Both));
            }
            any
        }
    }
}

enum Affix {
    Both,
    Prefix,
}

fn upper_like(field: &str, needle: &str, affix: Affix) -> SimpleExpr {
    let upper = needle.to_uppercase();
    let pattern = match affix {
        Affix::Both => format!("%{upper}%"),
        Affix::Prefix => format!("{upper}%"),
    };
    SimpleExpr::FunctionCall(Func::upper(Expr::col(Alias::new(field)))).like(pattern)
}

/// Membership in a JSON-text array column: LIKE against the serialized
/// element. Strings carry their quotes so `"Ryan"` does not match `"Ryans"`
/// mid-token.
fn array_membership(field: &str, value: &Value) -> SimpleExpr {
    let element = serde_json::to_string(value).unwrap_or_default();
    Expr::col(Alias::new(field)).like(format!("%{element}%"))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn sea_value(value: &Value) -> SeaValue {
    match value {
        Value::Null => SeaValue::String(None),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or_default().into()
            }
        }
        Value::String(s) => s.clone().into(),
        // Nested shapes land as serialized JSON text
        other => serde_json::to_string(other).unwrap_or_default().into(),
    }
}
