//! Sort resolution.
//!
//! Sorting must be deterministic across repeated calls: the caller's choice
//! wins, then the model's configured default sort, then the identifier
//! ascending.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::Error;
use crate::filtering::params::SearchQuery;
use crate::schema::property::Schema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for sea_orm::sea_query::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

/// Resolve the effective sort field and direction for a query.
///
/// # Errors
///
/// `Error::UnknownField` when the caller's `sortBy` does not name a visible
/// property.
pub fn resolve_sort(query: &SearchQuery, schema: &Schema) -> Result<(String, SortDirection), Error> {
    if let Some(sort_by) = &query.sort_by {
        match schema.find_property(sort_by) {
            Some(property) if !property.hidden => {
                return Ok((sort_by.clone(), query.sort_order));
            }
            _ => return Err(Error::unknown_field(sort_by)),
        }
    }

    if let Some((field, direction)) = &schema.default_sort {
        return Ok((field.clone(), *direction));
    }

    Ok((schema.id_property.clone(), SortDirection::Asc))
}
