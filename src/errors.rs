//! # Error Handling
//!
//! One error type covers the whole crate: schema construction, filter
//! compilation, pagination and storage execution. Each variant maps to an
//! HTTP status code so the embedding application can return errors straight
//! from a handler.
//!
//! ## Philosophy
//!
//! **Never expose internal errors to users.** Storage-layer causes are logged
//! server-side via `tracing` but are not serialized into responses, and they
//! are carried as plain strings so no backend-specific error type crosses the
//! crate boundary.
//!
//! Schema errors are configuration errors: they are raised at model
//! registration time and should abort startup for that model rather than be
//! handled per request.
//!
//! ## Logging
//!
//! Internal errors are logged using the `tracing` crate. To enable the
//! output, set up a subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Crate-wide error type with sanitized responses.
#[derive(Debug)]
pub enum Error {
    /// 500 - the model descriptor cannot be turned into a schema, or a
    /// schema-level contract was violated (e.g. looking up a hidden property).
    Schema {
        /// Description of the configuration problem
        message: String,
    },

    /// 400 - a filter or sort references a field absent from the schema.
    UnknownField {
        /// The offending field name
        field: String,
    },

    /// 400 - a filter operator is incompatible with the field's type, or a
    /// filter value cannot be coerced to it.
    UnsupportedFilter {
        /// User-facing description of the mismatch
        message: String,
    },

    /// 400 - non-positive page number or page size.
    InvalidPage {
        /// User-facing description
        message: String,
    },

    /// 404 - update/delete/get target is absent.
    NotFound {
        /// Resource type (e.g. "Product")
        resource: String,
        /// Identifier that was not found, if known
        id: Option<String>,
    },

    /// 422 - a submitted payload failed schema validation.
    Validation {
        /// Per-field validation messages
        errors: Vec<String>,
    },

    /// 500 - storage backend failure. The cause is kept for logging only.
    Storage {
        /// User-facing generic message
        message: String,
        /// Internal cause (logged, never sent to callers)
        internal: Option<String>,
    },
}

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    pub fn unsupported_filter(message: impl Into<String>) -> Self {
        Self::UnsupportedFilter {
            message: message.into(),
        }
    }

    pub fn invalid_page(message: impl Into<String>) -> Self {
        Self::InvalidPage {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    /// Wrap a storage-layer failure. The cause ends up in the logs only.
    pub fn storage(internal: impl fmt::Display) -> Self {
        Self::Storage {
            message: "A storage error occurred".to_string(),
            internal: Some(internal.to_string()),
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Schema { .. } | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownField { .. }
            | Self::UnsupportedFilter { .. }
            | Self::InvalidPage { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// The user-facing error message (sanitized).
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Schema { message } => message.clone(),
            Self::UnknownField { field } => format!("Unknown field '{field}'"),
            Self::UnsupportedFilter { message } | Self::InvalidPage { message } => message.clone(),
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} with ID '{id}' not found")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::Validation { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::Storage { message, .. } => message.clone(),
        }
    }

    /// Log internal error details (not sent to callers).
    fn log_internal(&self) {
        match self {
            Self::Storage {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Storage error occurred");
            }
            Self::Schema { message } => {
                tracing::error!(message = %message, "Schema configuration error");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Request error"
                );
            }
        }
    }
}

/// Error response sent to callers (sanitized).
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::Validation { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for Error {}

/// `RecordNotFound` becomes 404; every other database error becomes an opaque
/// `Storage` error with the cause preserved as a string for logging.
impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::storage(err),
        }
    }
}
