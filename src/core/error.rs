//! Typed error handling for fieldsets
//!
//! Errors are split by the stage that raises them so callers can react
//! specifically instead of matching on strings.
//!
//! # Error Categories
//!
//! - [`SelectionError`]: client supplied selectors that cannot be honoured
//! - [`SchemaError`]: malformed fieldset declarations, raised at startup
//! - [`MarshalError`]: failures while extracting values from a payload
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldsets::prelude::*;
//!
//! match fieldset.parse_selection(Some("nope"), None) {
//!     Err(SelectionError::UnknownFields { names, .. }) => {
//!         println!("unknown: {}", names.join(", "));
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//!     Ok(selection) => println!("{:?}", selection),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type for fieldset operations
#[derive(Debug, Error)]
pub enum FieldsetError {
    /// Invalid client selection
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Invalid fieldset declaration
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Failure while shaping a payload
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FieldsetError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            FieldsetError::Selection(e) => e.status_code(),
            FieldsetError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FieldsetError::Marshal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FieldsetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FieldsetError::Selection(e) => e.error_code(),
            FieldsetError::Schema(e) => e.error_code(),
            FieldsetError::Marshal(e) => e.error_code(),
            FieldsetError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client caused this error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            FieldsetError::Schema(SchemaError::Cyclic { chain }) => {
                Some(serde_json::json!({ "chain": chain }))
            }
            FieldsetError::Marshal(MarshalError::Format { field, .. })
            | FieldsetError::Marshal(MarshalError::MissingAttribute { field }) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for FieldsetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "fieldset failure");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Selection Errors
// =============================================================================

/// Errors raised while parsing client selectors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// One or more selected names are not part of the fieldset
    #[error("Unknown fields: {}", names.join(", "))]
    UnknownFields {
        /// Query parameter the names came from
        parameter: String,
        /// Every unknown name, sorted
        names: Vec<String>,
    },

    /// The selector was not a string (caller bug, not client input)
    #[error("Need a str, got {found}")]
    NotAString { found: String },

    /// The query string could not be decoded
    #[error("Malformed query string: {message}")]
    MalformedQuery { message: String },
}

impl SelectionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SelectionError::UnknownFields { .. } => StatusCode::BAD_REQUEST,
            SelectionError::NotAString { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SelectionError::MalformedQuery { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SelectionError::UnknownFields { .. } => "UNKNOWN_FIELDS",
            SelectionError::NotAString { .. } => "INVALID_SELECTOR",
            SelectionError::MalformedQuery { .. } => "MALFORMED_QUERY",
        }
    }

    /// Attach the query parameter the selector was read from
    pub fn for_parameter(self, parameter: &str) -> Self {
        match self {
            SelectionError::UnknownFields { names, .. } => SelectionError::UnknownFields {
                parameter: parameter.to_string(),
                names,
            },
            other => other,
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors raised while building a fieldset schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A fieldset nests itself, directly or through other fieldsets
    #[error("Cyclic fieldset nesting: {}", chain.join(" -> "))]
    Cyclic { chain: Vec<String> },

    /// Nesting exceeds the configured depth guard
    #[error("Fieldset '{fieldset}' nests {depth} levels deep (maximum {max})")]
    TooDeep {
        fieldset: String,
        depth: usize,
        max: usize,
    },

    /// A field name cannot be used in selectors
    #[error("Invalid field name '{name}' in fieldset '{fieldset}'")]
    InvalidFieldName { fieldset: String, name: String },

    /// A configured default is not part of the fieldset
    #[error("Unknown default {kind} in fieldset '{fieldset}': {}", names.join(", "))]
    UnknownDefault {
        fieldset: String,
        kind: &'static str,
        names: Vec<String>,
    },
}

impl SchemaError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SchemaError::Cyclic { .. } => "CYCLIC_FIELDSET",
            SchemaError::TooDeep { .. } => "FIELDSET_TOO_DEEP",
            SchemaError::InvalidFieldName { .. } => "INVALID_FIELD_NAME",
            SchemaError::UnknownDefault { .. } => "UNKNOWN_DEFAULT",
        }
    }
}

// =============================================================================
// Marshal Errors
// =============================================================================

/// Errors raised while extracting values from a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// A value could not be coerced to the declared format
    #[error("Cannot format field '{field}': {message}")]
    Format { field: String, message: String },

    /// A strictly nested object was missing from the source
    #[error("Missing attribute '{field}'")]
    MissingAttribute { field: String },

    /// The wrapped handler produced a body that is not JSON
    #[error("Response body is not JSON: {message}")]
    Body { message: String },
}

impl MarshalError {
    pub fn error_code(&self) -> &'static str {
        match self {
            MarshalError::Format { .. } => "FORMAT_ERROR",
            MarshalError::MissingAttribute { .. } => "MISSING_ATTRIBUTE",
            MarshalError::Body { .. } => "INVALID_BODY",
        }
    }

    /// Prefix the field path with the parent field name
    pub(crate) fn within(self, parent: &str) -> Self {
        match self {
            MarshalError::Format { field, message } => MarshalError::Format {
                field: format!("{}.{}", parent, field),
                message,
            },
            MarshalError::MissingAttribute { field } => MarshalError::MissingAttribute {
                field: format!("{}.{}", parent, field),
            },
            other => other,
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for fieldset operations
pub type FieldsetResult<T> = Result<T, FieldsetError>;
