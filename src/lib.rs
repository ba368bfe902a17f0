//! Taskquery: declarative filtering, sorting and pagination over typed records.
//!
//! A client describes what it wants (filters, sort keys and a page window) as plain data.
//! The engine resolves that description against a static per-record-type field registry,
//! compiles it into a predicate and a comparator, and applies them to a record set.
//!
//! # Architecture
//! - Field registry (field name to kind, accessor and allowed operators)
//! - Value coercion (wire strings to typed values)
//! - Predicate compilation (filters, ANDed)
//! - Comparator compilation (multi-key, stable)
//! - Query pipeline (validate, filter, count, sort, paginate)

mod coerce;
mod compiler;
mod config;
mod expr;
mod page;
mod pipeline;
mod schema;
mod sorter;
mod source;
mod types;
mod work_item;

pub use coerce::*;
pub use compiler::*;
pub use config::*;
pub use expr::*;
pub use page::*;
pub use pipeline::*;
pub use schema::*;
pub use sorter::*;
pub use source::*;
pub use types::*;
pub use work_item::*;

use thiserror::Error;

/// Errors raised while validating a query or building a registry.
///
/// Every request-level variant is detected before any record is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("value '{raw}' for field '{field}' is not a valid {expected}")]
    ValueFormat {
        field: String,
        raw: String,
        expected: FieldKind,
    },

    #[error("operator {operator} is not supported on {kind} field '{field}'")]
    UnsupportedOperator {
        field: String,
        operator: FilterOperator,
        kind: FieldKind,
    },

    #[error("invalid page request: pageNumber={page_number}, pageSize={page_size}")]
    InvalidPageRequest { page_number: i64, page_size: i64 },

    #[error("field '{field}' is registered twice")]
    DuplicateField { field: String },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

impl QueryError {
    /// Whether the error describes a malformed request (as opposed to a setup mistake).
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            QueryError::UnknownField { .. }
                | QueryError::ValueFormat { .. }
                | QueryError::UnsupportedOperator { .. }
                | QueryError::InvalidPageRequest { .. }
        )
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised by a [`QueryHandler`].
#[derive(Debug, Error)]
pub enum HandlerError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("record source failed: {0}")]
    Source(#[source] E),
}
