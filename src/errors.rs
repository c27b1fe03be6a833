use sea_orm::error::DbErr;
use serde::Serialize;
use std::time::Duration;

use crate::validation::ValidationReport;

/// Failure reported by a [`RecordStore`](crate::store::RecordStore).
///
/// The message is whatever the backing store said; nothing is retried or
/// rewritten on the way up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        StoreError::new(err.to_string())
    }
}

impl From<sea_orm::sea_query::error::Error> for StoreError {
    fn from(err: sea_orm::sea_query::error::Error) -> Self {
        StoreError::new(format!("Failed to build statement: {}", err))
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(ValidationReport),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Aggregation error: {0}")]
    AggregationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Query exceeded deadline of {0:?}")]
    Timeout(Duration),
}

impl From<ValidationReport> for ServiceError {
    fn from(report: ValidationReport) -> Self {
        ServiceError::ValidationError(report)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(ValidationReport::from(err))
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::StoreError(err.into())
    }
}

impl ServiceError {
    /// Wraps a row decoding failure for the named table.
    pub fn decode(table: impl std::fmt::Display, err: serde_json::Error) -> Self {
        ServiceError::AggregationError(format!("Malformed {} row: {}", table, err))
    }

    /// True when the error came from the row store rather than local checks.
    pub fn is_store_error(&self) -> bool {
        matches!(self, ServiceError::StoreError(_))
    }

    /// Message suitable for showing to the person who submitted a write.
    ///
    /// Store failures surface the store's own text verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::StoreError(err) => err.message.clone(),
            ServiceError::ValidationError(report) => report.to_string(),
            other => other.to_string(),
        }
    }
}
