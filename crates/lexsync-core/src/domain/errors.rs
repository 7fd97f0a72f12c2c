//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and references to unknown records or changes.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A case number was empty or malformed
    #[error("Invalid case number: {0}")]
    InvalidCaseNumber(String),

    /// A change referenced a record that is not in the cache
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A change ID did not match any queued change
    #[error("Pending change not found: {0}")]
    ChangeNotFound(String),

    /// Unknown change kind name
    #[error("Unknown change kind: {0}")]
    UnknownChangeKind(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
