//! Definitions for error types used throughout core.

use crate::{
    DbError, PrinterError,
    utils::validation::{FieldError, ValidationErrors},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// database error
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// printer error
    #[error("printer error: {0}")]
    Printer(#[from] PrinterError),

    /// Generic validation error of one field of an entity
    #[error("field validation error: {0}")]
    Field(#[from] FieldError),

    /// Generic collected validation errors holding stringified field names.
    /// This works for ANY entity (Competitor, Course, etc.)
    #[error("validation error: {0:?}")]
    Validation(#[from] ValidationErrors),

    /// Broken relation between stored entities, e.g. a declared day without
    /// its run row. Fatal for the current request.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Referenced entity absent (unknown competitor id on edit, card id on
    /// modify). Boundaries report and continue.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// Parsing error for enums and raw payloads of core
    #[error("parsing error: {0}")]
    Parsing(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn is_missing_resource(&self) -> bool {
        matches!(self, CoreError::MissingResource(_))
    }
    pub fn get_field_error(&self) -> Option<&FieldError> {
        if let CoreError::Field(field_error) = self {
            Some(field_error)
        } else {
            None
        }
    }
}
