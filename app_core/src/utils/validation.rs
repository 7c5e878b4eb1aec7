// collected field errors for entity records and imports

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// reason class of a single field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldCode {
    /// the field must carry a value
    Required,
    /// the value does not parse into the field's type
    InvalidFormat,
    /// the value lies outside the declared value set of an enumeration
    InvalidEnum,
    /// the value is out of the permitted range
    OutOfRange,
    /// the field cannot be overwritten (primary keys)
    Protected,
}

impl FieldCode {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldCode::Required => "required",
            FieldCode::InvalidFormat => "invalid_format",
            FieldCode::InvalidEnum => "invalid_enum",
            FieldCode::OutOfRange => "out_of_range",
            FieldCode::Protected => "protected",
        }
    }
}

/// one broken field of an entity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    field: String,
    code: FieldCode,
    /// human-friendly detail; empty falls back to the code
    message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: FieldCode) -> Self {
        FieldError {
            field: field.into(),
            code,
            message: String::new(),
        }
    }

    pub fn with_message(
        field: impl Into<String>,
        code: FieldCode,
        message: impl Into<String>,
    ) -> Self {
        FieldError {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    pub fn get_field(&self) -> &str {
        &self.field
    }
    pub fn get_code(&self) -> FieldCode {
        self.code
    }
    pub fn get_message(&self) -> &str {
        &self.message
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}: {}", self.field, self.code.as_str())
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl std::error::Error for FieldError {}

/// Everything wrong with one record. Validators collect instead of bailing
/// on the first hit, so an operator sees the whole damage at once.
#[derive(Debug, Clone, Error, Default, Serialize, Deserialize, PartialEq, Eq)]
#[error("validation failed with {} error(s)", errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl From<FieldError> for ValidationErrors {
    fn from(value: FieldError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, err: FieldError) {
        self.errors.push(err);
    }

    /// Shorthand for the common "code only" case.
    pub fn push(&mut self, field: impl Into<String>, code: FieldCode) {
        self.add(FieldError::new(field, code));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// turn collected errors into a result
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub type ValidationResult<T> = Result<T, ValidationErrors>;
