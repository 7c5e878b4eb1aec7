//! Boundary formats: IOF 3.0 XML course import, IOF 3.0 ResultList export
//! and the CSV competitor/club lists.

mod csv_import;
mod iof_export;
mod iof_import;

pub use csv_import::*;
pub use iof_export::*;
pub use iof_import::*;

use app_core::{CoreError, DbError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// malformed XML document
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    /// XML document could not be written
    #[error("xml write error: {0}")]
    XmlWrite(#[from] quick_xml::se::SeError),

    /// malformed CSV document
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// a required field is absent or unreadable
    #[error("invalid document: {0}")]
    Invalid(String),

    /// store failure
    #[error(transparent)]
    Db(#[from] DbError),

    /// core failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
