use thiserror::Error;

use super::supplier::RequiredField;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Required field is missing: {0}")]
    RequiredFieldMissing(RequiredField),
    #[error("At least one product is required")]
    NoProducts,
    #[error("Product row {} is incomplete (description, unit, quantity and unit price are required)", .0 + 1)]
    IncompleteProduct(usize),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("At least one attachment is required")]
    NoAttachments,
    #[error("Could not read file: {0}")]
    Encoding(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Lookup service unreachable: {0}")]
    Unreachable(String),
    #[error("Session storage rejected write: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
