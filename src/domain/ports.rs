use std::sync::Arc;

use async_trait::async_trait;

use super::errors::FormError;
use super::supplier::{AddressFragment, PostalCode, SupplierDocument};

/// Session-scoped, text-only key-value slots.
pub trait SessionStorage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Result<Option<String>, FormError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), FormError>;
    fn remove_item(&self, key: &str) -> Result<(), FormError>;
}

/// Resolves a postal code to an address. One attempt, no retries.
///
/// Implementations return `FormError::NotFound` when the code is unknown and
/// `FormError::Unreachable` on any transport failure.
#[async_trait]
pub trait AddressLookup: Send + Sync + 'static {
    async fn lookup(&self, postal_code: &PostalCode) -> Result<AddressFragment, FormError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub json: String,
}

/// Turns a finished document into something the user can view and download.
pub trait DocumentExporter: Send + Sync + 'static {
    fn export(&self, document: &SupplierDocument) -> Result<ExportedDocument, FormError>;
}

impl<T: DocumentExporter + ?Sized> DocumentExporter for Arc<T> {
    fn export(&self, document: &SupplierDocument) -> Result<ExportedDocument, FormError> {
        (**self).export(document)
    }
}
