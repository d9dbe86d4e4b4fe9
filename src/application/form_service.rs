use chrono::{DateTime, Utc};

use crate::domain::attachment::Attachment;
use crate::domain::errors::FormError;
use crate::domain::ports::{DocumentExporter, ExportedDocument};
use crate::domain::product::ProductList;
use crate::domain::supplier::{SupplierDocument, SupplierFields, SupplierRecord};

/// Single validation pass over the whole form. Stops at the first failure:
/// required fields, then products, then attachments.
pub fn assemble(
    fields: &SupplierFields,
    products: &ProductList,
    attachments: &[Attachment],
    created_at: DateTime<Utc>,
) -> Result<SupplierDocument, FormError> {
    if let Some(missing) = fields.first_missing() {
        return Err(FormError::RequiredFieldMissing(missing));
    }
    let entries = products.snapshot()?;
    if attachments.is_empty() {
        return Err(FormError::NoAttachments);
    }

    Ok(SupplierDocument::new(
        SupplierRecord::from(fields),
        entries,
        attachments.to_vec(),
        created_at,
    ))
}

pub struct SupplierService<E> {
    exporter: E,
}

impl<E: DocumentExporter> SupplierService<E> {
    pub fn new(exporter: E) -> Self {
        Self { exporter }
    }

    /// Validates, builds the document and hands it to the exporter.
    pub fn save(
        &self,
        fields: &SupplierFields,
        products: &ProductList,
        attachments: &[Attachment],
    ) -> Result<ExportedDocument, FormError> {
        let document = assemble(fields, products, attachments, Utc::now())?;
        let exported = self.exporter.export(&document)?;
        log::info!(
            "supplier '{}' saved as {} ({} product(s), {} attachment(s))",
            document.supplier().legal_name,
            exported.file_name,
            document.products().len(),
            document.attachments().len()
        );
        Ok(exported)
    }
}
