use std::path::PathBuf;

use crate::domain::errors::FormError;
use crate::domain::ports::{DocumentExporter, ExportedDocument};
use crate::domain::supplier::SupplierDocument;

/// Renders documents as pretty-printed JSON named `supplier_{millis}.json`,
/// optionally keeping a copy in `output_dir`.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter {
    output_dir: Option<PathBuf>,
}

impl JsonExporter {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }

    pub fn file_name(document: &SupplierDocument) -> String {
        format!("supplier_{}.json", document.created_at().timestamp_millis())
    }
}

impl DocumentExporter for JsonExporter {
    fn export(&self, document: &SupplierDocument) -> Result<ExportedDocument, FormError> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| FormError::Internal(format!("serialize document: {e}")))?;
        let file_name = Self::file_name(document);

        if let Some(dir) = &self.output_dir {
            let path = dir.join(&file_name);
            std::fs::write(&path, &json)
                .map_err(|e| FormError::Storage(format!("{}: {}", path.display(), e)))?;
            log::info!("document written to {}", path.display());
        }

        Ok(ExportedDocument { file_name, json })
    }
}
