use std::sync::Arc;

use crate::application::address_service::AddressService;
use crate::application::form_service::SupplierService;
use crate::application::session::SessionRegistry;
use crate::config::AppConfig;
use crate::domain::errors::FormError;
use crate::domain::ports::{AddressLookup, DocumentExporter};
use crate::infrastructure::json_export::JsonExporter;
use crate::infrastructure::session_storage::MemorySessionStorage;
use crate::infrastructure::viacep::ViaCepClient;

/// Shared application data handed to every request handler.
pub struct AppState {
    pub sessions: SessionRegistry<MemorySessionStorage>,
    pub addresses: AddressService,
    pub supplier: SupplierService<Arc<dyn DocumentExporter>>,
}

impl AppState {
    pub fn new(
        storage: MemorySessionStorage,
        lookup: Arc<dyn AddressLookup>,
        exporter: Arc<dyn DocumentExporter>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(storage),
            addresses: AddressService::new(lookup),
            supplier: SupplierService::new(exporter),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FormError> {
        let storage = match config.session_quota_bytes {
            Some(quota) => MemorySessionStorage::with_quota(quota),
            None => MemorySessionStorage::new(),
        };
        let lookup = ViaCepClient::new(config.lookup_url.clone(), config.lookup_timeout)?;
        let exporter: Arc<dyn DocumentExporter> = Arc::new(JsonExporter::new(config.export_dir.clone()));
        Ok(Self {
            sessions: SessionRegistry::new(storage).with_idle_timeout(config.session_idle_timeout),
            addresses: AddressService::new(Arc::new(lookup)),
            supplier: SupplierService::new(exporter),
        })
    }
}
