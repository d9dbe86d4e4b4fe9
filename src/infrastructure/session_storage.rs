use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::errors::FormError;
use crate::domain::ports::SessionStorage;

/// Process-local session storage. Clones share the same slots.
///
/// With a quota set, a write whose value is larger than the quota is refused,
/// the way a browser's session storage refuses oversized items.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, FormError> {
        self.slots
            .lock()
            .map_err(|_| FormError::Internal("session storage lock poisoned".to_string()))
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, FormError> {
        Ok(self.slots()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), FormError> {
        if let Some(quota) = self.quota_bytes {
            if value.len() > quota {
                return Err(FormError::Storage(format!(
                    "'{key}' needs {} bytes, quota is {quota}",
                    value.len()
                )));
            }
        }
        self.slots()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), FormError> {
        self.slots()?.remove(key);
        Ok(())
    }
}
