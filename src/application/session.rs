use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::application::address_service::{LookupGuard, LookupOutcome, LookupTicket};
use crate::application::attachment_store::{AttachmentStore, ATTACHMENTS_SLOT};
use crate::application::form_service::SupplierService;
use crate::domain::errors::FormError;
use crate::domain::ports::{DocumentExporter, ExportedDocument, SessionStorage};
use crate::domain::product::{ProductList, RowHandle};
use crate::domain::supplier::{AddressFragment, PostalCode, SupplierFields};

/// All mutable state behind one open supplier form.
pub struct FormSession<S> {
    fields: SupplierFields,
    products: ProductList,
    attachments: AttachmentStore<S>,
    lookups: LookupGuard,
}

impl<S: SessionStorage> FormSession<S> {
    /// Starts with one blank product row and whatever attachments the mirror
    /// slot still holds.
    pub fn open(storage: S, slot: impl Into<String>) -> Self {
        let mut products = ProductList::new();
        products.add_blank_row();
        Self {
            fields: SupplierFields::default(),
            products,
            attachments: AttachmentStore::restore(storage, slot),
            lookups: LookupGuard::default(),
        }
    }

    pub fn fields(&self) -> &SupplierFields {
        &self.fields
    }

    pub fn set_fields(&mut self, fields: SupplierFields) {
        if fields.postal_code != self.fields.postal_code {
            self.lookups.invalidate();
        }
        self.fields = fields;
    }

    pub fn products(&self) -> &ProductList {
        &self.products
    }

    pub fn products_mut(&mut self) -> &mut ProductList {
        &mut self.products
    }

    /// Removes a row, putting a blank one back if the list would be empty.
    pub fn remove_product(&mut self, handle: RowHandle) -> Result<(), FormError> {
        self.products.remove_row(handle)?;
        if self.products.is_empty() {
            self.products.add_blank_row();
        }
        Ok(())
    }

    pub fn attachments(&self) -> &AttachmentStore<S> {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentStore<S> {
        &mut self.attachments
    }

    /// Records the postal code as entered and, if it has exactly eight digits,
    /// issues a ticket for a lookup. Any ticket already in flight goes stale.
    pub fn begin_postal_lookup(&mut self, raw: &str) -> Option<LookupTicket> {
        self.fields.postal_code = raw.to_string();
        match PostalCode::parse(raw) {
            Some(code) => Some(self.lookups.issue(code)),
            None => {
                self.lookups.invalidate();
                log::debug!("postal code '{}' ignored, not eight digits", raw);
                None
            }
        }
    }

    /// Applies a lookup result if its ticket is still the latest one.
    /// Results for stale tickets are dropped, errors included.
    pub fn finish_postal_lookup(
        &mut self,
        ticket: &LookupTicket,
        result: Result<AddressFragment, FormError>,
    ) -> Result<LookupOutcome, FormError> {
        if !self.lookups.is_current(ticket) {
            log::warn!("discarding stale lookup result for {}", ticket.postal_code());
            return Ok(LookupOutcome::Stale);
        }
        let fragment = result?;
        self.fields.apply_address(&fragment);
        Ok(LookupOutcome::Applied)
    }

    pub fn save<E: DocumentExporter>(
        &self,
        service: &SupplierService<E>,
    ) -> Result<ExportedDocument, FormError> {
        service.save(&self.fields, &self.products, self.attachments.entries())
    }

    pub fn discard(self) -> Result<(), FormError> {
        self.attachments.discard()
    }
}

pub fn attachments_slot(session_id: Uuid) -> String {
    format!("{session_id}:{ATTACHMENTS_SLOT}")
}

struct LiveSession<S> {
    form: FormSession<S>,
    last_used: Instant,
}

impl<S> LiveSession<S> {
    fn new(form: FormSession<S>) -> Self {
        Self {
            form,
            last_used: Instant::now(),
        }
    }
}

/// Live form sessions keyed by session id. The storage outlives entries, so a
/// session rebuilt with `open` gets its attachments back.
///
/// With an idle timeout set, sessions untouched for longer than it are
/// dropped together with their mirror slot. Eviction runs whenever a session
/// is created or opened.
pub struct SessionRegistry<S> {
    storage: S,
    idle_timeout: Option<Duration>,
    sessions: Mutex<HashMap<Uuid, LiveSession<S>>>,
}

impl<S: SessionStorage + Clone> SessionRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            idle_timeout: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn create(&self) -> Result<Uuid, FormError> {
        let mut sessions = self.lock()?;
        self.evict_idle_locked(&mut sessions);
        let id = loop {
            let id = Uuid::new_v4();
            if !sessions.contains_key(&id) {
                break id;
            }
        };
        let form = FormSession::open(self.storage.clone(), attachments_slot(id));
        sessions.insert(id, LiveSession::new(form));
        log::info!("session {} created", id);
        Ok(id)
    }

    /// Opens the session, rebuilding it from the mirror if it is not live.
    /// Returns `true` when the session had to be rebuilt.
    pub fn open(&self, id: Uuid) -> Result<bool, FormError> {
        let mut sessions = self.lock()?;
        self.evict_idle_locked(&mut sessions);
        if let Some(live) = sessions.get_mut(&id) {
            live.last_used = Instant::now();
            return Ok(false);
        }
        let form = FormSession::open(self.storage.clone(), attachments_slot(id));
        log::info!(
            "session {} opened with {} restored attachment(s)",
            id,
            form.attachments().len()
        );
        sessions.insert(id, LiveSession::new(form));
        Ok(true)
    }

    pub fn with<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut FormSession<S>) -> Result<T, FormError>,
    ) -> Result<T, FormError> {
        let mut sessions = self.lock()?;
        let live = sessions
            .get_mut(&id)
            .ok_or_else(|| FormError::NotFound(format!("Session {id}")))?;
        live.last_used = Instant::now();
        f(&mut live.form)
    }

    /// Ends the session and discards its mirror slot.
    pub fn close(&self, id: Uuid) -> Result<(), FormError> {
        let removed = self.lock()?.remove(&id);
        match removed {
            Some(live) => live.form.discard()?,
            None => self.storage.remove_item(&attachments_slot(id))?,
        }
        log::info!("session {} closed", id);
        Ok(())
    }

    /// Drops every session idle for longer than the timeout. Returns how many
    /// were evicted.
    pub fn evict_idle(&self) -> Result<usize, FormError> {
        let mut sessions = self.lock()?;
        Ok(self.evict_idle_locked(&mut sessions))
    }

    pub fn live_count(&self) -> Result<usize, FormError> {
        Ok(self.lock()?.len())
    }

    fn evict_idle_locked(&self, sessions: &mut HashMap<Uuid, LiveSession<S>>) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, live)| live.last_used.elapsed() >= timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &idle {
            if let Some(live) = sessions.remove(id) {
                if let Err(e) = live.form.discard() {
                    log::warn!("could not discard mirror of idle session {}: {}", id, e);
                }
                log::info!("session {} evicted after {:?} idle", id, timeout);
            }
        }
        idle.len()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, LiveSession<S>>>, FormError> {
        self.sessions
            .lock()
            .map_err(|_| FormError::Internal("session registry lock poisoned".to_string()))
    }
}
