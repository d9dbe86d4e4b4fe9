use std::sync::Arc;

use crate::domain::errors::FormError;
use crate::domain::ports::AddressLookup;
use crate::domain::supplier::{AddressFragment, PostalCode};

/// Identifies one lookup request. Only the latest ticket may write results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: u64,
    postal_code: PostalCode,
}

impl LookupTicket {
    pub fn postal_code(&self) -> &PostalCode {
        &self.postal_code
    }
}

/// Generation counter guarding address fields against late responses.
#[derive(Debug, Default)]
pub struct LookupGuard {
    generation: u64,
}

impl LookupGuard {
    pub fn issue(&mut self, postal_code: PostalCode) -> LookupTicket {
        self.generation += 1;
        LookupTicket {
            generation: self.generation,
            postal_code,
        }
    }

    /// Invalidates any ticket in flight.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, ticket: &LookupTicket) -> bool {
        ticket.generation == self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Applied,
    Stale,
}

pub struct AddressService {
    lookup: Arc<dyn AddressLookup>,
}

impl AddressService {
    pub fn new(lookup: Arc<dyn AddressLookup>) -> Self {
        Self { lookup }
    }

    pub async fn resolve(&self, ticket: &LookupTicket) -> Result<AddressFragment, FormError> {
        let code = ticket.postal_code();
        match self.lookup.lookup(code).await {
            Ok(fragment) => {
                log::info!("postal code {} resolved to {}/{}", code, fragment.city, fragment.state);
                Ok(fragment)
            }
            Err(e) => {
                log::warn!("postal code {} lookup failed: {}", code, e);
                Err(e)
            }
        }
    }
}
