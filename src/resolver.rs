//! Short code to destination lookup for the public redirect endpoint

use crate::allocator::validate_code;
use crate::error::StoreError;
use crate::store::LinkStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

/// Read-only view of the link store used by the redirect path
#[derive(Clone)]
pub struct RedirectResolver {
    store: LinkStore,
}

impl RedirectResolver {
    pub fn new(store: LinkStore) -> Self {
        Self { store }
    }

    /// Maps a short code to its current destination.
    ///
    /// Codes that could never have been allocated resolve to
    /// [`Resolution::NotFound`] without a store lookup.
    pub fn resolve(&self, code: &str) -> Result<Resolution, StoreError> {
        if validate_code(code).is_err() {
            return Ok(Resolution::NotFound);
        }

        Ok(match self.store.get_by_code(code)? {
            Some(link) => Resolution::Found(link.destination_url),
            None => Resolution::NotFound,
        })
    }
}
