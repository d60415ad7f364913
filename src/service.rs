//! Link mutations and owner-scoped reads
//!
//! Every operation takes the caller identity supplied by the authentication
//! middleware. A missing identity fails with [`LinkError::Unauthorized`]
//! before the store is touched. Links owned by someone else are reported as
//! [`LinkError::NotFound`], the same as links that do not exist.

use chrono::Utc;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::allocator::CodeAllocator;
use crate::error::{FieldErrors, LinkError, FIELD_SLUG, FIELD_URL};
use crate::model::Link;
use crate::store::LinkStore;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Checks that `url` is an absolute http(s) URL with a host
pub fn validate_destination(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is required".to_string());
    }

    let parsed = Url::parse(url).map_err(|_| "Please enter a valid absolute URL".to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("Unsupported URL scheme: {}", other)),
    }
    if parsed.host().is_none() {
        return Err("URL must include a host".to_string());
    }
    Ok(())
}

fn require_caller(caller: Option<&str>) -> Result<&str, LinkError> {
    caller
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(LinkError::Unauthorized)
}

#[derive(Clone)]
pub struct LinkService {
    store: LinkStore,
    allocator: CodeAllocator,
}

impl LinkService {
    pub fn new(store: LinkStore, allocator: CodeAllocator) -> Self {
        Self { store, allocator }
    }

    /// Creates a link owned by the caller.
    ///
    /// An absent or empty `slug` gets a randomly generated code. A given
    /// slug is validated and stored exactly as sent, without trimming.
    pub fn create(
        &self,
        caller: Option<&str>,
        url: &str,
        slug: Option<&str>,
    ) -> Result<Link, LinkError> {
        let owner = require_caller(caller)?;
        let requested = slug.filter(|s| !s.is_empty());

        let mut fields = FieldErrors::new();
        if let Err(msg) = validate_destination(url) {
            fields.insert(FIELD_URL.to_string(), msg);
        }
        if let Some(Err(msg)) = requested.map(|code| self.allocator.check_code(code)) {
            fields.insert(FIELD_SLUG.to_string(), msg);
        }
        if !fields.is_empty() {
            return Err(LinkError::Validation(fields));
        }

        let short_code = self.allocator.allocate(requested)?;

        let now = Utc::now();
        let link = Link {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            short_code,
            destination_url: url.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        // The allocator's check is advisory; a concurrent insert of the same
        // code surfaces here as CodeConflict and maps to CodeTaken.
        self.store.insert(&link)?;

        info!(id = %link.id, owner = %link.owner_id, code = %link.short_code, "link created");
        Ok(link)
    }

    /// Replaces the destination and short code of one of the caller's links
    pub fn edit(
        &self,
        caller: Option<&str>,
        id: &str,
        url: &str,
        slug: &str,
    ) -> Result<Link, LinkError> {
        let owner = require_caller(caller)?;
        let existing = self.owned_link(owner, id)?;

        let mut fields = FieldErrors::new();
        if let Err(msg) = validate_destination(url) {
            fields.insert(FIELD_URL.to_string(), msg);
        }
        if let Err(msg) = self.allocator.check_code(slug) {
            fields.insert(FIELD_SLUG.to_string(), msg);
        }
        if !fields.is_empty() {
            return Err(LinkError::Validation(fields));
        }

        if slug != existing.short_code && self.store.find_by_code_excluding(slug, id)?.is_some() {
            return Err(LinkError::CodeTaken);
        }

        let updated = Link {
            short_code: slug.to_string(),
            destination_url: url.trim().to_string(),
            updated_at: Utc::now(),
            ..existing
        };

        if !self.store.update(&updated)? {
            // Deleted between the ownership check and the write.
            return Err(LinkError::NotFound);
        }

        info!(id = %updated.id, owner = %updated.owner_id, code = %updated.short_code, "link updated");
        Ok(updated)
    }

    /// Deletes one of the caller's links
    pub fn delete(&self, caller: Option<&str>, id: &str) -> Result<(), LinkError> {
        let owner = require_caller(caller)?;
        let existing = self.owned_link(owner, id)?;

        if !self.store.delete(&existing.id)? {
            return Err(LinkError::NotFound);
        }

        info!(id = %existing.id, owner = %owner, code = %existing.short_code, "link deleted");
        Ok(())
    }

    /// Fetches one of the caller's links
    pub fn get(&self, caller: Option<&str>, id: &str) -> Result<Link, LinkError> {
        let owner = require_caller(caller)?;
        self.owned_link(owner, id)
    }

    /// Lists the caller's links newest first.
    ///
    /// `page` starts at 1; `limit` defaults to 10 and is capped at 100.
    /// Returns the effective page and limit along with the links.
    pub fn list(
        &self,
        caller: Option<&str>,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Result<(usize, usize, Vec<Link>), LinkError> {
        let owner = require_caller(caller)?;

        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let links = self.store.list_by_owner(owner, offset, limit)?;
        Ok((page, limit, links))
    }

    fn owned_link(&self, owner: &str, id: &str) -> Result<Link, LinkError> {
        match self.store.get_by_id(id)? {
            Some(link) if link.owner_id == owner => Ok(link),
            _ => Err(LinkError::NotFound),
        }
    }
}
