//! Short code validation and allocation
//!
//! A requested code is validated and checked for availability. Without one,
//! random alphanumeric codes are drawn until a free one is found or the
//! attempt budget runs out.
//!
//! With the default 6 characters over 62 symbols there are 62^6 (about
//! 5.7e10) codes. At one million stored links a single draw collides with
//! probability about 1.7e-5, so ten collisions in a row should never happen
//! in practice. Running out of attempts means the namespace is close to
//! full or the generator is broken, and is reported instead of looping.
//!
//! The allocator only reads the store. The code is claimed later by
//! [`LinkStore::insert`], which rejects it if another request won the race.

use std::sync::Arc;

use rand::{distr::Alphanumeric, Rng};
use tracing::{debug, warn};

use crate::error::{LinkError, FIELD_SLUG};
use crate::store::LinkStore;

/// Longest short code accepted
pub const MAX_CODE_LENGTH: usize = 50;

/// Length of randomly generated codes
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Random draws before allocation gives up
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Checks the short code shape: 1 to 50 ASCII letters, digits, `-` or `_`.
///
/// Returns the message to show next to the slug field on failure.
pub fn validate_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("Short code is required".to_string());
    }
    if code.len() > MAX_CODE_LENGTH {
        return Err(format!(
            "Short code must be at most {} characters",
            MAX_CODE_LENGTH
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Short code may only contain letters, numbers, hyphens and underscores".to_string(),
        );
    }
    Ok(())
}

/// Source of candidate short codes
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws codes uniformly from `[A-Za-z0-9]`
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.clamp(1, MAX_CODE_LENGTH),
        }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Produces a free short code for a new link
#[derive(Clone)]
pub struct CodeAllocator {
    store: LinkStore,
    generator: Arc<dyn CodeGenerator>,
    max_attempts: usize,
    reserved: Arc<[String]>,
}

impl CodeAllocator {
    pub fn new(store: LinkStore, generator: Arc<dyn CodeGenerator>, max_attempts: usize) -> Self {
        Self {
            store,
            generator,
            max_attempts: max_attempts.max(1),
            reserved: Arc::from(Vec::new()),
        }
    }

    /// Codes shadowed by fixed routes; they are never handed out.
    pub fn with_reserved(mut self, reserved: Vec<String>) -> Self {
        self.reserved = Arc::from(reserved);
        self
    }

    pub fn is_reserved(&self, code: &str) -> bool {
        self.reserved.iter().any(|r| r == code)
    }

    /// Shape rule plus the reserved-route check, as a slug field error
    pub fn check_code(&self, code: &str) -> Result<(), String> {
        validate_code(code)?;
        if self.is_reserved(code) {
            return Err(format!("Short code '{}' conflicts with a reserved route", code));
        }
        Ok(())
    }

    /// Returns `requested` if it is well formed and unused, otherwise a fresh
    /// random code.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Validation`] for a malformed or reserved requested code
    /// - [`LinkError::CodeTaken`] if the requested code is in use
    /// - [`LinkError::AllocationExhausted`] if every random draw collided
    /// - [`LinkError::OperationFailed`] on storage failure
    pub fn allocate(&self, requested: Option<&str>) -> Result<String, LinkError> {
        if let Some(code) = requested {
            self.check_code(code)
                .map_err(|msg| LinkError::field(FIELD_SLUG, msg))?;
            if self.store.code_exists(code)? {
                return Err(LinkError::CodeTaken);
            }
            return Ok(code.to_string());
        }

        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();
            if !self.is_reserved(&candidate) && !self.store.code_exists(&candidate)? {
                return Ok(candidate);
            }
            debug!(attempt, code = %candidate, "generated short code collided");
        }

        warn!(
            attempts = self.max_attempts,
            "short code allocation exhausted its attempt budget"
        );
        Err(LinkError::AllocationExhausted)
    }
}
