//! Runtime configuration loaded from the environment
//!
//! Values are read once at startup (after `.env` has been loaded by `main`)
//! and shared through [`crate::database::AppState`]. Tests build a `Config`
//! directly instead of touching process environment variables.

use std::env;

use crate::allocator::{DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS, MAX_CODE_LENGTH};

/// Default path visitors are sent to when a short code does not resolve
pub const DEFAULT_NOT_FOUND_PATH: &str = "/link-not-found";

/// Checks a `NOT_FOUND_PATH` value can be mounted next to `/{code}`
/// and `/api`: one or more `/`-separated segments of ASCII letters,
/// digits, `-` or `_`, not starting with `api`.
pub fn is_valid_not_found_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let mut segments = rest.split('/');
    if segments.clone().next() == Some("api") {
        return false;
    }
    segments.all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Application configuration
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `PUBLIC_URL` - Base used to build `short_url` (default: `http://localhost:{PORT}`)
/// - `AUTHORIZATION` - Optional shared secret required on `/api` requests
/// - `NOT_FOUND_PATH` - Redirect target for unknown codes (default: "/link-not-found")
/// - `CODE_LENGTH` - Length of generated codes (default: 6)
/// - `CODE_MAX_ATTEMPTS` - Random draws before giving up (default: 10)
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub public_url: String,
    pub auth_secret: Option<String>,
    pub not_found_path: String,
    pub code_length: usize,
    pub max_attempts: usize,
}

impl Config {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let public_url = env::var("PUBLIC_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let code_length = env::var("CODE_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|len: &usize| (1..=MAX_CODE_LENGTH).contains(len))
            .unwrap_or(DEFAULT_CODE_LENGTH);

        let max_attempts = env::var("CODE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "data.db".to_string()),
            public_url: public_url.trim_end_matches('/').to_string(),
            auth_secret: env::var("AUTHORIZATION").ok().filter(|s| !s.is_empty()),
            not_found_path: env::var("NOT_FOUND_PATH")
                .ok()
                .filter(|p| is_valid_not_found_path(p))
                .unwrap_or_else(|| DEFAULT_NOT_FOUND_PATH.to_string()),
            code_length,
            max_attempts,
        }
    }

    /// Short codes that the not-found route would shadow
    pub fn reserved_codes(&self) -> Vec<String> {
        self.not_found_path
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(|segment| vec![segment.to_string()])
            .unwrap_or_default()
    }

    /// Builds the public short URL for a code
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.public_url, code)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            public_url: "http://localhost:8080".to_string(),
            auth_secret: None,
            not_found_path: DEFAULT_NOT_FOUND_PATH.to_string(),
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
