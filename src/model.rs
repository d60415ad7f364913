//! Data models for the URL shortener application
//!
//! This module defines the stored [`Link`] entity and the request/response
//! structures exchanged with the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short link record stored in the database
///
/// `id`, `owner_id` and `created_at` never change after creation.
/// `short_code` and `destination_url` are editable by the owner, and every
/// edit refreshes `updated_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Link {
    /// Opaque unique identifier (UUID v4), never reused
    pub id: String,

    /// Identity of the user who created the link
    pub owner_id: String,

    /// Globally unique code appended to the redirect base path
    pub short_code: String,

    /// Absolute URL the code redirects to
    pub destination_url: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a new short link
///
/// # Example
/// ```json
/// {
///   "url": "https://example.com/very/long/url",
///   "slug": "my-link"  // Optional
/// }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct CreateRequest {
    /// The destination URL. Missing is reported like an empty value.
    #[serde(default)]
    pub url: String,

    /// Optional custom short code. Empty means "generate one".
    pub slug: Option<String>,
}

/// Request payload for editing a link. Both fields are required; a
/// missing field deserializes empty and fails field validation.
#[derive(Deserialize, Debug, Clone)]
pub struct EditRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub slug: String,
}

/// A link as returned to API callers, with its full short URL
#[derive(Serialize, Debug, Clone)]
pub struct LinkResponse {
    #[serde(flatten)]
    pub link: Link,

    /// The complete shortened URL (e.g., "http://localhost:8080/abc123")
    pub short_url: String,
}

/// Query parameters for listing links with pagination
///
/// # Example
/// Query string: `?page=2&limit=20`
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Page number for pagination (starts from 1)
    /// Defaults to 1 if not provided
    pub page: Option<usize>,

    /// Number of items per page
    /// Defaults to 10 if not provided, maximum is 100
    pub limit: Option<usize>,
}

/// One page of the caller's links, newest first
#[derive(Serialize, Debug)]
pub struct LinkPage {
    pub page: usize,
    pub limit: usize,
    pub total_fetched: usize,
    pub links: Vec<LinkResponse>,
}

/// Query parameters of the not-found presentation page
#[derive(Deserialize, Debug)]
pub struct NotFoundParams {
    pub code: Option<String>,
}
