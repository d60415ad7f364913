//! HTTP request handlers for the URL shortener API
//!
//! This module adapts HTTP requests onto the link service and resolver:
//! - Public redirect from a short code to its destination
//! - A plain not-found page for unknown codes
//! - Create, fetch, edit, delete and list for the signed-in owner
//!
//! Successful API calls answer `{"success": true, "data": ...}`; failures
//! are rendered by [`LinkError`]'s `IntoResponse` implementation.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use url::{form_urlencoded, Url};

use crate::config::Config;
use crate::database::AppState;
use crate::error::LinkError;
use crate::middleware::Caller;
use crate::model::{
    CreateRequest, EditRequest, Link, LinkPage, LinkResponse, ListParams, NotFoundParams,
};
use crate::resolver::Resolution;

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

fn to_response(config: &Config, link: Link) -> LinkResponse {
    let short_url = config.short_url(&link.short_code);
    LinkResponse { link, short_url }
}

/// Unwraps a JSON body, reporting an unreadable one as a validation error.
/// Unauthenticated callers get `Unauthorized` regardless of the body.
fn read_body<T>(
    caller: &Caller,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<Json<T>, LinkError> {
    payload.map_err(|rejection| match caller.id() {
        Some(_) => LinkError::from(rejection),
        None => LinkError::Unauthorized,
    })
}

/// Builds the not-found redirect target carrying the attempted code
pub fn not_found_location(not_found_path: &str, code: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .finish();
    format!("{}?{}", not_found_path, query)
}

/// 302 Found to `location`
///
/// Destinations are stored as entered; one that is not a valid header value
/// (non-ASCII characters) is sent in its percent-encoded form.
fn found(location: &str) -> Response {
    let value = HeaderValue::from_str(location).ok().or_else(|| {
        Url::parse(location)
            .ok()
            .and_then(|url| HeaderValue::from_str(url.as_str()).ok())
    });

    match value {
        Some(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        None => {
            error!(location, "redirect target is not a valid Location header");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Redirects a short code to its destination
///
/// # Response
///
/// - **302 Found** to the destination URL
/// - **302 Found** to the not-found page (`?code=<code>`) for unknown codes
/// - **500** if the store cannot be read
///
/// A temporary redirect is used so that edits to the destination apply to
/// the next visit; browsers do not cache it.
pub async fn redirect_url(Path(code): Path<String>, State(state): State<AppState>) -> Response {
    match state.resolver.resolve(&code) {
        Ok(Resolution::Found(destination)) => found(&destination),
        Ok(Resolution::NotFound) => {
            found(&not_found_location(&state.config.not_found_path, &code))
        }
        Err(err) => {
            error!(error = ?err, code = %code, "failed to resolve short code");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Landing page for codes that do not resolve
pub async fn link_not_found(Query(params): Query<NotFoundParams>) -> Response {
    let message = match params.code.as_deref() {
        Some(code) if !code.is_empty() => format!("Short link \"{}\" was not found.", code),
        _ => "Short link not found.".to_string(),
    };
    (StatusCode::NOT_FOUND, message).into_response()
}

/// Creates a new short link owned by the caller
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/very/long/url", "slug": "my-link" }
/// ```
///
/// # Response
///
/// - **201 Created** - link created
/// - **400 Bad Request** - invalid `url` or `slug`, or an unreadable body
///   (see `field_errors`)
/// - **409 Conflict** - slug already taken
/// - **503 Service Unavailable** - no free random code found
pub async fn create_link(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Response, LinkError> {
    let Json(payload) = read_body(&caller, payload)?;
    let link = state
        .links
        .create(caller.id(), &payload.url, payload.slug.as_deref())?;
    Ok(success(StatusCode::CREATED, to_response(&state.config, link)))
}

/// Fetches one of the caller's links
pub async fn get_link(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Response, LinkError> {
    let link = state.links.get(caller.id(), &id)?;
    Ok(success(StatusCode::OK, to_response(&state.config, link)))
}

/// Updates the destination and slug of one of the caller's links
pub async fn edit_link(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Response, LinkError> {
    let Json(payload) = read_body(&caller, payload)?;
    let link = state
        .links
        .edit(caller.id(), &id, &payload.url, &payload.slug)?;
    Ok(success(StatusCode::OK, to_response(&state.config, link)))
}

/// Deletes one of the caller's links. Answers with `data: null`.
pub async fn delete_link(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Response, LinkError> {
    state.links.delete(caller.id(), &id)?;
    Ok(success(StatusCode::OK, ()))
}

/// Lists the caller's links, newest first
///
/// # Example Request
///
/// `GET /api/links?page=2&limit=20`
pub async fn list_links(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<ListParams>,
) -> Result<Response, LinkError> {
    let (page, limit, links) = state.links.list(caller.id(), params.page, params.limit)?;

    let links: Vec<LinkResponse> = links
        .into_iter()
        .map(|link| to_response(&state.config, link))
        .collect();

    Ok(success(
        StatusCode::OK,
        LinkPage {
            page,
            limit,
            total_fetched: links.len(),
            links,
        },
    ))
}
