//! Route definitions for the URL shortener API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    create_link, delete_link, edit_link, get_link, link_not_found, list_links, redirect_url,
};
use crate::middleware::auth_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /{code}` - Redirects to the destination URL (public endpoint)
/// - `GET {not_found_path}` - Not-found page for unknown codes (public endpoint)
/// - `GET /api/links` - Lists the caller's links with pagination
/// - `POST /api/links` - Creates a new short link
/// - `GET /api/links/{id}` - Fetches one of the caller's links
/// - `PUT /api/links/{id}` - Edits destination and slug
/// - `DELETE /api/links/{id}` - Deletes a link
///
/// # Example Usage
///
/// ```no_run
/// # use shortlink::config::Config;
/// # use shortlink::database::{init_db, AppState};
/// # use shortlink::route::create_app;
/// let db = init_db("data.db").unwrap();
/// let app = create_app(AppState::new(db, Config::default()));
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/links", get(list_links).post(create_link))
        .route(
            "/links/{id}",
            get(get_link).put(edit_link).delete(delete_link),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route(&state.config.not_found_path, get(link_not_found))
        .route("/{code}", get(redirect_url))
        .nest("/api", api_routes)
        .with_state(state)
}
