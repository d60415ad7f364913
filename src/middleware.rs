use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::database::AppState;

/// Header carrying the identity verified by the upstream identity provider
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity attached to every `/api` request.
///
/// `None` means the request is unauthenticated; link operations reject it.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<String>);

impl Caller {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Middleware to check the shared secret and attach the caller identity
///
/// If a shared secret is configured, the request must carry an
/// `Authorization` header with the matching value. The identity itself is
/// taken from the `X-User-Id` header without further verification.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(auth_secret) = state.config.auth_secret.as_deref() {
        let authorized = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == auth_secret);

        if !authorized {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "error": "Unauthorized",
                    "message": "Invalid or missing authorization header"
                })),
            )
                .into_response());
        }
    }

    let caller = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    request.extensions_mut().insert(Caller(caller));

    Ok(next.run(request).await)
}
