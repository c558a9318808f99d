use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use crate::token::{TokenError, bearer_token};

/// Extract and validate the session token from the Authorization header.
///
/// On success the token's [`Claims`](paphos_types::api::Claims) are inserted
/// into the request extensions for handlers to pick up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(TokenError::MalformedHeader)
        .and_then(bearer_token);

    let claims = auth_header
        .and_then(|token| state.tokens.verify(token))
        .map_err(|e| {
            debug!("Rejected request to {}: {}", req.uri().path(), e);
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
