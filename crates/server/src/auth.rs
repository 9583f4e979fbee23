use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{errors::ApiError, state::AppState};

/// The raw bearer token of the current request, kept for logout.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Resolve `Authorization: Bearer <token>` to a live session and hand it to
/// the handler through request extensions.
pub async fn auth_required(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("You must be logged in.".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header.".to_string()))?;

    let session = state
        .services
        .accounts()
        .resolve(token)
        .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid.".to_string()))?;

    let token = SessionToken(token.to_string());
    req.extensions_mut().insert(session);
    req.extensions_mut().insert(token);

    Ok(next.run(req).await)
}
