use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{self, cookies};
use crate::error::ApiError;

/// Session authentication middleware that resolves the session cookie and
/// injects the `CurrentUser` principal into request extensions
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = cookies::read_cookie(request.headers(), cookies::SESSION_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let user = auth::resolve_session(state.store.as_ref(), &token)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Rejected request with unknown or expired session");
            ApiError::unauthorized("Unauthorized")
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
