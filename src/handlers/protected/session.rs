use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use tracing::info;

use crate::app::AppState;
use crate::auth::{cookies, CurrentUser};
use crate::error::ApiError;
use crate::schemas::MessageResponse;

/// POST /logout - End the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_session(&user.session_key).await?;
    info!(user_id = user.id, "User '{}' logged out", user.username);

    Ok((
        AppendHeaders([(SET_COOKIE, cookies::expired_session_cookie())]),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
