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
use crate::schemas::auth::UserResponse;
use crate::schemas::profile::{ProfileRequest, ProfileResponse};
use crate::schemas::{Outcome, ValidatedJson};

/// GET /user - Identity of the logged-in user
pub async fn whoami(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// DELETE /delete-user - Delete the account with its lists, todos and profile
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_user(user.id).await?;
    info!(user_id = user.id, "Deleted account '{}'", user.username);

    Ok((
        AppendHeaders([(SET_COOKIE, cookies::expired_session_cookie())]),
        Json(Outcome::ok("User account deleted successfully.")),
    ))
}

/// GET /profile
pub async fn profile_get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.store.get_profile(user.id).await?;
    Ok(Json(profile.into()))
}

/// PUT /profile - Overwrite profile preferences
pub async fn profile_put(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<ProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.store.update_profile(user.id, payload.into()).await?;
    Ok(Json(profile.into()))
}
