use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::{self, cookies};
use crate::database::models::NewUser;
use crate::error::ApiError;
use crate::schemas::auth::{CsrfTokenResponse, LoginResponse, SignInRequest, SignUpRequest};
use crate::schemas::{Outcome, ValidatedJson};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// POST /register - Create an account
///
/// ```json
/// { "username": "jane", "email": "jane@example.com", "password": "at-least-8" }
/// ```
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignUpRequest>,
) -> Result<Json<Outcome>, ApiError> {
    let password = auth::hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password,
        })
        .await?;

    info!(user_id = user.id, "Registered user '{}'", user.username);
    Ok(Json(Outcome::ok("User registered successfully")))
}

/// GET /set-csrf-token - Issue the CSRF token browser clients must echo
///
/// Reuses the token from an existing `csrftoken` cookie so concurrent tabs
/// keep working.
pub async fn csrf_token(headers: HeaderMap) -> impl IntoResponse {
    let token = cookies::read_cookie(&headers, cookies::CSRF_COOKIE)
        .filter(|token| auth::is_well_formed_token(token))
        .unwrap_or_else(auth::generate_token);

    (
        AppendHeaders([(SET_COOKIE, cookies::csrf_cookie(&token))]),
        Json(CsrfTokenResponse { csrftoken: token }),
    )
}

/// POST /login - Verify credentials and start a session
///
/// Any session already carried by the request is discarded and the CSRF
/// token is rotated.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let Some(user) = auth::authenticate(store, &payload.username, &payload.password).await? else {
        warn!("Failed login attempt for '{}'", payload.username);
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if let Some(previous) = cookies::read_cookie(&headers, cookies::SESSION_COOKIE) {
        auth::end_session(store, &previous).await?;
    }
    let token = auth::start_session(store, user.id).await?;
    store.record_login(user.id).await?;

    info!(user_id = user.id, "User '{}' logged in", user.username);
    Ok((
        AppendHeaders([
            (SET_COOKIE, cookies::session_cookie(&token)),
            (SET_COOKIE, cookies::csrf_cookie(&auth::generate_token())),
        ]),
        Json(LoginResponse {
            success: true,
            id: user.id,
        }),
    ))
}
