use axum::{extract::Request, http::Method, middleware::Next, response::Response};

use crate::auth::{self, cookies};
use crate::config;
use crate::error::ApiError;

/// Double-submit CSRF check: state-changing requests must echo the
/// `csrftoken` cookie in the `X-CSRFToken` header.
pub async fn verify_csrf(request: Request, next: Next) -> Result<Response, ApiError> {
    if !config::config().security.csrf_enabled || is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let cookie = cookies::read_cookie(headers, cookies::CSRF_COOKIE)
        .ok_or_else(|| csrf_failure("CSRF cookie not set."))?;
    let provided = headers
        .get(cookies::CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| csrf_failure("CSRF token missing."))?;

    if !auth::is_well_formed_token(&cookie) || !auth::tokens_match(&cookie, provided) {
        return Err(csrf_failure("CSRF token incorrect."));
    }

    Ok(next.run(request).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn csrf_failure(reason: &str) -> ApiError {
    tracing::warn!("CSRF verification failed: {}", reason);
    ApiError::forbidden(format!("CSRF verification failed: {reason}"))
}
