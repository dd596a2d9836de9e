//! Request and response shapes of the JSON API.
//!
//! Inbound structs derive `Validate` and are extracted with
//! [`ValidatedJson`]; outbound structs are built from store records.

pub mod auth;
pub mod profile;
pub mod todo;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has been deserialized and validated. Failures are
/// returned as structured `ApiError`s before the handler runs.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Path parameters parsed with structured `ApiError` rejections, so a
/// malformed id is reported like any other bad request.
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ValidatedPath(value))
    }
}

/// `{success, message}` body used by register and delete endpoints
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
