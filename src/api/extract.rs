//! Request extractors

use crate::error::Error;
use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

/// JSON body extractor whose rejection is an [`Error`]
///
/// Malformed, mistyped, or non-JSON bodies are answered with the usual
/// `{error, code}` body instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> Error {
    tracing::debug!(error = %rejection, "rejected request body");
    Error::InvalidBody {
        status: rejection.status().as_u16(),
        message: rejection.body_text(),
    }
}
