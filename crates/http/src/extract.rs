//! Extractors that reject with [`AppError`] instead of axum's plain-text
//! rejections, and run `validator` constraints before the handler sees the
//! value.

use std::fmt::Debug;

use axum::{
    extract::{FromRequest, FromRequestParts, Json, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

use crate::error::AppError;

/// Validated query string.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Validate + Debug + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    #[tracing::instrument(name = "query_extractor", skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::warn!(rejection = %rejection.body_text(), "Rejection");
                AppError::validation(
                    vec![json!({ "location": "query", "error": rejection.body_text() })],
                    "invalid query",
                )
            })?;

        value.validate().map_err(|errors| {
            tracing::warn!(?errors, "Validation errors");
            AppError::from_validation_errors("query", &errors)
        })?;

        tracing::trace!(query = ?value, "Extracted");

        Ok(ApiQuery(value))
    }
}

/// Validated JSON body.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Validate + Debug + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    #[tracing::instrument(name = "json_extractor", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::warn!(rejection = %rejection.body_text(), "Rejection");
                AppError::validation(
                    vec![json!({ "location": "body", "error": rejection.body_text() })],
                    "invalid body",
                )
            })?;

        value.validate().map_err(|errors| {
            tracing::warn!(?errors, "Validation errors");
            AppError::from_validation_errors("body", &errors)
        })?;

        tracing::trace!(body = ?value, "Extracted");

        Ok(ApiJson(value))
    }
}

/// Path parameters; a malformed segment is a bad request.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::warn!(rejection = %rejection.body_text(), "Rejection");
                AppError::bad_request(rejection.body_text())
            })?;

        Ok(ApiPath(value))
    }
}
