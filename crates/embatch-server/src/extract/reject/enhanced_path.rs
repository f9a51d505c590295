use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path as AxumPath};
use axum::http::request::Parts;
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;

use super::summarize;
use crate::handler::{Error, ErrorKind};

/// Route parameter extractor rejecting with an [`Error`] body.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AxumPath::<T>::from_request_parts(parts, state).await {
            Ok(AxumPath(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl From<PathRejection> for Error<'static> {
    fn from(rejection: PathRejection) -> Self {
        let detail = summarize(&rejection.body_text(), 150);
        let kind = match rejection {
            PathRejection::FailedToDeserializePathParams(_) => ErrorKind::BadRequest,
            PathRejection::MissingPathParams(_) => ErrorKind::MissingPathParam,
            _ => return ErrorKind::InternalServerError.with_context(detail),
        };

        kind.with_message("Malformed route parameter")
            .with_context(detail)
    }
}
