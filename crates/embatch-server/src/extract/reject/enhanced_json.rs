//! JSON body extractor for batch requests.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json as AxumJson, Request};
use axum::response::{IntoResponse, Response};
use derive_more::{Deref, DerefMut, From};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::summarize;
use crate::handler::{Error, ErrorKind};

/// Request bodies rejected by [`Json`] report at most this many characters
/// of the underlying parser message.
const MAX_DETAIL_CHARS: usize = 200;

/// JSON extractor and responder.
///
/// Malformed JSON is a `400`, a missing `Content-Type: application/json` is
/// a `415` and well-formed JSON of the wrong shape is a `422`.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

impl From<JsonRejection> for Error<'static> {
    fn from(rejection: JsonRejection) -> Self {
        let detail = summarize(&rejection.body_text(), MAX_DETAIL_CHARS);

        match rejection {
            JsonRejection::JsonDataError(_) => ErrorKind::UnprocessableEntity
                .with_message("Every item needs an 'id' and exactly one of 'text' or 'image'")
                .with_context(detail),
            JsonRejection::JsonSyntaxError(_) => ErrorKind::BadRequest
                .with_message("Request body is not valid JSON")
                .with_context(detail),
            JsonRejection::MissingJsonContentType(_) => ErrorKind::UnsupportedMediaType
                .with_context("Content-Type must be application/json"),
            JsonRejection::BytesRejection(_) if detail.contains("length limit") => {
                ErrorKind::PayloadTooLarge.with_message("Split the batch into smaller requests")
            }
            JsonRejection::BytesRejection(_) => ErrorKind::BadRequest
                .with_message("Request body could not be read")
                .with_context(detail),
            _ => ErrorKind::InternalServerError.with_context(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::routing::post;
    use axum_test::TestServer;
    use embatch_core::BatchItem;
    use serde_json::json;

    use super::*;

    async fn echo(Json(items): Json<Vec<BatchItem>>) -> Json<usize> {
        Json(items.len())
    }

    fn server() -> anyhow::Result<TestServer> {
        Ok(TestServer::new(Router::new().route("/", post(echo)))?)
    }

    #[tokio::test]
    async fn test_valid_body() -> anyhow::Result<()> {
        let server = server()?;
        let response = server
            .post("/")
            .json(&json!([{"id": "a", "text": "hello"}]))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<usize>(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_shape_is_unprocessable() -> anyhow::Result<()> {
        let server = server()?;
        let response = server.post("/").json(&json!([{"id": "a"}])).await;
        response.assert_status_unprocessable_entity();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["name"], "unprocessable_entity");
        Ok(())
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() -> anyhow::Result<()> {
        let server = server()?;
        let response = server
            .post("/")
            .text("[{\"id\": ")
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_content_type() -> anyhow::Result<()> {
        let server = server()?;
        let response = server.post("/").text("[]").await;
        response.assert_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
        Ok(())
    }
}
