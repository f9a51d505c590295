//! JSON body of every failed request.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body returned with every 4xx and 5xx status.
///
/// ```json
/// { "name": "bad_request", "message": "...", "resource": "batch" }
/// ```
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse<'a> {
    /// Stable snake_case identifier of the failure class.
    pub name: Cow<'a, str>,
    /// Message safe to show to the caller.
    pub message: Cow<'a, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Cow<'a, str>>,
    /// Sent as the status line only.
    #[serde(skip)]
    pub status: StatusCode,
}

impl<'a> ErrorResponse<'a> {
    pub const BAD_REQUEST: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "bad_request",
        "The batch could not be accepted",
    );
    pub const MISSING_PATH_PARAM: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "missing_path_param",
        "A route parameter is missing",
    );
    pub const NOT_FOUND: Self = Self::new(
        StatusCode::NOT_FOUND,
        "not_found",
        "No such route",
    );
    pub const PAYLOAD_TOO_LARGE: Self = Self::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "payload_too_large",
        "The request body exceeds the size limit",
    );
    pub const UNSUPPORTED_MEDIA_TYPE: Self = Self::new(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "unsupported_media_type",
        "Expected an application/json body",
    );
    pub const UNPROCESSABLE_ENTITY: Self = Self::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        "unprocessable_entity",
        "The request body does not describe a batch",
    );
    pub const INTERNAL_SERVER_ERROR: Self = Self::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_server_error",
        "Something went wrong while handling the request",
    );
    pub const SERVICE_UNAVAILABLE: Self = Self::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "service_unavailable",
        "Jobs cannot be accepted right now, retry later",
    );

    const fn new(status: StatusCode, name: &'a str, message: &'a str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            message: Cow::Borrowed(message),
            resource: None,
            context: None,
            status,
        }
    }

    /// Appends a sentence to the message.
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.message = Cow::Owned(format!("{}. {}", self.message, message.into()));
        self
    }

    /// Sets the resource, nesting under an existing one as `parent/child`.
    pub fn with_resource(mut self, resource: impl Into<Cow<'a, str>>) -> Self {
        self.resource = Some(join(self.resource.take(), resource.into(), "/"));
        self
    }

    /// Adds debugging context, joined to earlier context with `; `.
    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        self.context = Some(join(self.context.take(), context.into(), "; "));
        self
    }
}

fn join<'a>(existing: Option<Cow<'a, str>>, next: Cow<'a, str>, separator: &str) -> Cow<'a, str> {
    match existing {
        Some(existing) => Cow::Owned(format!("{existing}{separator}{next}")),
        None => next,
    }
}

impl IntoResponse for ErrorResponse<'_> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_accumulate_as_sentences() {
        let response = ErrorResponse::BAD_REQUEST
            .with_message("Batch is empty")
            .with_message("Add at least one item");

        assert_eq!(
            response.message,
            "The batch could not be accepted. Batch is empty. Add at least one item"
        );
    }

    #[test]
    fn test_context_and_resource_are_joined() {
        let response = ErrorResponse::SERVICE_UNAVAILABLE
            .with_context("no responders")
            .with_context("stream JOBS_EMBEDDINGS")
            .with_resource("jobs")
            .with_resource("embeddings");

        assert_eq!(
            response.context.as_deref(),
            Some("no responders; stream JOBS_EMBEDDINGS")
        );
        assert_eq!(response.resource.as_deref(), Some("jobs/embeddings"));
    }

    #[test]
    fn test_status_is_not_serialized() {
        let response = ErrorResponse::BAD_REQUEST.with_resource("batch");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["name"], "bad_request");
        assert_eq!(json["resource"], "batch");
        assert!(json.get("context").is_none());
        assert!(json.get("status").is_none());
    }
}
