//! Handler error type and its status-code taxonomy.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::handler::response::ErrorResponse;

/// A specialized [`Result`] type for handlers.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// Class of a handler failure. Each kind maps to exactly one status code
/// and one [`ErrorResponse`] template.
#[must_use = "error kinds do nothing unless turned into errors"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A route segment could not be extracted.
    MissingPathParam,
    /// The batch or its envelope failed validation.
    BadRequest,
    /// No route matched.
    NotFound,
    /// The body exceeded the configured limit.
    PayloadTooLarge,
    /// The body was not declared as JSON.
    UnsupportedMediaType,
    /// The body parsed as JSON but had the wrong shape.
    UnprocessableEntity,
    /// Anything the handler did not anticipate.
    InternalServerError,
    /// The job broker or the state store could not be reached.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Returns the response template of this kind.
    pub fn response(self) -> ErrorResponse<'static> {
        match self {
            Self::MissingPathParam => ErrorResponse::MISSING_PATH_PARAM,
            Self::BadRequest => ErrorResponse::BAD_REQUEST,
            Self::NotFound => ErrorResponse::NOT_FOUND,
            Self::PayloadTooLarge => ErrorResponse::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => ErrorResponse::UNSUPPORTED_MEDIA_TYPE,
            Self::UnprocessableEntity => ErrorResponse::UNPROCESSABLE_ENTITY,
            Self::InternalServerError => ErrorResponse::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => ErrorResponse::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the status code of this kind.
    #[inline]
    pub fn status_code(self) -> StatusCode {
        self.response().status
    }

    /// Starts an [`Error`] of this kind carrying `message`.
    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    /// Starts an [`Error`] of this kind carrying `context`.
    pub fn with_context<'a>(self, context: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_context(context)
    }

    /// Starts an [`Error`] of this kind pointing at `resource`.
    pub fn with_resource<'a>(self, resource: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_resource(resource)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response().name)
    }
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        self.response().into_response()
    }
}

/// Error returned by handlers and extractors.
///
/// The kind decides the status code. The optional parts are layered onto
/// the kind's template when the error is rendered.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless rendered"]
pub struct Error<'a> {
    kind: ErrorKind,
    message: Option<Cow<'a, str>>,
    resource: Option<Cow<'a, str>>,
    context: Option<Cow<'a, str>>,
}

impl Error<'static> {
    /// Creates a bare error of `kind`.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            resource: None,
            context: None,
        }
    }
}

impl<'a> Error<'a> {
    /// Replaces the client-facing message.
    pub fn with_message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Replaces the resource the error refers to.
    pub fn with_resource(mut self, resource: impl Into<Cow<'a, str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Replaces the debugging context.
    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Renders the body this error produces.
    pub fn to_response(&self) -> ErrorResponse<'a> {
        let mut body = self.kind.response();
        if let Some(message) = self.message.clone() {
            body = body.with_message(message);
        }
        if let Some(resource) = self.resource.clone() {
            body = body.with_resource(resource);
        }
        if let Some(context) = self.context.clone() {
            body = body.with_context(context);
        }
        body
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.kind.status_code();
        write!(f, "[{}] {}", status.as_u16(), self.kind)?;

        if let Some(message) = self.message() {
            write!(f, ": {message}")?;
        }
        if let Some(resource) = self.resource() {
            write!(f, " (resource {resource})")?;
        }
        if let Some(context) = self.context() {
            write!(f, " caused by {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}
