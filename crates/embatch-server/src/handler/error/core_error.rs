//! Pipeline error to HTTP error conversion.

use embatch_core::ErrorKind as CoreErrorKind;

use super::http_error::{Error as HttpError, ErrorKind};

impl From<embatch_core::Error> for HttpError<'static> {
    fn from(error: embatch_core::Error) -> Self {
        let message = error.message.clone().unwrap_or_default();

        match error.kind() {
            CoreErrorKind::Validation => ErrorKind::BadRequest
                .with_message(message)
                .with_resource("batch"),

            CoreErrorKind::PayloadTooLarge => ErrorKind::PayloadTooLarge
                .with_message(message)
                .with_resource("batch"),

            CoreErrorKind::Queue => ErrorKind::ServiceUnavailable
                .with_message("Job queue unavailable")
                .with_context(message),

            CoreErrorKind::Store => ErrorKind::ServiceUnavailable
                .with_message("Job state store unavailable")
                .with_context(message),

            _ => ErrorKind::InternalServerError.with_context(error.to_string()),
        }
    }
}
