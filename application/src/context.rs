//! [`Context`]-related definitions.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};

use crate::{Error, JuniperResponse, Service};

/// Context of a single GraphQL request.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Status code of the response, if it carries errors.
    error_status_code: ErrorStatus,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        self.error_status_code.get()
    }

    /// Records the error status code for this [`Context`].
    ///
    /// Of several recorded codes, the highest one is applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code.record(status_code);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service =
            parts.extensions.get::<Service>().cloned().ok_or_else(|| {
                JuniperResponse {
                    status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                    response: GraphQLBatchResponse::Single(
                        GraphQLResponse::error(
                            Error::internal(&"missing `Service` extension")
                                .into_field_error(),
                        ),
                    ),
                }
            })?;

        Ok(Self {
            service,
            error_status_code: ErrorStatus::default(),
        })
    }
}


/// Most severe [`http::StatusCode`] among the errors of a request.
#[derive(Debug, Default)]
struct ErrorStatus(AtomicU16);

impl ErrorStatus {
    /// Records the provided [`http::StatusCode`], keeping the highest one.
    fn record(&self, code: http::StatusCode) {
        _ = self.0.fetch_max(code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Returns the highest recorded [`http::StatusCode`].
    ///
    /// [`http::StatusCode::INTERNAL_SERVER_ERROR`] if none was recorded.
    fn get(&self) -> http::StatusCode {
        match self.0.load(atomic::Ordering::Relaxed) {
            0 => http::StatusCode::INTERNAL_SERVER_ERROR,
            code => http::StatusCode::from_u16(code)
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

#[cfg(test)]
mod spec {
    use http::StatusCode;

    use super::ErrorStatus;

    #[test]
    fn defaults_to_internal_error() {
        assert_eq!(
            ErrorStatus::default().get(),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn keeps_most_severe_code() {
        let status = ErrorStatus::default();

        status.record(StatusCode::NOT_FOUND);
        status.record(StatusCode::BAD_REQUEST);
        assert_eq!(status.get(), StatusCode::NOT_FOUND);

        status.record(StatusCode::SERVICE_UNAVAILABLE);
        status.record(StatusCode::CONFLICT);
        assert_eq!(status.get(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
