use std::fmt::Display;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Response, StatusCode, header::WWW_AUTHENTICATE};
use http_body_util::Full;
use lsat_core::{errors::Error, transport::Challenge};
use serde::{Deserialize, Serialize};

pub const PAYMENT_REQUIRED_MESSAGE: &str = "Payment Required";

/// JSON body of a paywall response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Represents a response the paywall sends instead of running the handler.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: StatusCode,
    /// Set on `402 Payment Required`.
    pub challenge: Option<Challenge>,
    pub body: ErrorBody,
}

impl ErrorResponse {
    pub fn payment_required(challenge: Challenge) -> Self {
        ErrorResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            challenge: Some(challenge),
            body: ErrorBody {
                code: StatusCode::PAYMENT_REQUIRED.as_u16(),
                message: PAYMENT_REQUIRED_MESSAGE.to_string(),
            },
        }
    }

    pub fn server_error(reason: impl Display) -> Self {
        ErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            challenge: None,
            body: ErrorBody {
                code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: reason.to_string(),
            },
        }
    }

    /// The `WWW-Authenticate` header to include in the response.
    ///
    /// Returns `None` if there is no challenge or it is not a valid header value.
    pub fn header_value(&self) -> Option<(HeaderName, HeaderValue)> {
        let challenge = self.challenge.as_ref()?;
        HeaderValue::from_str(&challenge.to_string())
            .inspect_err(|_err| {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to encode WWW-Authenticate header: {_err}; skipping");
            })
            .ok()
            .map(|value| (WWW_AUTHENTICATE, value))
    }
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        ErrorResponse::server_error(err)
    }
}

impl From<ErrorResponse> for Response<Full<Bytes>> {
    fn from(value: ErrorResponse) -> Self {
        let body = match serde_json::to_vec(&value.body) {
            Ok(b) => b,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to serialize ErrorResponse body to JSON bytes: {_err}");

                let mut response = Response::new(Full::new(Bytes::from_static(
                    b"Failed to serialize ErrorResponse body to JSON bytes",
                )));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return response;
            }
        };

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = value.status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some((name, val)) = value.header_value() {
            response.headers_mut().insert(name, val);
        }
        response
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let header = self.header_value();
        let mut response = (self.status, axum::extract::Json(self.body)).into_response();
        if let Some((name, val)) = header {
            response.headers_mut().insert(name, val);
        }
        response
    }
}
