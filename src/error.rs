//! Handler error type and its HTTP rendering.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected before any collaborator runs.
    #[error("{0}")]
    BadRequest(String),

    /// A collaborator (OCR engine, PDF library) failed.
    #[error("{context}: {cause:#}")]
    Processing {
        context: &'static str,
        cause: anyhow::Error,
        /// Full error chain, only populated in debug mode.
        trace: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn processing(context: &'static str, cause: anyhow::Error, debug: bool) -> Self {
        let trace = debug.then(|| format!("{:?}", cause));
        Self::Processing {
            context,
            cause,
            trace,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let trace = match self {
            Self::BadRequest(_) => {
                warn!(error = %detail, "Rejected request");
                None
            }
            Self::Processing { trace, .. } => {
                error!(error = %detail, "Processing failed");
                trace
            }
        };

        (status, Json(ErrorBody { detail, trace })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(format!("Multipart error: {}", err))
    }
}
