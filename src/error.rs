// src/error.rs
//! Domain error kinds shared by adapters, analyzer, exporter and the HTTP boundary.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// One provider failed. Non-fatal for aggregation.
    #[error("{provider} unavailable: {detail}")]
    SourceUnavailable {
        provider: &'static str,
        detail: String,
    },

    #[error("no news data available from any provider")]
    NoDataAvailable,

    #[error("{0}")]
    EmptyInput(&'static str),

    /// Provider detail is preserved verbatim for display.
    #[error("Error generating analysis: {0}")]
    Analysis(String),

    #[error("Failed to generate PDF: {0}")]
    Export(String),

    /// Request body could not be read as the expected JSON shape.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl DigestError {
    pub fn source_unavailable(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            provider,
            detail: detail.into(),
        }
    }

    /// Stable snake_case tag used in JSON error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::NoDataAvailable => "no_data_available",
            Self::EmptyInput(_) => "empty_input",
            Self::Analysis(_) => "analysis_error",
            Self::Export(_) => "export_error",
            Self::BadRequest(_) => "bad_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::SourceUnavailable { .. } | Self::NoDataAvailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::EmptyInput(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Analysis(_) => StatusCode::BAD_GATEWAY,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for DigestError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    kind: &'static str,
}

impl IntoResponse for DigestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            kind: self.kind(),
        };
        (self.status(), Json(body)).into_response()
    }
}
