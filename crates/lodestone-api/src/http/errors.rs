//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lodestone_core::JobError;
use lodestone_fsops::FsOpsError;
use lodestone_telemetry::{current_request_id, current_route};
use tracing::{error, warn};

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_CONFLICT, PROBLEM_ENGINE_TIMEOUT, PROBLEM_ENGINE_UNAVAILABLE,
    PROBLEM_FORBIDDEN, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
};
use crate::models::{ProblemDetails, ProblemInvalidParam};

/// Structured API error with optional RFC9457 fields.
///
/// `diagnostic` holds raw engine text. It is serialised only after
/// [`ApiError::revealing`] has been called with operator access.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    invalid_params: Option<Vec<ProblemInvalidParam>>,
    diagnostic: Option<String>,
    reveal: bool,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            invalid_params: None,
            diagnostic: None,
            reveal: false,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_invalid_params(mut self, params: Vec<ProblemInvalidParam>) -> Self {
        self.invalid_params = Some(params);
        self
    }

    pub(crate) fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    /// Allow the raw diagnostic into the response body.
    pub(crate) const fn revealing(mut self, allowed: bool) -> Self {
        self.reveal = allowed;
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, PROBLEM_FORBIDDEN, "forbidden").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, PROBLEM_CONFLICT, "conflict").with_detail(detail)
    }

    pub(crate) fn engine_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_ENGINE_UNAVAILABLE,
            "engine unavailable",
        )
        .with_detail(detail)
    }

    pub(crate) fn engine_timeout(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            PROBLEM_ENGINE_TIMEOUT,
            "engine timed out",
        )
        .with_detail(detail)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Validation { reason } => {
                Self::bad_request(reason).with_invalid_params(vec![ProblemInvalidParam {
                    pointer: "/magnet".to_string(),
                    message: reason.to_string(),
                }])
            }
            JobError::EngineNotReady => {
                Self::engine_unavailable("engine did not become ready in time")
            }
            JobError::EngineInit { failure } => {
                Self::engine_unavailable(format!("engine failed to start: {}", failure.summary))
                    .with_diagnostic(failure.detail)
            }
            JobError::NotFound { id } => Self::not_found(format!("job '{id}' not found")),
            JobError::DuplicateIdentity { id } => {
                Self::conflict(format!("job '{id}' is already registered"))
            }
            JobError::EngineBusy { operation } => {
                Self::engine_timeout(format!("engine did not answer {operation} in time"))
            }
            JobError::InternalEngine { operation, detail } => {
                Self::internal(format!("engine {operation} failed")).with_diagnostic(detail)
            }
        }
    }
}

impl From<FsOpsError> for ApiError {
    fn from(err: FsOpsError) -> Self {
        match err {
            FsOpsError::Forbidden { .. } => Self::forbidden("path escapes the download root"),
            FsOpsError::NotFound { requested } => {
                Self::not_found(format!("file '{requested}' not found"))
            }
            FsOpsError::Io {
                operation, source, ..
            } => Self::internal(format!("filesystem {operation} failed"))
                .with_diagnostic(source.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = current_request_id().unwrap_or_default();
        let route = current_route().unwrap_or_default();
        if self.status.is_server_error() {
            error!(%request_id, %route, status = self.status.as_u16(), problem = self.kind, "request failed");
        } else {
            warn!(%request_id, %route, status = self.status.as_u16(), problem = self.kind, "request rejected");
        }
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: self.invalid_params,
            diagnostic: self.diagnostic.filter(|_| self.reveal),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use lodestone_core::InitFailure;

    use super::*;

    #[test]
    fn job_errors_map_onto_status_codes() {
        let cases = [
            (JobError::Validation { reason: "no magnet link provided" }, 400),
            (JobError::EngineNotReady, 503),
            (
                JobError::EngineInit {
                    failure: InitFailure::new("bind failed", "bind failed"),
                },
                503,
            ),
            (JobError::NotFound { id: "x".to_string() }, 404),
            (JobError::DuplicateIdentity { id: "x".to_string() }, 409),
            (JobError::EngineBusy { operation: "add" }, 504),
            (
                JobError::InternalEngine {
                    operation: "pause",
                    detail: "invalid handle".to_string(),
                },
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status.as_u16(), status);
        }
    }

    #[test]
    fn fsops_errors_map_onto_status_codes() {
        let forbidden = ApiError::from(FsOpsError::Forbidden {
            requested: "../x".to_string(),
        });
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
        assert_eq!(forbidden.kind, PROBLEM_FORBIDDEN);

        let missing = ApiError::from(FsOpsError::NotFound {
            requested: "x".to_string(),
        });
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn init_detail_is_summarised_until_revealed() {
        let err = ApiError::from(JobError::EngineInit {
            failure: InitFailure::new(
                "listen failed",
                "listen failed: address in use",
            ),
        });
        assert_eq!(
            err.detail.as_deref(),
            Some("engine failed to start: listen failed")
        );
        assert!(!err.reveal);
        assert!(err.revealing(true).reveal);
    }
}
