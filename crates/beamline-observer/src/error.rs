//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beamline_core::simulation::{CommandError, ObservationError};

use crate::metrics::MetricsError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The request body is missing, not JSON, or out of range.
    #[error("malformed observation: {0}")]
    MalformedObservation(String),

    /// The request does not apply in the core's operating mode.
    #[error("{0}")]
    ModeConflict(String),

    /// The metrics registry could not be exported.
    #[error("metrics export failed: {0}")]
    Export(#[from] MetricsError),
}

impl From<CommandError> for ObserverError {
    fn from(err: CommandError) -> Self {
        Self::ModeConflict(err.to_string())
    }
}

impl From<ObservationError> for ObserverError {
    fn from(err: ObservationError) -> Self {
        match err {
            ObservationError::WrongMode { .. } => Self::ModeConflict(err.to_string()),
            ObservationError::UnknownStatus { .. } | ObservationError::InvalidSpeed { .. } => {
                Self::MalformedObservation(err.to_string())
            }
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MalformedObservation(_) => StatusCode::BAD_REQUEST,
            Self::ModeConflict(_) => StatusCode::CONFLICT,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beamline_types::OperatingMode;

    use super::*;

    #[test]
    fn wrong_mode_is_conflict() {
        let err = ObserverError::from(ObservationError::WrongMode {
            mode: OperatingMode::Simulator,
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

        let err = ObserverError::from(CommandError::WrongMode {
            mode: OperatingMode::Recorder,
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_payload_is_bad_request() {
        let err = ObserverError::from(ObservationError::UnknownStatus { status: 7 });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ObserverError::from(ObservationError::InvalidSpeed { speed: -1.0 });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn export_failure_is_server_error() {
        let source = String::from_utf8(vec![0xff]).unwrap_err();
        let err = ObserverError::from(MetricsError::from(source));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
