//! Error types for the Observer API.
//!
//! Domain errors from the core are classified through [`ErrorKind`] and
//! mapped to HTTP status codes, so every handler can simply use `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frontline_routes::RouteError;
use frontline_territory::TerritoryError;
use frontline_types::{Classify, ErrorKind};

/// Errors that can occur while serving Observer API requests.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A core component rejected the request.
    #[error("{message}")]
    Core {
        /// Classification of the underlying failure.
        kind: ErrorKind,
        /// Rendered error message.
        message: String,
    },

    /// A path segment or query parameter could not be interpreted.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ObserverError {
    fn core<E: Classify + core::fmt::Display>(err: &E) -> Self {
        Self::Core {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core { kind, .. } => status_for(*kind),
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP status for a classified core failure.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::CapacityExceeded | ErrorKind::NoViablePath => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<TerritoryError> for ObserverError {
    fn from(err: TerritoryError) -> Self {
        Self::core(&err)
    }
}

impl From<RouteError> for ObserverError {
    fn from(err: RouteError) -> Self {
        Self::core(&err)
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use frontline_types::TerritoryId;

    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::CapacityExceeded),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::NoViablePath),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn territory_errors_keep_their_message() {
        let err = ObserverError::from(TerritoryError::TerritoryNotFound(TerritoryId(9)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "territory not found: 9");
    }
}
