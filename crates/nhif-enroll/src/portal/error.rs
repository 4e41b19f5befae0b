use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::store::StoreError;

/// Error taxonomy for every portal operation. Each failed precondition aborts
/// the operation before any mutation; the gateway maps the variant to an HTTP
/// status and a JSON error body.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("email already exists")]
    EmailTaken,
    #[error("student information already submitted")]
    AlreadySubmitted,
    #[error("this value already exists")]
    AlreadyExists,
    #[error("cannot delete this course as it is being used by students")]
    InUse,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no token provided")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("admin access required")]
    PermissionDenied,
    #[error("no pending students to export")]
    NoPendingRecords,
    #[error("no new students to export")]
    NoNewRecords,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl PortalError {
    /// Wrap a store failure that has no more specific domain meaning at the
    /// call site.
    pub fn storage(err: StoreError) -> Self {
        PortalError::Storage(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // An empty all-pending run is a bad request; an empty incremental
            // run reports that there is nothing new to fetch.
            PortalError::Validation(_) | PortalError::NoPendingRecords => {
                StatusCode::BAD_REQUEST
            }
            PortalError::MissingToken
            | PortalError::InvalidToken
            | PortalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            PortalError::PermissionDenied => StatusCode::FORBIDDEN,
            PortalError::NotFound(_) | PortalError::NoNewRecords => StatusCode::NOT_FOUND,
            PortalError::EmailTaken
            | PortalError::AlreadySubmitted
            | PortalError::AlreadyExists
            | PortalError::InUse => StatusCode::CONFLICT,
            PortalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "portal operation failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            PortalError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PortalError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(PortalError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            PortalError::NoPendingRecords.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PortalError::NoNewRecords.status(), StatusCode::NOT_FOUND);
        assert_eq!(PortalError::AlreadySubmitted.status(), StatusCode::CONFLICT);
        assert_eq!(PortalError::InUse.status(), StatusCode::CONFLICT);
        assert_eq!(
            PortalError::Storage("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
