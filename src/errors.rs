//! # Listing errors
//!
//! Malformed filter, sort or paging input never produces an error: it degrades to
//! defaults. The only failures a listing can report are the store failing and the
//! caller cancelling the request.
//!
//! Store details are logged through `tracing` when the error is rendered and never
//! reach the client:
//!
//! ```rust,ignore
//! async fn list_courses(
//!     State(db): State<DatabaseConnection>,
//!     Query(params): Query<RequestParams>,
//! ) -> Result<Json<Page<CourseListing>>, FilterError> {
//!     Ok(Json(filter_courses(&db, &params, None, None).await?))
//! }
//! ```

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

#[derive(Debug)]
pub enum FilterError {
    /// 500 Internal Server Error. The store failed; details are logged only.
    QueryFailed {
        /// Internal error (logged, not sent to the client)
        internal: DbErr,
    },

    /// 503 Service Unavailable. The cancellation token fired before the store
    /// answered.
    Cancelled,
}

impl FilterError {
    pub fn query_failed(err: DbErr) -> Self {
        Self::QueryFailed { internal: err }
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::QueryFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Sanitized message, safe to send to clients.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::QueryFailed { .. } => "Query execution failed",
            Self::Cancelled => "Query cancelled",
        }
    }

    /// The store error behind a failure, for callers that log or inspect it.
    #[must_use]
    pub const fn internal(&self) -> Option<&DbErr> {
        match self {
            Self::QueryFailed { internal } => Some(internal),
            Self::Cancelled => None,
        }
    }

    fn log_internal(&self) {
        match self {
            Self::QueryFailed { internal } => {
                tracing::error!(error = ?internal, "list query failed");
            }
            Self::Cancelled => {
                tracing::debug!(status = %self.status_code(), "list query cancelled");
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        self.log_internal();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.internal().map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Every `DbErr` is a query failure, `RecordNotFound` included: an empty listing
/// is not an error.
impl From<DbErr> for FilterError {
    fn from(err: DbErr) -> Self {
        Self::query_failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_query_failed() {
        let err = FilterError::query_failed(DbErr::Custom("no such table: courses".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Query execution failed");
        assert!(err.internal().is_some());
    }

    #[test]
    fn test_cancelled() {
        let err = FilterError::Cancelled;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.user_message(), "Query cancelled");
        assert!(err.internal().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_every_dberr_becomes_query_failed() {
        let cases = vec![
            DbErr::RecordNotFound("Course".into()),
            DbErr::Type("bad type".into()),
            DbErr::Conn(sea_orm::RuntimeErr::Internal("gone".into())),
        ];
        for db_err in cases {
            let err: FilterError = db_err.into();
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_display_hides_internal_details() {
        let err = FilterError::from(DbErr::Custom("password=hunter2".into()));
        assert_eq!(err.to_string(), "Query execution failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_into_response_status() {
        let response = FilterError::Cancelled.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = FilterError::from(DbErr::Custom("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
