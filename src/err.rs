use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failures raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    Pool(#[from] r2d2::Error),

    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// No row matched an id-scoped read or mutation. Carries the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Errors surfaced at the route boundary, one variant per response class.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}: {error}")]
    Storage { message: String, error: String },
}

impl ServerError {
    pub fn validation(message: &str) -> Self {
        ServerError::Validation(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ServerError::Validation(message) => {
                tracing::debug!("Rejected request: {}", message);
                ErrorBody {
                    message,
                    error: None,
                }
            }
            ServerError::NotFound(message) => ErrorBody {
                message,
                error: None,
            },
            ServerError::Storage { message, error } => {
                tracing::error!("Server error: {}: {}", message, error);
                ErrorBody {
                    message,
                    error: Some(error),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Attaches the failed action to a storage result.
///
/// `DbError::NotFound` becomes a 404 naming the entity; every other storage
/// failure becomes a 500 whose `message` is `action` and whose `error` is the
/// driver message.
pub trait StorageContext<T> {
    fn context(self, action: &str) -> Result<T, ServerError>;
}

impl<T> StorageContext<T> for Result<T, DbError> {
    fn context(self, action: &str) -> Result<T, ServerError> {
        self.map_err(|err| match err {
            DbError::NotFound(entity) => ServerError::NotFound(format!("{} not found", entity)),
            other => ServerError::Storage {
                message: action.to_string(),
                error: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_not_found_maps_to_404() {
        let result: Result<(), DbError> = Err(DbError::NotFound("User"));
        let err = result.context("Error retrieving user").unwrap_err();
        assert_eq!(err, ServerError::NotFound("User not found".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_driver_error_maps_to_500_with_action() {
        let result: Result<(), DbError> = Err(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        let err = result.context("Error adding user").unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ServerError::Storage { message, error } => {
                assert_eq!(message, "Error adding user");
                assert!(!error.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_body_has_no_error_field() {
        let response = ServerError::validation("Name and age are required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Name and age are required" }));
    }

    #[tokio::test]
    async fn test_storage_body_carries_driver_message() {
        let response = ServerError::Storage {
            message: "Error retrieving users".to_string(),
            error: "disk I/O error".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Error retrieving users");
        assert_eq!(body["error"], "disk I/O error");
    }
}
