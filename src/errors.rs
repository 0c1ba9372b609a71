use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures talking to the document backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("diary document not found")]
    NotFound,

    #[error("remote storage rejected the credentials")]
    Unauthorized,

    #[error("writing requires an access token")]
    MissingToken,

    #[error("diary document changed since revision {expected:?} was read")]
    StaleRevision { expected: Option<String> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("remote storage returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("malformed diary document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid document encoding: {0}")]
    Encoding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(err) => match err {
                StoreError::NotFound => StatusCode::NOT_FOUND,
                StoreError::StaleRevision { .. } => StatusCode::CONFLICT,
                StoreError::Unauthorized
                | StoreError::MissingToken
                | StoreError::Network(_)
                | StoreError::Remote { .. } => StatusCode::BAD_GATEWAY,
                StoreError::Malformed(_) | StoreError::Encoding(_) | StoreError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Store(StoreError::StaleRevision { .. }) => {
                tracing::warn!(error = %self, "conditional write rejected");
            }
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "request failed");
            }
            _ => {}
        }

        let body = json!({
            "error": {
                "message": self.to_string(),
                "code": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
