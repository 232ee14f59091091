use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("slot {date} {time} is already taken")]
    SlotTaken { date: String, time: String },

    #[error("requested time has already passed")]
    PastTime,

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("data unavailable: {0}")]
    UnavailableData(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    /// Stable machine-readable label for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::SlotTaken { .. } => "slot_taken",
            AppError::PastTime => "past_time",
            AppError::AlreadyCancelled(_) => "already_cancelled",
            AppError::UnavailableData(_) | AppError::Database(_) => "unavailable_data",
            AppError::Config(_) => "config_error",
            AppError::Unauthorized => "unauthorized",
        }
    }

    /// Folds raw store failures into `UnavailableData`; other kinds pass through.
    pub fn into_unavailable(self) -> Self {
        match self {
            AppError::Database(e) => AppError::UnavailableData(e.to_string()),
            other => other,
        }
    }

    /// Whether repeating the same request may succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::UnavailableData(_) | AppError::Database(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotTaken { .. } => StatusCode::CONFLICT,
            AppError::PastTime => StatusCode::CONFLICT,
            AppError::AlreadyCancelled(_) => StatusCode::CONFLICT,
            AppError::UnavailableData(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "retryable": self.is_retryable(),
        });
        (status, axum::Json(body)).into_response()
    }
}
