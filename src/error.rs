use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::seating::SeatingError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Seating(#[from] SeatingError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Доступ запрещён")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Ошибка БД")]
    Database(#[from] sqlx::Error),
}

// Код 419 для конфликтов бронирования: клиенту нужно перечитать схему зала
fn status_419() -> StatusCode {
    StatusCode::from_u16(419).unwrap_or(StatusCode::CONFLICT)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("database error: {:?}", e);
        }

        let status = match &self {
            ApiError::Seating(SeatingError::InvalidLayout(_))
            | ApiError::Seating(SeatingError::DuplicateSeatRequest { .. })
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Seating(SeatingError::SeatNotFound { .. }) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Seating(SeatingError::SeatAlreadyBooked { .. })
            | ApiError::Seating(SeatingError::SoldOut) => status_419(),
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Единый конверт ответа об ошибке
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
