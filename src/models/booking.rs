use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::seating::SelectedSeat;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i32,
    pub status: String,
    pub number_of_tickets: i32,
    // Создаётся вместе с бронью и больше не меняется;
    // отмена освобождает места целиком
    pub selected_seats: Json<Vec<SelectedSeat>>,
    pub created_at: NaiveDateTime,
}
