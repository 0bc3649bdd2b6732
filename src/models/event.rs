use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::seating::{BookedSeat, SeatConfig, SeatPricing, TheaterLayout};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub organizer_id: i32,
    pub theater_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub datetime_start: NaiveDateTime,
    pub is_approved: bool,
    // Копии схемы и seat_config театра на момент создания события.
    // Дальше живут независимо: правки театра сюда не попадают.
    pub layout: Option<Json<TheaterLayout>>,
    pub seat_config: Option<Json<Vec<SeatConfig>>>,
    pub seat_pricing: Option<Json<SeatPricing>>,
    pub booked_seats: Json<Vec<BookedSeat>>,
    pub total_seats: i32,
    pub vip_seats: i32,
    pub premium_seats: i32,
    pub remaining_tickets: i32,
    pub created_at: NaiveDateTime,
}

impl Event {
    pub fn has_seating(&self) -> bool {
        self.layout.is_some()
    }
}
