use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::seating::{SeatConfig, TheaterLayout};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Theater {
    pub id: i64,
    pub owner_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub layout: Json<TheaterLayout>,
    pub seat_config: Json<Vec<SeatConfig>>,
    // Кешируемые агрегаты, пересчитываются при каждом сохранении
    pub total_seats: i32,
    pub vip_seats: i32,
    pub premium_seats: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
