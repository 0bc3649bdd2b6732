use crate::cache::CacheService;
use crate::models::Event;
use crate::seating::{
    enumerate_seats, is_bookable, resolve_seat_type, SeatConfig, SeatPricing, SeatType, Section,
};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

// Одно место на карте зала глазами клиента
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatMapEntry {
    pub row: String,
    pub seat_number: i32,
    pub section: Section,
    pub seat_type: SeatType,
    pub price: f64,
    pub status: String, // FREE | BOOKED | DISABLED
}

/// Собирает карту мест события из его схемы, seat_config и занятых мест.
/// Чистая функция: перечисление заново на каждый вызов, схема события -
/// единственный источник истины.
pub fn seat_map_for(event: &Event) -> Vec<SeatMapEntry> {
    let layout = match event.layout {
        Some(ref json) => &json.0,
        None => return vec![],
    };
    let empty_config: Vec<SeatConfig> = vec![];
    let seat_config = event
        .seat_config
        .as_ref()
        .map(|json| json.0.as_slice())
        .unwrap_or(&empty_config);
    let default_pricing = SeatPricing::new();
    let pricing = event
        .seat_pricing
        .as_ref()
        .map(|json| &json.0)
        .unwrap_or(&default_pricing);

    let occupied: BTreeSet<(Section, String)> = event
        .booked_seats
        .0
        .iter()
        .map(|b| (b.section, b.key()))
        .collect();

    enumerate_seats(layout)
        .map(|seat| {
            let seat_type = resolve_seat_type(layout, seat_config, &seat);
            let status = if occupied.contains(&(seat.section, seat.key())) {
                "BOOKED"
            } else if !is_bookable(layout, seat_config, &seat) {
                "DISABLED"
            } else {
                "FREE"
            };
            SeatMapEntry {
                price: crate::seating::allocator::price_for(pricing, seat_type),
                row: seat.row,
                seat_number: seat.seat_number,
                section: seat.section,
                seat_type,
                status: status.to_string(),
            }
        })
        .collect()
}

impl CacheService {
    // Получить карту мест события
    pub async fn get_seat_map(&self, event_id: i64) -> Vec<SeatMapEntry> {
        // Сначала пробуем кеш
        if let Ok(seats) = self.get_seat_map_from_cache(event_id).await {
            return seats;
        }

        // Если кеш не работает - строим из БД
        if let Ok(seats) = self.build_seat_map(event_id).await {
            let _ = self.save_seat_map_to_cache(event_id, &seats).await;
            return seats;
        }

        vec![]
    }

    // Инвалидировать карту мест после изменения брони или схемы
    pub async fn invalidate_seats(&self, event_id: i64) {
        let key = format!("seatmap:{}", event_id);
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(&key).await;
        info!("Invalidated seat map cache for event {}", event_id);
    }

    async fn build_seat_map(&self, event_id: i64) -> Result<Vec<SeatMapEntry>, sqlx::Error> {
        let event = self
            .db
            .retry_read(|| async {
                sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
                    .bind(event_id)
                    .fetch_one(&self.db.pool)
                    .await
            })
            .await?;
        Ok(seat_map_for(&event))
    }

    async fn get_seat_map_from_cache(
        &self,
        event_id: i64,
    ) -> Result<Vec<SeatMapEntry>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(format!("seatmap:{}", event_id)).await?;
        let seats: Vec<SeatMapEntry> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(seats)
    }

    async fn save_seat_map_to_cache(
        &self,
        event_id: i64,
        seats: &[SeatMapEntry],
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(seats).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(format!("seatmap:{}", event_id), data, 86400).await // 24 часа
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::{BookedSeat, FloorInfo, Stage, StagePosition, TheaterLayout};
    use chrono::NaiveDateTime;
    use sqlx::types::Json;
    use std::collections::BTreeMap;

    fn event_with_layout() -> Event {
        let layout = TheaterLayout {
            stage: Stage {
                position: StagePosition::Top,
                width: 40,
                height: 10,
            },
            main_floor: FloorInfo {
                rows: 2,
                seats_per_row: 2,
                aisle_positions: vec![],
                row_labels: vec![],
            },
            has_balcony: false,
            balcony: None,
            removed_seats: BTreeSet::new(),
            disabled_seats: BTreeSet::from(["B2".to_string()]),
            h_corridors: BTreeMap::new(),
            v_corridors: BTreeMap::new(),
            seat_categories: BTreeMap::new(),
            labels: vec![],
        };
        let mut pricing = SeatPricing::new();
        pricing.insert(SeatType::Standard, 120.0);

        Event {
            id: 1,
            organizer_id: 1,
            theater_id: Some(1),
            title: "Премьера".to_string(),
            description: None,
            datetime_start: NaiveDateTime::default(),
            is_approved: true,
            layout: Some(Json(layout)),
            seat_config: None,
            seat_pricing: Some(Json(pricing)),
            booked_seats: Json(vec![BookedSeat {
                row: "A".to_string(),
                seat_number: 1,
                section: Section::Main,
                booking_id: 5,
            }]),
            total_seats: 4,
            vip_seats: 0,
            premium_seats: 0,
            remaining_tickets: 3,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn map_reflects_bookings_and_disabled_seats() {
        let map = seat_map_for(&event_with_layout());
        assert_eq!(map.len(), 4);

        let by_key = |key: &str| map.iter().find(|s| format!("{}{}", s.row, s.seat_number) == key).unwrap();
        assert_eq!(by_key("A1").status, "BOOKED");
        assert_eq!(by_key("A2").status, "FREE");
        assert_eq!(by_key("B2").status, "DISABLED");
        assert_eq!(by_key("A2").price, 120.0);
    }

    #[test]
    fn event_without_layout_has_empty_map() {
        let mut event = event_with_layout();
        event.layout = None;
        assert!(seat_map_for(&event).is_empty());
    }
}
