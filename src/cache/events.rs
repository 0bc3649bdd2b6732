use crate::cache::CacheService;
use chrono::NaiveDateTime;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Краткая карточка события для афиши
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub datetime_start: NaiveDateTime,
}

impl CacheService {
    // Получить ближайшие одобренные события
    pub async fn get_upcoming_events(&self) -> Vec<EventSummary> {
        // Сначала пробуем кеш
        if let Ok(events) = self.get_events_from_cache().await {
            return events;
        }

        // Если кеш не работает - идем в БД
        if let Ok(events) = self.load_events_from_db().await {
            let _ = self.save_events_to_cache(&events).await;
            return events;
        }

        vec![]
    }

    async fn load_events_from_db(&self) -> Result<Vec<EventSummary>, sqlx::Error> {
        self.db
            .retry_read(|| async {
                sqlx::query_as::<_, EventSummary>(
                    "SELECT id, title, datetime_start
                     FROM events
                     WHERE is_approved = true AND datetime_start > NOW()
                     ORDER BY datetime_start",
                )
                .fetch_all(&self.db.pool)
                .await
            })
            .await
    }

    // === Работа с кешем ===
    async fn get_events_from_cache(&self) -> Result<Vec<EventSummary>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get("events:upcoming").await?;
        let events: Vec<EventSummary> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(events)
    }

    async fn save_events_to_cache(&self, events: &[EventSummary]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(events).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex("events:upcoming", data, 3600).await // 1 час
    }
}
