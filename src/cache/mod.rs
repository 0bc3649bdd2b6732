use crate::{database::Database, redis_client::RedisClient};
use tracing::info;

pub mod events;
pub mod search;
pub mod seats;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database) -> Self {
        Self { redis, db }
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        // Загружаем афишу ближайших событий
        let events = self.get_upcoming_events().await;
        info!("Loaded {} upcoming events", events.len());

        // Загружаем карты мест для ближайших событий
        for event in events.iter().take(5) {
            let _ = self.get_seat_map(event.id).await;
        }

        info!("Cache warmup done");
    }
}
