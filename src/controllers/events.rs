use axum::{
    body::Body,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::cache::search::search_key;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{Event, Theater};
use crate::seating::{recompute_aggregates, SeatConfig, SeatPricing};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(search_events))
        .route("/events", post(create_event))
        .route("/events/approve", patch(approve_event))
        .route("/events/seatConfig", patch(update_seat_config))
}

/* ---------- helpers ---------- */

async fn load_event(pool: &sqlx::PgPool, event_id: i64) -> Result<Event, ApiError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Событие не найдено".to_string()))
}

/* ---------- SEARCH ---------- */

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub query: Option<String>,
    pub date: Option<String>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct EventResponse {
    pub id: i64,
    pub title: String,
    pub datetime_start: NaiveDateTime,
}

// GET /api/events - поиск по афише одобренных событий
pub async fn search_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Response {
    let query_val = params.query.as_deref().unwrap_or_default();
    let date_val = params.date.as_deref().unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 20);

    // 1. Уникальный ключ кеша на основе параметров запроса
    let cache_key = search_key(query_val, date_val, page, page_size);

    // 2. Пытаемся получить результат из кеша
    if let Ok(Some(cached_json)) = state.cache.get_cached_search(&cache_key).await {
        return Response::builder()
            .header("Content-Type", "application/json")
            .header("X-Cache", "HIT")
            .body(Body::from(cached_json))
            .unwrap();
    }

    // 3. Cache Miss: идем в базу данных
    let day = params
        .date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

    let limit = page_size as i64;
    let offset = ((page - 1) * page_size) as i64;

    let mut sql = String::from(
        "SELECT id, title, datetime_start FROM events
         WHERE is_approved = true AND datetime_start > NOW()",
    );
    let mut bind_idx = 1;
    if !query_val.is_empty() {
        sql.push_str(&format!(" AND title ILIKE ${}", bind_idx));
        bind_idx += 1;
    }
    if day.is_some() {
        sql.push_str(&format!(
            " AND datetime_start >= ${} AND datetime_start < ${} + interval '1 day'",
            bind_idx,
            bind_idx
        ));
        bind_idx += 1;
    }
    sql.push_str(&format!(
        " ORDER BY datetime_start LIMIT ${} OFFSET ${}",
        bind_idx,
        bind_idx + 1
    ));

    let mut dbq = sqlx::query_as::<_, EventResponse>(&sql);
    if !query_val.is_empty() {
        dbq = dbq.bind(format!("%{}%", query_val));
    }
    if let Some(d) = day {
        dbq = dbq.bind(d.and_hms_opt(0, 0, 0).unwrap_or_default());
    }

    let search_result = dbq.bind(limit).bind(offset).fetch_all(&state.db.pool).await;

    let response_json = match search_result {
        Ok(events) => {
            json!({
                "success": true,
                "events": events,
                "count": events.len()
            })
        }
        Err(e) => {
            tracing::error!("Failed to search events: {:?}", e);
            return Json(json!({
                "success": false,
                "error": "Не удалось получить список событий"
            }))
            .into_response();
        }
    };

    // 4. Сериализуем и сохраняем результат в кеш
    if let Ok(json_str) = serde_json::to_string(&response_json) {
        if let Err(e) = state.cache.cache_search_result(&cache_key, &json_str, 3600).await {
            tracing::error!("Failed to cache search result: {:?}", e);
        }

        return Response::builder()
            .header("Content-Type", "application/json")
            .header("X-Cache", "MISS")
            .body(Body::from(json_str))
            .unwrap();
    }

    // Fallback в случае ошибки сериализации
    Json(response_json).into_response()
}

/* ---------- EVENTS ---------- */

// POST /api/events
#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    title: String,
    description: Option<String>,
    datetime_start: NaiveDateTime,
    theater_id: Option<i64>,
    seat_pricing: Option<SeatPricing>,
    number_of_tickets: Option<i32>,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.can_manage() {
        return Err(ApiError::Forbidden);
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Название события не может быть пустым".to_string()));
    }

    let id = match req.theater_id {
        Some(theater_id) => {
            // Событие с рассадкой: копируем схему и seat_config зала.
            // Копия делается один раз - дальнейшие правки зала на событие
            // не влияют.
            let theater =
                sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE id = $1")
                    .bind(theater_id)
                    .fetch_optional(&state.db.pool)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Зал не найден".to_string()))?;

            let pricing = req.seat_pricing.ok_or_else(|| {
                ApiError::BadRequest(
                    "Для события с рассадкой нужно указать seat_pricing".to_string(),
                )
            })?;

            let agg = recompute_aggregates(&theater.layout.0, &theater.seat_config.0);

            sqlx::query_scalar::<_, i64>(
                "INSERT INTO events (organizer_id, theater_id, title, description,
                                     datetime_start, layout, seat_config, seat_pricing,
                                     total_seats, vip_seats, premium_seats, remaining_tickets)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 RETURNING id",
            )
            .bind(user.user_id)
            .bind(theater_id)
            .bind(&req.title)
            .bind(&req.description)
            .bind(req.datetime_start)
            .bind(&theater.layout)
            .bind(&theater.seat_config)
            .bind(sqlx::types::Json(&pricing))
            .bind(agg.total_seats)
            .bind(agg.vip_seats)
            .bind(agg.premium_seats)
            .bind(agg.total_seats)
            .fetch_one(&state.db.pool)
            .await?
        }
        None => {
            // Событие без рассадки: только счётчик билетов
            let tickets = req.number_of_tickets.unwrap_or(0);
            if tickets <= 0 {
                return Err(ApiError::BadRequest(
                    "number_of_tickets должен быть > 0".to_string(),
                ));
            }

            sqlx::query_scalar::<_, i64>(
                "INSERT INTO events (organizer_id, title, description, datetime_start,
                                     remaining_tickets)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(user.user_id)
            .bind(&req.title)
            .bind(&req.description)
            .bind(req.datetime_start)
            .bind(tickets)
            .fetch_one(&state.db.pool)
            .await?
        }
    };

    Ok((StatusCode::CREATED, Json(json!({"success": true, "id": id}))))
}

// PATCH /api/events/approve
#[derive(Debug, Deserialize)]
struct ApproveEventRequest {
    event_id: i64,
    #[serde(default = "default_approved")]
    approved: bool,
}

fn default_approved() -> bool {
    true
}

async fn approve_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ApproveEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let updated = sqlx::query("UPDATE events SET is_approved = $2 WHERE id = $1")
        .bind(req.event_id)
        .bind(req.approved)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(ApiError::NotFound("Событие не найдено".to_string()));
    }

    Ok(Json(json!({"success": true, "approved": req.approved})))
}

// PATCH /api/events/seatConfig
#[derive(Debug, Deserialize)]
struct UpdateSeatConfigRequest {
    event_id: i64,
    seat_config: Vec<SeatConfig>,
    seat_pricing: Option<SeatPricing>,
}

async fn update_seat_config(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateSeatConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = load_event(&state.db.pool, req.event_id).await?;
    if event.organizer_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    // seat_config события - независимая копия, правится отдельно от зала
    let layout = match event.layout {
        Some(ref json) => &json.0,
        None => {
            return Err(ApiError::BadRequest(
                "У события нет схемы зала".to_string(),
            ))
        }
    };

    let agg = recompute_aggregates(layout, &req.seat_config);

    // remaining_tickets пересчитывается от нового total за вычетом уже
    // занятых мест, не опускаясь ниже нуля
    sqlx::query(
        "UPDATE events
         SET seat_config = $2,
             seat_pricing = COALESCE($3, seat_pricing),
             total_seats = $4,
             vip_seats = $5,
             premium_seats = $6,
             remaining_tickets = GREATEST(0, $4 - jsonb_array_length(booked_seats))
         WHERE id = $1",
    )
    .bind(req.event_id)
    .bind(sqlx::types::Json(&req.seat_config))
    .bind(req.seat_pricing.as_ref().map(sqlx::types::Json))
    .bind(agg.total_seats)
    .bind(agg.vip_seats)
    .bind(agg.premium_seats)
    .execute(&state.db.pool)
    .await?;

    // Карта мест изменилась
    state.cache.invalidate_seats(req.event_id).await;

    Ok(Json(json!({
        "success": true,
        "total_seats": agg.total_seats,
        "vip_seats": agg.vip_seats,
        "premium_seats": agg.premium_seats
    })))
}
