//! theaters.rs
//!
//! Управление залами: схема зала принадлежит организатору или
//! администратору. Каждое сохранение проходит валидацию геометрии и
//! полный пересчёт агрегатов (total/vip/premium) - агрегаты нигде не
//! меняются напрямую.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::Theater;
use crate::seating::{recompute_aggregates, SeatConfig, TheaterLayout};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/theaters", get(get_theaters))
        .route("/theaters", post(create_theater))
        .route("/theaters", patch(update_theater))
}

/* ---------- helpers ---------- */

async fn load_theater(pool: &sqlx::PgPool, theater_id: i64) -> Result<Theater, ApiError> {
    sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE id = $1")
        .bind(theater_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Зал не найден".to_string()))
}

fn ensure_owner(theater: &Theater, user: &AuthUser) -> Result<(), ApiError> {
    if theater.owner_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/* ---------- THEATERS ---------- */

// GET /api/theaters
#[derive(Debug, Deserialize)]
struct TheatersQuery {
    id: Option<i64>,
}

async fn get_theaters(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<TheatersQuery>,
) -> Result<Response, ApiError> {
    if !user.can_manage() {
        return Err(ApiError::Forbidden);
    }

    if let Some(id) = params.id {
        let theater = load_theater(&state.db.pool, id).await?;
        ensure_owner(&theater, &user)?;
        return Ok(Json(json!({"success": true, "theater": theater})).into_response());
    }

    // Администратор видит все залы, организатор - только свои
    let theaters = if user.is_admin() {
        sqlx::query_as::<_, Theater>("SELECT * FROM theaters ORDER BY id")
            .fetch_all(&state.db.pool)
            .await?
    } else {
        sqlx::query_as::<_, Theater>("SELECT * FROM theaters WHERE owner_id = $1 ORDER BY id")
            .bind(user.user_id)
            .fetch_all(&state.db.pool)
            .await?
    };

    Ok(Json(json!({
        "success": true,
        "theaters": theaters,
        "count": theaters.len()
    }))
    .into_response())
}

// POST /api/theaters
#[derive(Debug, Deserialize)]
struct CreateTheaterRequest {
    name: String,
    address: Option<String>,
    layout: TheaterLayout,
    #[serde(default)]
    seat_config: Vec<SeatConfig>,
}

async fn create_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTheaterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.can_manage() {
        return Err(ApiError::Forbidden);
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Название зала не может быть пустым".to_string()));
    }

    // Валидация геометрии и пересчёт агрегатов перед сохранением
    req.layout.validate()?;
    let agg = recompute_aggregates(&req.layout, &req.seat_config);

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO theaters (owner_id, name, address, layout, seat_config,
                               total_seats, vip_seats, premium_seats)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id",
    )
    .bind(user.user_id)
    .bind(&req.name)
    .bind(&req.address)
    .bind(sqlx::types::Json(&req.layout))
    .bind(sqlx::types::Json(&req.seat_config))
    .bind(agg.total_seats)
    .bind(agg.vip_seats)
    .bind(agg.premium_seats)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "id": id, "total_seats": agg.total_seats})),
    ))
}

// PATCH /api/theaters
#[derive(Debug, Deserialize)]
struct UpdateTheaterRequest {
    id: i64,
    name: Option<String>,
    address: Option<String>,
    layout: Option<TheaterLayout>,
    seat_config: Option<Vec<SeatConfig>>,
}

async fn update_theater(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateTheaterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.id <= 0 {
        return Err(ApiError::BadRequest("id должен быть > 0".to_string()));
    }

    let theater = load_theater(&state.db.pool, req.id).await?;
    ensure_owner(&theater, &user)?;

    let layout = req.layout.unwrap_or(theater.layout.0);
    let seat_config = req.seat_config.unwrap_or(theater.seat_config.0);

    // Агрегаты пересчитываются при каждом сохранении схемы или seat_config
    layout.validate()?;
    let agg = recompute_aggregates(&layout, &seat_config);

    sqlx::query(
        "UPDATE theaters
         SET name = COALESCE($2, name),
             address = COALESCE($3, address),
             layout = $4,
             seat_config = $5,
             total_seats = $6,
             vip_seats = $7,
             premium_seats = $8,
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(req.id)
    .bind(&req.name)
    .bind(&req.address)
    .bind(sqlx::types::Json(&layout))
    .bind(sqlx::types::Json(&seat_config))
    .bind(agg.total_seats)
    .bind(agg.vip_seats)
    .bind(agg.premium_seats)
    .execute(&state.db.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "total_seats": agg.total_seats,
        "vip_seats": agg.vip_seats,
        "premium_seats": agg.premium_seats
    })))
}
