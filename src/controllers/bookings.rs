//! bookings.rs
//!
//! Бронирования и карта мест. Выдача мест - единственное место, где
//! конкурирующие запросы трогают общее состояние события, поэтому
//! весь цикл "прочитать - проверить - дописать" выполняется в одной
//! транзакции под `SELECT ... FOR UPDATE` на строке события. Две
//! одновременные брони одного места сериализуются блокировкой, и
//! вторая получает `SeatAlreadyBooked` от свежего снимка. Неудачная
//! запись откатывает транзакцию целиком, частичной дозаписи
//! booked_seats не бывает; запись выдачи вслепую не повторяется.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{Booking, Event};
use crate::seating::{allocate, release, EventSeating, SeatPosition, SeatPricing, SeatingError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats", get(get_seats))
        .route("/bookings", get(get_user_bookings))
        .route("/bookings", post(create_booking))
        .route("/bookings/cancel", patch(cancel_booking))
}

/* ---------- helpers ---------- */

async fn lock_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: i64,
) -> Result<Event, ApiError> {
    // Блокировка строки события на время выдачи или освобождения мест
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Событие не найдено".to_string()))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    event_id: i64,
    seats: Option<Vec<SeatPosition>>,
    number_of_tickets: Option<i32>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.event_id <= 0 {
        return Err(ApiError::BadRequest("event_id должен быть > 0".to_string()));
    }

    let mut tx = state.db.pool.begin().await?;
    let event = lock_event(&mut tx, req.event_id).await?;
    if !event.is_approved {
        return Err(ApiError::NotFound("Событие не найдено".to_string()));
    }

    let response = match event.layout {
        Some(ref layout_json) => {
            // Событие с рассадкой: места обязательны
            let requested = match req.seats {
                Some(ref seats) if !seats.is_empty() => seats.as_slice(),
                _ => {
                    return Err(ApiError::BadRequest(
                        "Нужно выбрать хотя бы одно место".to_string(),
                    ))
                }
            };

            let empty_config = vec![];
            let default_pricing = SeatPricing::new();
            let seating = EventSeating {
                layout: &layout_json.0,
                seat_config: event
                    .seat_config
                    .as_ref()
                    .map(|json| json.0.as_slice())
                    .unwrap_or(&empty_config),
                pricing: event
                    .seat_pricing
                    .as_ref()
                    .map(|json| &json.0)
                    .unwrap_or(&default_pricing),
                booked_seats: &event.booked_seats.0,
                remaining_tickets: event.remaining_tickets,
            };

            let booking_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO bookings (event_id, user_id, status, number_of_tickets)
                 VALUES ($1, $2, 'confirmed', $3)
                 RETURNING id",
            )
            .bind(req.event_id)
            .bind(user.user_id)
            .bind(requested.len() as i32)
            .fetch_one(&mut *tx)
            .await?;

            // Чистая проверка и построение нового состояния; ошибка
            // откатывает транзакцию вместе со вставленной бронью
            let allocation = allocate(&seating, requested, booking_id)?;

            let mut booked = event.booked_seats.0.clone();
            booked.extend(allocation.appended.iter().cloned());

            sqlx::query(
                "UPDATE events SET booked_seats = $2, remaining_tickets = $3 WHERE id = $1",
            )
            .bind(req.event_id)
            .bind(sqlx::types::Json(&booked))
            .bind(allocation.remaining_tickets)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE bookings SET selected_seats = $2 WHERE id = $1")
                .bind(booking_id)
                .bind(sqlx::types::Json(&allocation.selected))
                .execute(&mut *tx)
                .await?;

            json!({
                "success": true,
                "id": booking_id,
                "seats": allocation.selected,
                "remaining_tickets": allocation.remaining_tickets
            })
        }
        None => {
            // Событие без рассадки: только счётчик билетов
            let tickets = req.number_of_tickets.unwrap_or(0);
            if tickets <= 0 {
                return Err(ApiError::BadRequest(
                    "number_of_tickets должен быть > 0".to_string(),
                ));
            }
            if event.remaining_tickets < tickets {
                return Err(SeatingError::SoldOut.into());
            }

            let booking_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO bookings (event_id, user_id, status, number_of_tickets)
                 VALUES ($1, $2, 'confirmed', $3)
                 RETURNING id",
            )
            .bind(req.event_id)
            .bind(user.user_id)
            .bind(tickets)
            .fetch_one(&mut *tx)
            .await?;

            // Условный UPDATE как второй заслон от ухода в минус
            let updated = sqlx::query(
                "UPDATE events
                 SET remaining_tickets = remaining_tickets - $2
                 WHERE id = $1 AND remaining_tickets >= $2",
            )
            .bind(req.event_id)
            .bind(tickets)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                return Err(SeatingError::SoldOut.into());
            }

            json!({
                "success": true,
                "id": booking_id,
                "remaining_tickets": event.remaining_tickets - tickets
            })
        }
    };

    tx.commit().await?;
    state.cache.invalidate_seats(req.event_id).await;

    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<_> = bookings
        .iter()
        .map(|b| {
            json!({
                "id": b.id,
                "event_id": b.event_id,
                "status": b.status,
                "number_of_tickets": b.number_of_tickets,
                "seats": b.selected_seats.0
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "bookings": payload,
        "count": payload.len()
    })))
}

// PATCH /api/bookings/cancel
#[derive(Debug, Deserialize)]
struct CancelBookingRequest {
    booking_id: i64,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CancelBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.booking_id <= 0 {
        return Err(ApiError::BadRequest("booking_id должен быть > 0".to_string()));
    }

    let mut tx = state.db.pool.begin().await?;

    let booking =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(req.booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Бронирование не найдено".to_string()))?;

    if booking.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden);
    }

    // Повторная отмена - no-op, а не ошибка
    if booking.status == "cancelled" {
        return Ok(Json(json!({
            "success": true,
            "message": "Бронь уже отменена"
        })));
    }

    let event = lock_event(&mut tx, booking.event_id).await?;

    let (booked, remaining, freed) = if event.layout.is_some() {
        let released = release(&event.booked_seats.0, booking.id, event.remaining_tickets);
        (released.retained, released.remaining_tickets, released.freed)
    } else {
        // Событие без рассадки: возвращаем билеты по счётчику
        (
            event.booked_seats.0.clone(),
            event.remaining_tickets + booking.number_of_tickets,
            booking.number_of_tickets as usize,
        )
    };

    sqlx::query("UPDATE events SET booked_seats = $2, remaining_tickets = $3 WHERE id = $1")
        .bind(booking.event_id)
        .bind(sqlx::types::Json(&booked))
        .bind(remaining)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE bookings SET status = 'cancelled' WHERE id = $1")
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    state.cache.invalidate_seats(booking.event_id).await;

    Ok(Json(json!({
        "success": true,
        "message": "Бронь успешно отменена",
        "freed_seats": freed
    })))
}

/* ---------- SEATS ---------- */

#[derive(Debug, Deserialize)]
struct SeatsQuery {
    event_id: i64,
    page: Option<u32>,
    #[serde(rename = "pageSize")]
    page_size: Option<u32>,
    row: Option<String>,
    status: Option<String>, // FREE, BOOKED, DISABLED
}

// GET /api/seats - карта мест события
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if params.event_id <= 0 {
        return Err(ApiError::BadRequest("event_id должен быть > 0".to_string()));
    }
    if let Some(ref st) = params.status {
        let ok = matches!(st.as_str(), "FREE" | "BOOKED" | "DISABLED");
        if !ok {
            return Err(ApiError::BadRequest(
                "status должен быть FREE | BOOKED | DISABLED".to_string(),
            ));
        }
    }

    let page = params.page.unwrap_or(1).max(1) as usize;
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100) as usize;

    // Карта строится из схемы события (кеш поверх)
    let seat_map = state.cache.get_seat_map(params.event_id).await;

    let filtered: Vec<_> = seat_map
        .into_iter()
        .filter(|s| params.row.as_ref().map_or(true, |r| &s.row == r))
        .filter(|s| params.status.as_ref().map_or(true, |st| &s.status == st))
        .collect();

    let total = filtered.len();
    let seats: Vec<_> = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Json(json!({
        "success": true,
        "seats": seats,
        "count": total
    })))
}
