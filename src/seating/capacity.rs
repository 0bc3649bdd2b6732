use serde::Serialize;

use super::layout::{SeatConfig, SeatType, TheaterLayout};

/// Кешируемые агрегаты зала. Хранятся рядом со схемой, но никогда не
/// меняются напрямую - только полным пересчётом при сохранении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatAggregates {
    pub total_seats: i32,
    pub vip_seats: i32,
    pub premium_seats: i32,
}

/// Пересчитывает агрегаты с нуля из текущей схемы и seat_config.
/// Вызывается каждым путём записи театра и события; инкрементального
/// обновления нет, seat_config между сохранениями меняется произвольно.
pub fn recompute_aggregates(layout: &TheaterLayout, seat_config: &[SeatConfig]) -> SeatAggregates {
    let main = grid_size(layout.main_floor.rows, layout.main_floor.seats_per_row);
    let balcony = if layout.has_balcony {
        layout
            .balcony
            .as_ref()
            .map(|b| grid_size(b.rows, b.seats_per_row))
            .unwrap_or(0)
    } else {
        0
    };

    let disabled = seat_config
        .iter()
        .filter(|c| !c.is_active || c.seat_type == SeatType::Disabled)
        .count() as i32;

    SeatAggregates {
        total_seats: (main + balcony - disabled).max(0),
        vip_seats: count_active(seat_config, SeatType::Vip),
        premium_seats: count_active(seat_config, SeatType::Premium),
    }
}

fn grid_size(rows: i32, seats_per_row: i32) -> i32 {
    rows.max(0) * seats_per_row.max(0)
}

fn count_active(seat_config: &[SeatConfig], seat_type: SeatType) -> i32 {
    seat_config
        .iter()
        .filter(|c| c.is_active && c.seat_type == seat_type)
        .count() as i32
}
