//! seating
//!
//! Модуль схемы зала и рассадки. Вся логика здесь чистая (без БД и сети),
//! контроллеры вызывают её внутри своих транзакций.
//!
//! Ключевые компоненты:
//! 1.  **layout**: геометрия зала (партер, балкон, сцена, проходы) и её валидация.
//! 2.  **enumerate**: перечисление конкретных мест из геометрии.
//! 3.  **capacity**: пересчёт агрегатов (total/vip/premium) при каждом сохранении.
//! 4.  **allocator**: выдача и освобождение мест без двойного бронирования.

use thiserror::Error;

pub mod allocator;
pub mod capacity;
pub mod enumerate;
pub mod layout;

pub use allocator::{
    allocate, release, Allocation, BookedSeat, EventSeating, Release, SeatPricing, SelectedSeat,
};
pub use capacity::{recompute_aggregates, SeatAggregates};
pub use enumerate::{enumerate_seats, is_bookable, resolve_seat_type, SeatPosition};
pub use layout::{
    generate_row_labels, FloorInfo, Section, SeatConfig, SeatType, Stage, StagePosition,
    TheaterLayout,
};

/// Ключ места: `"{row}{seatNumber}"`, например `"C12"`.
/// Один и тот же формат используется в схеме зала, событии и брони.
pub fn seat_key(row: &str, seat_number: i32) -> String {
    format!("{}{}", row, seat_number)
}

#[derive(Debug, Error, PartialEq)]
pub enum SeatingError {
    #[error("Некорректная схема зала: {0}")]
    InvalidLayout(String),

    #[error("Место {seat} не существует или недоступно")]
    SeatNotFound { seat: String },

    #[error("Место {seat} уже занято")]
    SeatAlreadyBooked { seat: String },

    #[error("Место {seat} указано в запросе дважды")]
    DuplicateSeatRequest { seat: String },

    #[error("Билеты распроданы")]
    SoldOut,
}
