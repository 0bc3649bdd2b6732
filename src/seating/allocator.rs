//! allocator.rs
//!
//! Выдача и освобождение мест. Единственный компонент с реальным риском
//! корректности: два бронирования не должны получить одно и то же место
//! одного события.
//!
//! Функции здесь чистые: они смотрят на согласованный снимок события и
//! строят новое состояние. Атомарность обеспечивает вызывающая сторона -
//! контроллер бронирований держит строку события под `SELECT ... FOR UPDATE`
//! в одной транзакции, так что проверка занятости и дозапись видят один
//! снимок и сериализуются по событию. Неудачная запись откатывает
//! транзакцию целиком: booked_seats не бывает дописан частично.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::enumerate::{enumerate_seats, is_bookable, resolve_seat_type, SeatPosition};
use super::layout::{Section, SeatConfig, SeatType, TheaterLayout};
use super::SeatingError;

/// Цены по типам мест; снимок берётся в момент бронирования.
pub type SeatPricing = BTreeMap<SeatType, f64>;

/// Занятое место события. Пара (section, ключ) уникальна в пределах события.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub row: String,
    pub seat_number: i32,
    pub section: Section,
    pub booking_id: i64,
}

impl BookedSeat {
    pub fn key(&self) -> String {
        super::seat_key(&self.row, self.seat_number)
    }
}

/// Неизменяемая запись о купленном месте внутри брони.
/// Цена зафиксирована из seat_pricing события и позже не пересчитывается.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSeat {
    pub row: String,
    pub seat_number: i32,
    pub section: Section,
    pub seat_type: SeatType,
    pub price: f64,
}

/// Снимок события, над которым работает аллокатор.
pub struct EventSeating<'a> {
    pub layout: &'a TheaterLayout,
    pub seat_config: &'a [SeatConfig],
    pub pricing: &'a SeatPricing,
    pub booked_seats: &'a [BookedSeat],
    pub remaining_tickets: i32,
}

/// Результат успешной выдачи мест.
#[derive(Debug, PartialEq)]
pub struct Allocation {
    /// Новые записи для дозаписи в Event.booked_seats.
    pub appended: Vec<BookedSeat>,
    /// Снимок для Booking.selected_seats.
    pub selected: Vec<SelectedSeat>,
    /// Новое значение remaining_tickets.
    pub remaining_tickets: i32,
}

/// Проверяет запрошенные места и строит результат выдачи.
///
/// Порядок проверок фиксирован:
/// (a) каждое место существует в перечислимом наборе события и доступно;
/// (b) ни одно не занято другой бронью;
/// (c) в самом запросе нет дубликатов;
/// затем remaining_tickets не должен уйти в минус.
pub fn allocate(
    seating: &EventSeating,
    requested: &[SeatPosition],
    booking_id: i64,
) -> Result<Allocation, SeatingError> {
    let enumerable: BTreeSet<(Section, String)> = enumerate_seats(seating.layout)
        .map(|s| (s.section, s.key()))
        .collect();

    for seat in requested {
        if !enumerable.contains(&(seat.section, seat.key()))
            || !is_bookable(seating.layout, seating.seat_config, seat)
        {
            return Err(SeatingError::SeatNotFound { seat: seat.key() });
        }
    }

    let occupied: BTreeSet<(Section, String)> = seating
        .booked_seats
        .iter()
        .map(|b| (b.section, b.key()))
        .collect();

    for seat in requested {
        if occupied.contains(&(seat.section, seat.key())) {
            return Err(SeatingError::SeatAlreadyBooked { seat: seat.key() });
        }
    }

    let mut seen = BTreeSet::new();
    for seat in requested {
        if !seen.insert((seat.section, seat.key())) {
            return Err(SeatingError::DuplicateSeatRequest { seat: seat.key() });
        }
    }

    let remaining_tickets = seating.remaining_tickets - requested.len() as i32;
    if remaining_tickets < 0 {
        return Err(SeatingError::SoldOut);
    }

    let mut appended = Vec::with_capacity(requested.len());
    let mut selected = Vec::with_capacity(requested.len());
    for seat in requested {
        let seat_type = resolve_seat_type(seating.layout, seating.seat_config, seat);
        appended.push(BookedSeat {
            row: seat.row.clone(),
            seat_number: seat.seat_number,
            section: seat.section,
            booking_id,
        });
        selected.push(SelectedSeat {
            row: seat.row.clone(),
            seat_number: seat.seat_number,
            section: seat.section,
            seat_type,
            price: price_for(seating.pricing, seat_type),
        });
    }

    Ok(Allocation {
        appended,
        selected,
        remaining_tickets,
    })
}

/// Цена места данного типа: явная, иначе standard, иначе ноль.
pub fn price_for(pricing: &SeatPricing, seat_type: SeatType) -> f64 {
    pricing
        .get(&seat_type)
        .or_else(|| pricing.get(&SeatType::Standard))
        .copied()
        .unwrap_or(0.0)
}

/// Результат освобождения мест брони.
#[derive(Debug)]
pub struct Release {
    /// Оставшиеся записи booked_seats события.
    pub retained: Vec<BookedSeat>,
    /// Восстановленное значение remaining_tickets.
    pub remaining_tickets: i32,
    /// Сколько мест было освобождено.
    pub freed: usize,
}

/// Убирает из booked_seats все записи с данным booking_id и возвращает
/// столько же билетов в remaining_tickets. Идемпотентна: повторное
/// освобождение ничего не находит и ничего не меняет.
pub fn release(booked_seats: &[BookedSeat], booking_id: i64, remaining_tickets: i32) -> Release {
    let (freed, retained): (Vec<BookedSeat>, Vec<BookedSeat>) = booked_seats
        .iter()
        .cloned()
        .partition(|b| b.booking_id == booking_id);

    Release {
        retained,
        remaining_tickets: remaining_tickets + freed.len() as i32,
        freed: freed.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::layout::{FloorInfo, Stage, StagePosition};

    fn layout(rows: i32, seats_per_row: i32) -> TheaterLayout {
        TheaterLayout {
            stage: Stage {
                position: StagePosition::Top,
                width: 40,
                height: 10,
            },
            main_floor: FloorInfo {
                rows,
                seats_per_row,
                aisle_positions: vec![],
                row_labels: vec![],
            },
            has_balcony: false,
            balcony: None,
            removed_seats: BTreeSet::new(),
            disabled_seats: BTreeSet::new(),
            h_corridors: BTreeMap::new(),
            v_corridors: BTreeMap::new(),
            seat_categories: BTreeMap::new(),
            labels: vec![],
        }
    }

    fn pricing() -> SeatPricing {
        let mut p = SeatPricing::new();
        p.insert(SeatType::Standard, 100.0);
        p.insert(SeatType::Vip, 250.0);
        p
    }

    fn seat(row: &str, number: i32) -> SeatPosition {
        SeatPosition {
            row: row.to_string(),
            seat_number: number,
            section: Section::Main,
        }
    }

    fn seating<'a>(
        layout: &'a TheaterLayout,
        seat_config: &'a [SeatConfig],
        pricing: &'a SeatPricing,
        booked: &'a [BookedSeat],
        remaining: i32,
    ) -> EventSeating<'a> {
        EventSeating {
            layout,
            seat_config,
            pricing,
            booked_seats: booked,
            remaining_tickets: remaining,
        }
    }

    #[test]
    fn allocates_and_snapshots_prices() {
        let l = layout(3, 4);
        let config = vec![SeatConfig {
            row: "A".to_string(),
            seat_number: 1,
            seat_type: SeatType::Vip,
            section: Section::Main,
            is_active: true,
        }];
        let p = pricing();
        let s = seating(&l, &config, &p, &[], 12);

        let allocation = allocate(&s, &[seat("A", 1), seat("A", 2)], 7).unwrap();
        assert_eq!(allocation.remaining_tickets, 10);
        assert_eq!(allocation.appended.len(), 2);
        assert!(allocation.appended.iter().all(|b| b.booking_id == 7));
        assert_eq!(allocation.selected[0].seat_type, SeatType::Vip);
        assert_eq!(allocation.selected[0].price, 250.0);
        assert_eq!(allocation.selected[1].seat_type, SeatType::Standard);
        assert_eq!(allocation.selected[1].price, 100.0);
    }

    #[test]
    fn unknown_seat_is_not_found() {
        let l = layout(2, 2);
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 4);
        assert_eq!(
            allocate(&s, &[seat("Z", 9)], 1),
            Err(SeatingError::SeatNotFound {
                seat: "Z9".to_string()
            })
        );
    }

    #[test]
    fn disabled_seat_is_not_found() {
        let mut l = layout(2, 2);
        l.disabled_seats.insert("A1".to_string());
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 4);
        assert_eq!(
            allocate(&s, &[seat("A", 1)], 1),
            Err(SeatingError::SeatNotFound {
                seat: "A1".to_string()
            })
        );
    }

    #[test]
    fn conflict_reports_the_specific_seat() {
        let l = layout(2, 2);
        let p = pricing();
        let booked = vec![BookedSeat {
            row: "A".to_string(),
            seat_number: 1,
            section: Section::Main,
            booking_id: 1,
        }];
        let s = seating(&l, &[], &p, &booked, 3);
        assert_eq!(
            allocate(&s, &[seat("A", 2), seat("A", 1)], 2),
            Err(SeatingError::SeatAlreadyBooked {
                seat: "A1".to_string()
            })
        );
    }

    #[test]
    fn duplicate_request_is_rejected() {
        let l = layout(2, 2);
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 4);
        assert_eq!(
            allocate(&s, &[seat("A", 1), seat("A", 1)], 1),
            Err(SeatingError::DuplicateSeatRequest {
                seat: "A1".to_string()
            })
        );
    }

    #[test]
    fn occupancy_is_checked_before_duplicates() {
        let l = layout(2, 2);
        let p = pricing();
        let booked = vec![BookedSeat {
            row: "A".to_string(),
            seat_number: 1,
            section: Section::Main,
            booking_id: 1,
        }];
        let s = seating(&l, &[], &p, &booked, 4);
        // Продублированное место, к тому же занятое: побеждает конфликт занятости
        assert_eq!(
            allocate(&s, &[seat("A", 1), seat("A", 1)], 2),
            Err(SeatingError::SeatAlreadyBooked {
                seat: "A1".to_string()
            })
        );
    }

    #[test]
    fn sold_out_when_remaining_would_go_negative() {
        let l = layout(2, 2);
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 1);
        assert_eq!(
            allocate(&s, &[seat("A", 1), seat("A", 2)], 1),
            Err(SeatingError::SoldOut)
        );
    }

    #[test]
    fn same_key_in_other_section_does_not_conflict() {
        let mut l = layout(2, 2);
        l.has_balcony = true;
        l.balcony = Some(FloorInfo {
            rows: 1,
            seats_per_row: 2,
            aisle_positions: vec![],
            row_labels: vec![],
        });
        let p = pricing();
        let booked = vec![BookedSeat {
            row: "A".to_string(),
            seat_number: 1,
            section: Section::Main,
            booking_id: 1,
        }];
        let s = seating(&l, &[], &p, &booked, 5);

        let balcony_seat = SeatPosition {
            row: "A".to_string(),
            seat_number: 1,
            section: Section::Balcony,
        };
        assert!(allocate(&s, &[balcony_seat], 2).is_ok());
    }

    #[test]
    fn two_overlapping_allocations_cannot_both_pass() {
        let l = layout(2, 2);
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 4);

        // Первый снимок: место свободно
        let first = allocate(&s, &[seat("A", 1)], 1).unwrap();

        // Второй вызов видит состояние после первой записи (контроллер
        // сериализует это блокировкой строки события)
        let s2 = seating(&l, &[], &p, &first.appended, first.remaining_tickets);
        assert_eq!(
            allocate(&s2, &[seat("A", 1)], 2),
            Err(SeatingError::SeatAlreadyBooked {
                seat: "A1".to_string()
            })
        );
        let occurrences = first
            .appended
            .iter()
            .filter(|b| b.key() == "A1")
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn release_restores_tickets_and_is_idempotent() {
        let l = layout(2, 2);
        let p = pricing();
        let s = seating(&l, &[], &p, &[], 4);
        let allocation = allocate(&s, &[seat("A", 1), seat("B", 2)], 9).unwrap();
        assert_eq!(allocation.remaining_tickets, 2);

        let released = release(&allocation.appended, 9, allocation.remaining_tickets);
        assert_eq!(released.freed, 2);
        assert_eq!(released.remaining_tickets, 4);
        assert!(released.retained.is_empty());

        // Повторное освобождение - no-op
        let again = release(&released.retained, 9, released.remaining_tickets);
        assert_eq!(again.freed, 0);
        assert_eq!(again.remaining_tickets, 4);
    }

    #[test]
    fn release_touches_only_matching_booking() {
        let booked = vec![
            BookedSeat {
                row: "A".to_string(),
                seat_number: 1,
                section: Section::Main,
                booking_id: 1,
            },
            BookedSeat {
                row: "A".to_string(),
                seat_number: 2,
                section: Section::Main,
                booking_id: 2,
            },
        ];
        let released = release(&booked, 1, 0);
        assert_eq!(released.freed, 1);
        assert_eq!(released.retained.len(), 1);
        assert_eq!(released.retained[0].booking_id, 2);
    }
}
