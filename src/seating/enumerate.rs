use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::layout::{FloorInfo, Section, SeatConfig, SeatType, TheaterLayout};
use super::seat_key;

/// Конкретное адресуемое место, выведенное из геометрии зала.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPosition {
    pub row: String,
    pub seat_number: i32,
    pub section: Section,
}

impl SeatPosition {
    pub fn key(&self) -> String {
        seat_key(&self.row, self.seat_number)
    }
}

/// Перечисляет все места зала: партер, затем балкон (если включён).
/// Ленивая последовательность, каждый вызов считает заново - схема
/// остаётся единственным источником истины.
pub fn enumerate_seats(layout: &TheaterLayout) -> impl Iterator<Item = SeatPosition> + '_ {
    let balcony = if layout.has_balcony {
        layout.balcony.as_ref()
    } else {
        None
    };
    floor_seats(&layout.main_floor, Section::Main, &layout.removed_seats).chain(
        balcony
            .into_iter()
            .flat_map(|floor| floor_seats(floor, Section::Balcony, &layout.removed_seats)),
    )
}

fn floor_seats<'a>(
    floor: &'a FloorInfo,
    section: Section,
    removed: &'a BTreeSet<String>,
) -> impl Iterator<Item = SeatPosition> + 'a {
    let per_row = floor.seats_per_row.max(0);
    (0..floor.rows.max(0)).flat_map(move |row_index| {
        let label = floor.row_label(row_index as usize);
        (1..=per_row).filter_map(move |seat_number| {
            if removed.contains(&seat_key(&label, seat_number)) {
                return None;
            }
            Some(SeatPosition {
                row: label.clone(),
                seat_number,
                section,
            })
        })
    })
}

/// Запись seat_config для места, если есть.
pub fn seat_config_entry<'a>(
    seat_config: &'a [SeatConfig],
    seat: &SeatPosition,
) -> Option<&'a SeatConfig> {
    seat_config.iter().find(|c| {
        c.section == seat.section && c.row == seat.row && c.seat_number == seat.seat_number
    })
}

/// Тип места: переопределение из seat_config, затем из seat_categories,
/// иначе standard.
pub fn resolve_seat_type(
    layout: &TheaterLayout,
    seat_config: &[SeatConfig],
    seat: &SeatPosition,
) -> SeatType {
    if let Some(cfg) = seat_config_entry(seat_config, seat) {
        return cfg.seat_type;
    }
    layout
        .seat_categories
        .get(&seat.key())
        .copied()
        .unwrap_or(SeatType::Standard)
}

/// Место перечисляется, но бронировать его нельзя, если оно выключено
/// схемой, неактивно в seat_config или имеет тип disabled.
pub fn is_bookable(layout: &TheaterLayout, seat_config: &[SeatConfig], seat: &SeatPosition) -> bool {
    if layout.disabled_seats.contains(&seat.key()) {
        return false;
    }
    if let Some(cfg) = seat_config_entry(seat_config, seat) {
        if !cfg.is_active {
            return false;
        }
    }
    resolve_seat_type(layout, seat_config, seat) != SeatType::Disabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seating::layout::{Stage, StagePosition};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn floor(rows: i32, seats_per_row: i32) -> FloorInfo {
        FloorInfo {
            rows,
            seats_per_row,
            aisle_positions: vec![],
            row_labels: vec![],
        }
    }

    fn layout(rows: i32, seats_per_row: i32) -> TheaterLayout {
        TheaterLayout {
            stage: Stage {
                position: StagePosition::Top,
                width: 60,
                height: 20,
            },
            main_floor: floor(rows, seats_per_row),
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

    fn seat(row: &str, number: i32, section: Section) -> SeatPosition {
        SeatPosition {
            row: row.to_string(),
            seat_number: number,
            section,
        }
    }

    #[test]
    fn enumerates_full_grid() {
        let seats: Vec<_> = enumerate_seats(&layout(5, 10)).collect();
        assert_eq!(seats.len(), 50);
        assert_eq!(seats[0], seat("A", 1, Section::Main));
        assert_eq!(seats[49], seat("E", 10, Section::Main));
    }

    #[test]
    fn removed_seats_do_not_exist() {
        let mut l = layout(3, 4);
        l.removed_seats.insert("B2".to_string());
        let seats: Vec<_> = enumerate_seats(&l).collect();
        assert_eq!(seats.len(), 11);
        assert!(seats.iter().all(|s| s.key() != "B2"));
    }

    #[test]
    fn balcony_ignored_without_flag() {
        let mut l = layout(2, 3);
        l.balcony = Some(floor(2, 2));
        assert_eq!(enumerate_seats(&l).count(), 6);

        l.has_balcony = true;
        assert_eq!(enumerate_seats(&l).count(), 10);
        let balcony_seats = enumerate_seats(&l)
            .filter(|s| s.section == Section::Balcony)
            .count();
        assert_eq!(balcony_seats, 4);
    }

    #[test]
    fn disabled_seat_enumerates_but_is_not_bookable() {
        let mut l = layout(2, 2);
        l.disabled_seats.insert("A1".to_string());
        let seats: Vec<_> = enumerate_seats(&l).collect();
        assert_eq!(seats.len(), 4);
        assert!(!is_bookable(&l, &[], &seat("A", 1, Section::Main)));
        assert!(is_bookable(&l, &[], &seat("A", 2, Section::Main)));
    }

    #[test]
    fn inactive_config_blocks_booking() {
        let l = layout(2, 2);
        let config = vec![SeatConfig {
            row: "A".to_string(),
            seat_number: 2,
            seat_type: SeatType::Vip,
            section: Section::Main,
            is_active: false,
        }];
        assert!(!is_bookable(&l, &config, &seat("A", 2, Section::Main)));
        assert!(is_bookable(&l, &config, &seat("A", 1, Section::Main)));
    }

    #[test]
    fn seat_type_resolution_order() {
        let mut l = layout(2, 2);
        l.seat_categories.insert("A1".to_string(), SeatType::Premium);
        let config = vec![SeatConfig {
            row: "A".to_string(),
            seat_number: 1,
            seat_type: SeatType::Vip,
            section: Section::Main,
            is_active: true,
        }];
        // seat_config важнее категории из схемы
        assert_eq!(
            resolve_seat_type(&l, &config, &seat("A", 1, Section::Main)),
            SeatType::Vip
        );
        assert_eq!(
            resolve_seat_type(&l, &[], &seat("A", 1, Section::Main)),
            SeatType::Premium
        );
        assert_eq!(
            resolve_seat_type(&l, &[], &seat("A", 2, Section::Main)),
            SeatType::Standard
        );
    }

    #[test]
    fn wheelchair_seats_are_bookable() {
        let l = layout(1, 2);
        let config = vec![SeatConfig {
            row: "A".to_string(),
            seat_number: 1,
            seat_type: SeatType::Wheelchair,
            section: Section::Main,
            is_active: true,
        }];
        assert!(is_bookable(&l, &config, &seat("A", 1, Section::Main)));
    }

    proptest! {
        // Перечисление никогда не возвращает удалённые ключи, а размер
        // равен размеру сетки минус удалённые места внутри неё.
        #[test]
        fn never_yields_removed_keys(
            rows in 0i32..8,
            seats_per_row in 0i32..8,
            removed in prop::collection::btree_set((0i32..8, 1i32..9), 0..12),
        ) {
            let mut l = layout(rows, seats_per_row);
            let grid: BTreeSet<String> = (0..rows)
                .flat_map(|r| {
                    let label = l.main_floor.row_label(r as usize);
                    (1..=seats_per_row)
                        .map(move |n| seat_key(&label, n))
                })
                .collect();
            let removed_keys: BTreeSet<String> = removed
                .iter()
                .map(|(r, n)| seat_key(&l.main_floor.row_label(*r as usize), *n))
                .collect();
            l.removed_seats = removed_keys.clone();

            let produced: Vec<String> = enumerate_seats(&l).map(|s| s.key()).collect();
            prop_assert!(produced.iter().all(|k| !removed_keys.contains(k)));

            let expected = grid.len() - grid.intersection(&removed_keys).count();
            prop_assert_eq!(produced.len(), expected);
        }
    }
}
