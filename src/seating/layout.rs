use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use validator::Validate;

use super::SeatingError;

// Положение сцены - чисто описательное поле схемы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePosition {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Stage {
    pub position: StagePosition,
    #[validate(range(min = 20, max = 100))]
    pub width: i32,
    #[validate(range(min = 5, max = 40))]
    pub height: i32,
}

// Прямоугольная сетка мест: партер или балкон
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FloorInfo {
    #[validate(range(min = 0))]
    pub rows: i32,
    #[validate(range(min = 0))]
    pub seats_per_row: i32,
    // Индексы мест, после которых идет проход (визуальный разрыв сетки)
    #[serde(default)]
    pub aisle_positions: Vec<i32>,
    // Явные метки рядов; если короче rows - остаток генерируется
    #[serde(default)]
    pub row_labels: Vec<String>,
}

impl FloorInfo {
    /// Метка ряда по индексу: явная, если задана, иначе сгенерированная.
    pub fn row_label(&self, index: usize) -> String {
        match self.row_labels.get(index) {
            Some(label) => label.clone(),
            None => nth_row_label(index, ""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    Standard,
    Vip,
    Premium,
    Wheelchair,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Main,
    Balcony,
}

// Одна запись на место с нестандартным типом или выключенное место
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatConfig {
    pub row: String,
    pub seat_number: i32,
    pub seat_type: SeatType,
    pub section: Section,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// Свободная текстовая аннотация на схеме (вход, сцена, гардероб)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutLabel {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheaterLayout {
    pub stage: Stage,
    pub main_floor: FloorInfo,
    #[serde(default)]
    pub has_balcony: bool,
    // Игнорируется, пока has_balcony == false, даже если заполнен
    #[serde(default)]
    pub balcony: Option<FloorInfo>,
    // Удалённые места не существуют: не перечисляются и не считаются
    #[serde(default)]
    pub removed_seats: BTreeSet<String>,
    // Выключенные места существуют, но недоступны для брони
    #[serde(default)]
    pub disabled_seats: BTreeSet<String>,
    // Горизонтальные/вертикальные коридоры: индекс -> ширина разрыва
    #[serde(default)]
    pub h_corridors: BTreeMap<i32, i32>,
    #[serde(default)]
    pub v_corridors: BTreeMap<i32, i32>,
    // Переопределение категории по ключу места
    #[serde(default)]
    pub seat_categories: BTreeMap<String, SeatType>,
    #[serde(default)]
    pub labels: Vec<LayoutLabel>,
}

impl TheaterLayout {
    /// Проверяет геометрию зала. Балкон валидируется только при has_balcony.
    pub fn validate(&self) -> Result<(), SeatingError> {
        check(self.stage.validate(), "stage")?;
        check(self.main_floor.validate(), "main_floor")?;
        if self.has_balcony {
            if let Some(ref balcony) = self.balcony {
                check(balcony.validate(), "balcony")?;
            }
        }
        Ok(())
    }
}

fn check(result: Result<(), validator::ValidationErrors>, part: &str) -> Result<(), SeatingError> {
    result.map_err(|e| SeatingError::InvalidLayout(format!("{}: {}", part, e)))
}

/// Генерирует `count` меток рядов: индексы 0..26 дают `A`..`Z`,
/// дальше `R27`, `R28` и так далее. Чистая детерминированная функция.
pub fn generate_row_labels(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| nth_row_label(i, prefix)).collect()
}

fn nth_row_label(index: usize, prefix: &str) -> String {
    if index < 26 {
        format!("{}{}", prefix, (b'A' + index as u8) as char)
    } else {
        format!("{}R{}", prefix, index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        Stage {
            position: StagePosition::Top,
            width: 60,
            height: 20,
        }
    }

    fn floor(rows: i32, seats_per_row: i32) -> FloorInfo {
        FloorInfo {
            rows,
            seats_per_row,
            aisle_positions: vec![],
            row_labels: vec![],
        }
    }

    fn layout() -> TheaterLayout {
        TheaterLayout {
            stage: stage(),
            main_floor: floor(5, 10),
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

    #[test]
    fn valid_layout_passes() {
        assert!(layout().validate().is_ok());
    }

    #[test]
    fn stage_width_out_of_range_is_rejected() {
        let mut l = layout();
        l.stage.width = 19;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
        l.stage.width = 101;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
    }

    #[test]
    fn stage_height_out_of_range_is_rejected() {
        let mut l = layout();
        l.stage.height = 4;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
        l.stage.height = 41;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
    }

    #[test]
    fn negative_rows_are_rejected() {
        let mut l = layout();
        l.main_floor.rows = -1;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
    }

    #[test]
    fn balcony_checked_only_when_enabled() {
        let mut l = layout();
        // Невалидный балкон при выключенном флаге не мешает
        l.balcony = Some(floor(-3, 10));
        assert!(l.validate().is_ok());

        l.has_balcony = true;
        assert!(matches!(l.validate(), Err(SeatingError::InvalidLayout(_))));
    }

    #[test]
    fn row_labels_wrap_after_z() {
        let labels = generate_row_labels(30, "");
        assert_eq!(labels[0], "A");
        assert_eq!(labels[25], "Z");
        assert_eq!(labels[26], "R27");
        assert_eq!(labels[29], "R30");
    }

    #[test]
    fn row_labels_respect_prefix() {
        let labels = generate_row_labels(27, "B");
        assert_eq!(labels[0], "BA");
        assert_eq!(labels[26], "BR27");
    }

    #[test]
    fn explicit_labels_win_over_generated() {
        let mut f = floor(3, 4);
        f.row_labels = vec!["P1".to_string()];
        assert_eq!(f.row_label(0), "P1");
        assert_eq!(f.row_label(1), "B");
    }
}
