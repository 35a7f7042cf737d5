use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub activity_count: u32,
    pub level: u8,
    /// False for the padding cells that only exist to fill whole weeks.
    pub in_range: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLabel {
    pub label: String,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGrid {
    pub cells: Vec<CalendarCell>,
    pub months: Vec<MonthLabel>,
}

impl CalendarGrid {
    /// Cells grouped into week columns, Sunday first.
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(7)
    }

    pub fn total_in_range(&self) -> u32 {
        self.cells
            .iter()
            .filter(|c| c.in_range)
            .map(|c| c.activity_count)
            .sum()
    }

    pub fn active_days(&self) -> u32 {
        self.cells
            .iter()
            .filter(|c| c.in_range && c.activity_count > 0)
            .count() as u32
    }
}
