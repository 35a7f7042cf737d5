use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::models::{ActivityMap, CalendarCell, CalendarGrid, CompletionRecord, MonthLabel};

/// 53 full weeks.
pub const GRID_DAYS: usize = 371;
/// Length of the window that counts as in range, ending on the last day.
pub const WINDOW_DAYS: i64 = 365;

/// Five-step intensity used for heatmap shading.
pub fn activity_level(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        _ => 4,
    }
}

/// Key used by activity maps: UTC midnight of `date` in epoch seconds.
pub fn epoch_day(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Lay `activity` out over the trailing year ending at `window_end`.
///
/// The grid starts on the Sunday on or before `window_end - 364 days` and
/// always holds `GRID_DAYS` cells, so the padding on either side of the real
/// window is marked `in_range = false`.
pub fn build_calendar_grid(activity: &ActivityMap, window_end: NaiveDate) -> CalendarGrid {
    let true_start = window_end - Duration::days(WINDOW_DAYS - 1);
    let grid_start =
        true_start - Duration::days(true_start.weekday().num_days_from_sunday() as i64);

    let mut cells = Vec::with_capacity(GRID_DAYS);
    let mut months = Vec::new();

    for (i, date) in grid_start.iter_days().take(GRID_DAYS).enumerate() {
        let activity_count = activity.get(&epoch_day(date)).copied().unwrap_or(0);
        cells.push(CalendarCell {
            date,
            activity_count,
            level: activity_level(activity_count),
            in_range: date >= true_start && date <= window_end,
        });

        if date.day() == 1 {
            months.push(MonthLabel {
                label: date.format("%b").to_string(),
                column: i / 7,
            });
        }
    }

    CalendarGrid { cells, months }
}

/// Challenge completions bucketed by the UTC day they were recorded on.
pub fn activity_from_records(records: &[CompletionRecord]) -> ActivityMap {
    let mut map = ActivityMap::new();
    for record in records {
        *map.entry(epoch_day(record.completed_at.date_naive()))
            .or_insert(0) += 1;
    }
    map
}
