pub mod calendar;
pub mod clock;
pub mod dataset;
pub mod stats;
pub mod sync;

pub use calendar::{activity_from_records, build_calendar_grid};
pub use clock::{TOTAL_DAYS, UnlockClock};
pub use dataset::{ChallengeDataset, DayFilter};
pub use stats::derive_stats;
