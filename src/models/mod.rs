pub mod activity;
pub mod calendar;
pub mod challenge;
pub mod progress;
pub mod stats;
pub mod user;

pub use activity::{ActivityCalendar, ActivityMap, Badge, PracticeProfile, SubmissionCount};
pub use calendar::{CalendarCell, CalendarGrid, MonthLabel};
pub use challenge::{DayDescriptor, DayStatus, DayView, Solution};
pub use progress::{CompletionRecord, ProgressResponse, completed_days};
pub use stats::DerivedStats;
pub use user::{NewUser, User};
