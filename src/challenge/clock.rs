use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::config::ChallengeConfig;
use crate::models::DayStatus;

pub const TOTAL_DAYS: u32 = 100;

/// Decides which challenge days are open at a given instant.
///
/// Day 1 opens at `start_date` + `unlock_time`; every following day opens at
/// `unlock_time` on the next local date. All arithmetic happens on the local
/// wall clock of the configured fixed offset.
#[derive(Debug, Clone)]
pub struct UnlockClock {
    pub start_date: NaiveDate,
    pub unlock_time: NaiveTime,
    pub offset: FixedOffset,
}

impl UnlockClock {
    pub fn new(start_date: NaiveDate, unlock_time: NaiveTime, offset_minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", offset_minutes))?;
        Ok(Self {
            start_date,
            unlock_time,
            offset,
        })
    }

    pub fn from_config(config: &ChallengeConfig) -> Result<Self> {
        Self::new(config.start_date, config.unlock_time, config.timezone_offset)
    }

    fn local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    fn start_local(&self) -> NaiveDateTime {
        self.start_date.and_time(self.unlock_time)
    }

    fn to_instant(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.offset.from_local_datetime(&local).single()
    }

    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        self.to_instant(self.start_local())
    }

    /// Number of days open at `now`, in `0..=TOTAL_DAYS`. The start instant
    /// itself opens day 1; only instants strictly before it count as 0.
    pub fn unlocked_day_count(&self, now: DateTime<Utc>) -> u32 {
        let local_now = self.local(now);
        if local_now < self.start_local() {
            return 0;
        }

        let today = local_now.date();
        // Whole local days since the start date; rolls over at local midnight.
        let elapsed = (today - self.start_date).num_days().max(0);
        let todays_unlock = today.and_time(self.unlock_time);

        let count = if local_now >= todays_unlock {
            elapsed + 1
        } else {
            elapsed
        };
        count.min(TOTAL_DAYS as i64) as u32
    }

    /// The next instant at which another day opens, `None` once all are open.
    pub fn next_unlock(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        if self.unlocked_day_count(now) >= TOTAL_DAYS {
            return None;
        }
        let local_now = self.local(now);
        let start = self.start_local();
        if local_now < start {
            return self.to_instant(start);
        }
        let todays_unlock = local_now.date().and_time(self.unlock_time);
        let next = if local_now < todays_unlock {
            todays_unlock
        } else {
            todays_unlock + Duration::days(1)
        };
        self.to_instant(next)
    }

    pub fn seconds_until_next_unlock(&self, now: DateTime<Utc>) -> Option<i64> {
        self.next_unlock(now)
            .map(|next| (next.with_timezone(&Utc) - now).num_seconds())
    }

    pub fn day_status(&self, day: u32, now: DateTime<Utc>) -> DayStatus {
        let unlocked = self.unlocked_day_count(now);
        if day > unlocked {
            DayStatus::Locked
        } else if day == unlocked {
            DayStatus::Today
        } else {
            DayStatus::Unlocked
        }
    }
}
