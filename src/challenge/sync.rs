//! Client-side view of a user's progress.
//!
//! The view only ever changes by adopting the record set the authoritative
//! store returns. User intent goes out as a bare day number; a failed request
//! leaves the view exactly as it was.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::challenge::stats::derive_stats;
use crate::models::{CompletionRecord, DerivedStats, completed_days};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("progress service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Unavailable(_))
    }
}

/// Where the authoritative record set lives.
pub trait ProgressSource {
    fn fetch(&mut self) -> Result<Vec<CompletionRecord>, SyncError>;
    fn toggle(&mut self, day: u32) -> Result<Vec<CompletionRecord>, SyncError>;
}

/// Text a user must type before a day is marked complete.
pub fn confirmation_phrase(day: u32) -> String {
    format!("Day {}", day)
}

pub fn confirmation_matches(day: u32, input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(&confirmation_phrase(day))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCompletion {
    pub day: u32,
    pub expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Marking complete needs the typed phrase first.
    AwaitingConfirmation(u32),
    Applied,
    Mismatch,
    NothingPending,
}

#[derive(Debug, Default)]
pub struct ProgressView {
    records: Vec<CompletionRecord>,
    completed: BTreeSet<u32>,
    pending: Option<PendingCompletion>,
    last_error: Option<SyncError>,
}

impl ProgressView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    pub fn completed(&self) -> &BTreeSet<u32> {
        &self.completed
    }

    pub fn is_completed(&self, day: u32) -> bool {
        self.completed.contains(&day)
    }

    pub fn stats(&self, unlocked_day_count: u32) -> DerivedStats {
        derive_stats(&self.completed, unlocked_day_count)
    }

    pub fn pending(&self) -> Option<&PendingCompletion> {
        self.pending.as_ref()
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    fn adopt(&mut self, mut records: Vec<CompletionRecord>) {
        records.sort_by_key(|r| r.day);
        self.completed = completed_days(&records);
        self.records = records;
        self.last_error = None;
    }

    fn fail(&mut self, err: SyncError) -> SyncError {
        self.last_error = Some(err.clone());
        err
    }

    pub fn refresh<S: ProgressSource + ?Sized>(&mut self, source: &mut S) -> Result<(), SyncError> {
        match source.fetch() {
            Ok(records) => {
                self.adopt(records);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Completing a day opens a confirmation; un-completing is sent at once.
    pub fn request_toggle<S: ProgressSource + ?Sized>(
        &mut self,
        day: u32,
        source: &mut S,
    ) -> Result<ToggleOutcome, SyncError> {
        if self.is_completed(day) {
            self.pending = None;
            return self.send(day, source);
        }
        self.pending = Some(PendingCompletion {
            day,
            expected: confirmation_phrase(day),
        });
        Ok(ToggleOutcome::AwaitingConfirmation(day))
    }

    pub fn confirm<S: ProgressSource + ?Sized>(
        &mut self,
        input: &str,
        source: &mut S,
    ) -> Result<ToggleOutcome, SyncError> {
        let Some(pending) = &self.pending else {
            return Ok(ToggleOutcome::NothingPending);
        };
        if !confirmation_matches(pending.day, input) {
            return Ok(ToggleOutcome::Mismatch);
        }
        let day = pending.day;
        self.pending = None;
        self.send(day, source)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    fn send<S: ProgressSource + ?Sized>(
        &mut self,
        day: u32,
        source: &mut S,
    ) -> Result<ToggleOutcome, SyncError> {
        match source.toggle(day) {
            Ok(records) => {
                self.adopt(records);
                Ok(ToggleOutcome::Applied)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}
