use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::auth::AuthKeys;
use super::error::AppError;
use crate::challenge::{ChallengeDataset, UnlockClock};
use crate::config::AppConfig;
use crate::db::{Database, StoreError};
use crate::practice::ActivitySource;

pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub clock: UnlockClock,
    pub dataset: Arc<ChallengeDataset>,
    pub practice: Arc<dyn ActivitySource>,
    pub keys: AuthKeys,
    pub now: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: AppConfig,
        dataset: Arc<ChallengeDataset>,
        practice: Arc<dyn ActivitySource>,
    ) -> anyhow::Result<Self> {
        let clock = UnlockClock::from_config(&config.challenge)?;
        let keys = AuthKeys::from_config(&config.server);
        Ok(Self {
            db,
            config,
            clock,
            dataset,
            practice,
            keys,
            now: Utc::now,
        })
    }

    pub fn unlocked_day_count(&self) -> u32 {
        self.clock.unlocked_day_count((self.now)())
    }

    /// Run store work off the async executor.
    pub async fn store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
    }
}
