use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::services::quiz_attempt_service::QuizAttemptService;

/// Periodically expires timed attempts that ran past their deadline.
pub fn spawn(service: Arc<QuizAttemptService>, interval_seconds: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(interval_seconds.max(1));

    tokio::spawn(async move {
        log::info!("Attempt sweeper running every {:?}", period);
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;
            match service.expire_overdue_attempts(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => log::info!("Sweeper expired {} overdue attempts", count),
                Err(e) => log::warn!("Attempt sweep failed: {}", e),
            }
        }
    })
}
