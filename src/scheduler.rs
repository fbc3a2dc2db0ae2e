//! # Reminder Scheduler
//!
//! Background task that fires one reminder cycle per day at a fixed local
//! time. It shares the engine entry point with the administrative trigger,
//! so a timed run and a manual run behave identically and never overlap.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use metrics::counter;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::ReminderConfig;
use crate::reminders::{CycleError, ReminderService};

/// Daily trigger for [`ReminderService::run_daily_cycle`].
pub struct ReminderScheduler {
    service: Arc<ReminderService>,
    run_at: NaiveTime,
    run_on_startup: bool,
}

impl ReminderScheduler {
    pub fn new(service: Arc<ReminderService>, config: &ReminderConfig) -> Self {
        Self {
            service,
            run_at: config.run_at,
            run_on_startup: config.run_on_startup,
        }
    }

    /// Run until `shutdown` fires. An in-flight cycle is allowed to finish.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(run_at = %self.run_at, run_on_startup = self.run_on_startup, "Starting reminder scheduler");

        if self.run_on_startup {
            self.trigger().await;
        }

        loop {
            let now = Local::now();
            let next = next_run_after(&now, self.run_at);
            let wait = next
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            info!(next_run = %next.to_rfc3339(), "Next reminder cycle scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Reminder scheduler shutdown requested");
                    break;
                }
                _ = sleep(wait) => {
                    self.trigger().await;
                }
            }
        }

        info!("Reminder scheduler stopped");
    }

    async fn trigger(&self) {
        counter!("reminder_scheduler_triggers_total").increment(1);
        match self.service.run_daily_cycle().await {
            Ok(_) => {}
            Err(CycleError::AlreadyRunning) => {
                warn!("Skipping scheduled reminder cycle; another cycle is still running");
            }
            Err(err) => error!(error = %err, "Scheduled reminder cycle failed"),
        }
    }
}

/// The first instant strictly after `now` whose local wall-clock time is
/// `run_at`. A wall-clock time skipped by a DST jump resolves one hour later.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, run_at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    for _ in 0..3 {
        let local = date.and_time(run_at);
        let resolved = tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest());

        if let Some(candidate) = resolved
            && candidate > *now
        {
            return candidate;
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    now.clone() + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Timelike, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn before_run_time_fires_same_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 7, 15, 0).unwrap();
        let next = next_run_after(&now, at(9, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn at_or_after_run_time_fires_next_day() {
        let exactly = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_after(&exactly, at(9, 0)),
            Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap()
        );

        let late = Utc.with_ymd_and_hms(2025, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(
            next_run_after(&late, at(9, 0)),
            Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn run_time_is_local_to_the_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = ist.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();

        let next = next_run_after(&now, at(9, 0));

        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(next.hour(), 9);
        assert_eq!(next.offset(), &ist);
    }
}
