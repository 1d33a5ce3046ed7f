//! Broadcast Scheduler
//!
//! Fires the dispatcher once a day at a fixed local time in a fixed timezone,
//! whatever timezone the host runs in. At most one broadcast runs at a time:
//! a firing that finds the previous run still in flight is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use super::broadcast::{BroadcastDispatcher, BroadcastError, BroadcastReport};
use crate::domain::format::DEFAULT_TIMEZONE;

/// "HH:MM every day" in one timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// First firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();

        (0..=2)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter_map(|date| self.resolve(date.and_time(self.at)))
            .find(|candidate| *candidate > now)
            // Unreachable for real zones: one of three consecutive days always resolves
            .unwrap_or_else(|| now + chrono::Duration::days(1))
    }

    /// Local wall-clock time to UTC. A time skipped by a DST gap fires an hour later.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(local + chrono::Duration::hours(1)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::new(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            DEFAULT_TIMEZONE,
        )
    }
}

/// Clears the in-flight flag when the run ends, panics included
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BroadcastScheduler {
    schedule: DailySchedule,
    dispatcher: Arc<BroadcastDispatcher>,
    in_flight: Arc<AtomicBool>,
}

impl BroadcastScheduler {
    pub fn new(schedule: DailySchedule, dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self {
            schedule,
            dispatcher,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a broadcast now unless one is already in flight
    pub fn trigger(&self) -> Option<JoinHandle<Result<BroadcastReport, BroadcastError>>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Previous daily broadcast still running, skipping this firing");
            return None;
        }

        let guard = InFlight(Arc::clone(&self.in_flight));
        let dispatcher = Arc::clone(&self.dispatcher);
        Some(tokio::spawn(async move {
            let _guard = guard;
            dispatcher.run().await
        }))
    }

    /// Fire every day until the task is dropped
    pub async fn run(&self) {
        let tz = self.schedule.timezone();
        let mut last_fired: Option<DateTime<Utc>> = None;

        loop {
            // Never fire the same slot twice if the wall clock lags the timer
            let now = Utc::now();
            let from = last_fired.map_or(now, |fired| fired.max(now));
            let next = self.schedule.next_after(from);

            tracing::info!("Next daily broadcast at {}", next.with_timezone(&tz));
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            last_fired = Some(next);
            if let Some(handle) = self.trigger() {
                tokio::spawn(settle(handle));
            }
        }
    }
}

/// Wait for a firing and log how it ended
pub async fn settle(
    handle: JoinHandle<Result<BroadcastReport, BroadcastError>>,
) -> Option<BroadcastReport> {
    match handle.await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            tracing::error!("Scheduled broadcast failed: {}", e);
            None
        }
        Err(e) => {
            tracing::error!("Scheduled broadcast task crashed: {}", e);
            None
        }
    }
}
