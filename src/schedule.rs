//! Re-fetch timing aligned to the upstream publication cadence.
//!
//! Export files are named after their 14-digit UTC timestamp and the next one
//! appears a fixed lag later. At most one re-fetch timer is ever pending.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ScheduleConfig;

/// Sent when a scheduled re-fetch is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// When the next file should exist and how long to wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    pub next_update: DateTime<Utc>,
    pub delay: Duration,
}

/// Timestamp embedded in an archive URL or file name, e.g.
/// `.../20240101120000.translation.export.CSV.zip`.
pub fn archive_timestamp(url: &str) -> Option<DateTime<Utc>> {
    let file_name = url.rsplit('/').next()?;
    let stamp = file_name.split('.').next()?;
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|t| t.and_utc())
}

pub fn next_update_time(file_time: DateTime<Utc>, config: &ScheduleConfig) -> DateTime<Utc> {
    file_time + chrono::Duration::minutes(config.publish_lag_minutes)
}

/// Wait until `next_update` plus the grace period. Once `next_update` has
/// passed the fixed retry delay is used instead.
pub fn delay_until(next_update: DateTime<Utc>, now: DateTime<Utc>, config: &ScheduleConfig) -> Duration {
    let retry = Duration::from_secs(config.retry_seconds);
    if next_update <= now {
        return retry;
    }
    (next_update - now + chrono::Duration::seconds(config.grace_seconds))
        .to_std()
        .unwrap_or(retry)
}

pub fn plan(file_time: DateTime<Utc>, now: DateTime<Utc>, config: &ScheduleConfig) -> UpdatePlan {
    let next_update = next_update_time(file_time, config);
    UpdatePlan {
        next_update,
        delay: delay_until(next_update, now, config),
    }
}

/// Owns the single pending re-fetch timer.
pub struct UpdateScheduler {
    pending: Option<JoinHandle<()>>,
    ticks: flume::Sender<Tick>,
}

impl UpdateScheduler {
    pub fn new() -> (Self, flume::Receiver<Tick>) {
        let (ticks, rx) = flume::unbounded();
        (
            Self {
                pending: None,
                ticks,
            },
            rx,
        )
    }

    /// Arm the timer, replacing any timer still pending.
    pub fn schedule(&mut self, delay: Duration) {
        self.cancel();
        debug!(delay_secs = delay.as_secs(), "re-fetch scheduled");
        let ticks = self.ticks.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // receiver gone means the app is shutting down
            let _ = ticks.send(Tick);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_archive_timestamp() {
        assert_eq!(
            archive_timestamp("http://data.gdeltproject.org/gdeltv2/20240101120000.translation.export.CSV.zip"),
            Some(at(12, 0, 0))
        );
        assert_eq!(archive_timestamp("20240101120000.export.CSV.zip"), Some(at(12, 0, 0)));
        assert_eq!(archive_timestamp("http://x/gdeltv2/2024010112.translation.export.CSV.zip"), None);
        assert_eq!(archive_timestamp("http://x/gdeltv2/20241399120000.zip"), None);
        assert_eq!(archive_timestamp(""), None);
    }

    #[test]
    fn test_next_update_is_25_minutes_later() {
        let config = ScheduleConfig::default();
        let next = next_update_time(at(12, 0, 0), &config);
        assert_eq!(next, at(12, 25, 0));
        assert_eq!(next.to_rfc3339(), "2024-01-01T12:25:00+00:00");
    }

    #[test]
    fn test_delay_includes_grace() {
        let config = ScheduleConfig::default();
        let plan = plan(at(12, 0, 0), at(12, 10, 0), &config);
        assert_eq!(plan.next_update, at(12, 25, 0));
        assert_eq!(plan.delay, Duration::from_secs(15 * 60 + 1));
    }

    #[test]
    fn test_overdue_uses_retry_delay() {
        let config = ScheduleConfig::default();
        let plan = plan(at(12, 0, 0), at(12, 40, 0), &config);
        assert_eq!(plan.delay.as_millis(), 60_000);
        assert_eq!(delay_until(at(12, 25, 0), at(12, 25, 0), &config).as_millis(), 60_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_replaces_pending_timer() {
        let (mut scheduler, ticks) = UpdateScheduler::new();
        let start = tokio::time::Instant::now();

        scheduler.schedule(Duration::from_secs(10));
        scheduler.schedule(Duration::from_secs(20));
        assert!(scheduler.is_pending());

        ticks.recv_async().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(20));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(ticks.try_recv().is_err());
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_leaves_nothing_pending() {
        let (mut scheduler, ticks) = UpdateScheduler::new();
        scheduler.schedule(Duration::from_secs(5));
        scheduler.cancel();
        assert!(!scheduler.is_pending());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(ticks.try_recv().is_err());
    }
}
