//! Drives fetch cycles and publishes snapshots.
//!
//! A successful cycle swaps in a new snapshot and arms the re-fetch timer. A
//! failed cycle swaps in an error snapshot and leaves no timer pending; only
//! an explicit [`App::refresh`] starts again.

use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::fetch::FeedClient;
use crate::pipeline::{process_cycle, Snapshot};
use crate::schedule::{plan, Tick, UpdateScheduler};

/// Result of one cycle as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Updated { events: usize, rendered: usize },
    Failed { message: String },
}

pub struct App {
    config: Config,
    client: FeedClient,
    scheduler: UpdateScheduler,
    ticks: flume::Receiver<Tick>,
    snapshots: watch::Sender<Arc<Snapshot>>,
    tz: Tz,
}

impl App {
    /// The receiver always holds the latest complete snapshot.
    pub fn new(config: Config) -> Result<(Self, watch::Receiver<Arc<Snapshot>>), reqwest::Error> {
        let client = FeedClient::new(config.feed.clone(), config.reference.clone())?;
        let (scheduler, ticks) = UpdateScheduler::new();
        let (snapshots, rx) = watch::channel(Arc::new(Snapshot::default()));
        Ok((
            Self {
                config,
                client,
                scheduler,
                ticks,
                snapshots,
                tz: local_timezone(),
            },
            rx,
        ))
    }

    /// Run one fetch-and-process cycle now.
    pub async fn refresh(&mut self) -> CycleOutcome {
        // a manual refresh supersedes whatever was scheduled
        self.scheduler.cancel();

        let data = match self.client.fetch_cycle().await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "update cycle failed; no retry scheduled");
                self.snapshots.send_replace(Arc::new(Snapshot::failed(&e)));
                return CycleOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let archive_time = data.archive_time;
        let mut snapshot = process_cycle(data, &self.config.render);

        let now = Utc::now();
        let delay = match archive_time {
            Some(file_time) => {
                let plan = plan(file_time, now, &self.config.schedule);
                snapshot.next_update = Some(plan.next_update);
                info!(
                    next_update = %plan.next_update.with_timezone(&self.tz).format("%H:%M:%S %Z"),
                    delay_secs = plan.delay.as_secs(),
                    "next update scheduled"
                );
                plan.delay
            }
            None => {
                warn!("archive name carries no timestamp; using retry delay");
                std::time::Duration::from_secs(self.config.schedule.retry_seconds)
            }
        };

        let outcome = CycleOutcome::Updated {
            events: snapshot.events.len(),
            rendered: snapshot.arcs.len() + snapshot.points.len(),
        };
        info!(
            events = snapshot.events.len(),
            arcs = snapshot.arcs.len(),
            points = snapshot.points.len(),
            "snapshot published"
        );
        self.snapshots.send_replace(Arc::new(snapshot));
        self.scheduler.schedule(delay);
        outcome
    }

    /// Cycle until one fails. With `once` set, stop after the first cycle.
    pub async fn run(mut self, once: bool) -> CycleOutcome {
        loop {
            let outcome = self.refresh().await;
            if once || matches!(outcome, CycleOutcome::Failed { .. }) {
                self.scheduler.cancel();
                return outcome;
            }
            if self.ticks.recv_async().await.is_err() {
                return outcome;
            }
        }
    }
}

/// Host time zone, UTC when it cannot be determined.
pub fn local_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or_else(|| {
            warn!("failed to detect timezone, using UTC");
            chrono_tz::UTC
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::{FakeFeed, ARCHIVE_PATH, POINTER_PATH};
    use crate::table::TableView;
    use std::time::Duration;

    #[tokio::test]
    async fn test_successful_cycle_swaps_snapshot_and_arms_timer() {
        let feed = FakeFeed::healthy().await;
        let (mut app, mut snapshots) = App::new(feed.config()).unwrap();
        assert!(!app.scheduler.is_pending());

        let outcome = app.refresh().await;
        assert_eq!(outcome, CycleOutcome::Updated { events: 1, rendered: 1 });
        assert!(app.scheduler.is_pending());

        assert!(snapshots.has_changed().unwrap());
        let snapshot = snapshots.borrow_and_update().clone();
        assert!(!snapshot.is_failed());
        assert_eq!(snapshot.events.len(), 1);
        assert_eq!(snapshot.arcs.len(), 1);
        let archive_url = format!("{}{}", feed.base, ARCHIVE_PATH);
        assert_eq!(snapshot.archive_url.as_deref(), Some(archive_url.as_str()));
        assert_eq!(
            snapshot.next_update.map(|t| t.to_rfc3339()).as_deref(),
            Some("2024-01-01T12:25:00+00:00")
        );
    }

    #[tokio::test]
    async fn test_failed_cycle_publishes_one_error_snapshot() {
        let feed = FakeFeed::start().await;
        feed.route(POINTER_PATH, 500, b"");
        let (mut app, mut snapshots) = App::new(feed.config()).unwrap();

        let CycleOutcome::Failed { message } = app.refresh().await else {
            panic!("cycle should fail");
        };
        assert!(message.starts_with("更新情報ファイルの取得に失敗"));

        assert!(snapshots.has_changed().unwrap());
        let snapshot = snapshots.borrow_and_update().clone();
        assert!(snapshot.is_failed());
        assert!(snapshot.events.is_empty());
        assert!(!snapshots.has_changed().unwrap());
        assert!(!app.scheduler.is_pending());
    }

    #[tokio::test]
    async fn test_failure_after_success_clears_data_and_timer() {
        let feed = FakeFeed::healthy().await;
        let (mut app, snapshots) = App::new(feed.config()).unwrap();
        app.refresh().await;
        assert!(app.scheduler.is_pending());
        assert_eq!(snapshots.borrow().events.len(), 1);

        feed.route(ARCHIVE_PATH, 404, b"");
        assert!(matches!(app.refresh().await, CycleOutcome::Failed { .. }));
        assert!(!app.scheduler.is_pending());

        let snapshot = snapshots.borrow().clone();
        assert!(snapshot.events.is_empty());
        assert!(snapshot.arcs.is_empty());
        assert!(snapshot.polygons.is_empty());
        assert!(matches!(
            &snapshot.table,
            TableView::Error { message, .. } if message.starts_with("エラー: ZIPファイルのダウンロードに失敗")
        ));
    }

    #[tokio::test]
    async fn test_run_stops_after_failure_without_retry() {
        let feed = FakeFeed::start().await;
        feed.route(POINTER_PATH, 500, b"");
        let (app, snapshots) = App::new(feed.config()).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(10), app.run(false))
            .await
            .expect("run returns instead of retrying");
        assert!(matches!(outcome, CycleOutcome::Failed { .. }));
        assert_eq!(feed.hits(POINTER_PATH), 1);
        assert!(snapshots.borrow().is_failed());
    }

    #[tokio::test]
    async fn test_run_once_stops_after_success() {
        let feed = FakeFeed::healthy().await;
        let (app, snapshots) = App::new(feed.config()).unwrap();

        let outcome = app.run(true).await;
        assert_eq!(outcome, CycleOutcome::Updated { events: 1, rendered: 1 });
        assert_eq!(feed.hits(POINTER_PATH), 1);
        assert!(!snapshots.borrow().is_failed());
    }
}
