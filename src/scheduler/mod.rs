//! Execution scheduler.
//!
//! Keeps a window of upcoming schedule entries as one-shot jobs and, when an
//! entry's scheduled start arrives, asks the render worker to play its
//! programme into the channel's ingest. The window is refreshed from the
//! schedule store on an interval and whenever the schedule is edited.
//!
//! Nothing here is persisted: a restart rebuilds the table on the first
//! reload, and entries whose start passed while the process was down are not
//! played.

mod jobs;

pub use jobs::{JobSnapshot, JobState, JobTable, ReloadSummary};

use chrono::Utc;
use parking_lot::Mutex;
use playout_common::{EntryId, Error, Result};
use playout_db::models::{Programme, ScheduleEntry};
use playout_db::{queries, DbPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::dispatch::{PlayRequest, RenderDispatch};
use crate::store::with_conn;

// Upper bound on how long the driver sleeps with an empty table.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Handle to the scheduler. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    pool: DbPool,
    dispatch: Arc<dyn RenderDispatch>,
    table: Mutex<JobTable>,
    notify: Notify,
    settings: SchedulerConfig,
}

impl Scheduler {
    pub fn new(pool: DbPool, dispatch: Arc<dyn RenderDispatch>, settings: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                dispatch,
                table: Mutex::new(JobTable::new()),
                notify: Notify::new(),
                settings,
            }),
        }
    }

    /// Refresh the job table from the schedule store.
    ///
    /// Loads the next `queue_size` entries starting after now. Jobs that are
    /// already due but not yet fired stay registered. If the store cannot be
    /// read the table is left exactly as it was.
    pub async fn reload(&self) -> Result<ReloadSummary> {
        let limit = self.inner.settings.queue_size;
        let now = Utc::now();

        let fetched = with_conn(&self.inner.pool, move |conn| {
            queries::schedule_entries::list_upcoming(conn, &now, limit)
        })
        .await;

        let upcoming = match fetched {
            Ok(upcoming) => upcoming,
            Err(e) => {
                tracing::error!("Schedule reload failed, keeping current jobs: {}", e);
                return Err(e);
            }
        };

        let summary = self.inner.table.lock().reconcile(upcoming, now);
        tracing::debug!(
            added = summary.added,
            moved = summary.moved,
            dropped = summary.dropped,
            pruned = summary.pruned,
            "Schedule reloaded"
        );
        self.inner.notify.notify_one();
        Ok(summary)
    }

    /// Register a single entry as a Pending job.
    ///
    /// Returns `false` if the entry already had an identical Pending job or
    /// its job has already fired.
    pub fn schedule(&self, entry: ScheduleEntry) -> bool {
        let id = entry.id;
        let changed = self.inner.table.lock().schedule(entry);
        if changed {
            tracing::debug!("Scheduled entry {}", id);
            self.inner.notify.notify_one();
        }
        changed
    }

    /// Delete an entry from the store and cancel its job.
    ///
    /// An entry that has already fired keeps playing; only the row goes.
    pub async fn delete(&self, id: EntryId) -> Result<()> {
        with_conn(&self.inner.pool, move |conn| {
            queries::schedule_entries::delete_entry(conn, id)
        })
        .await?;

        if self.inner.table.lock().cancel(id) {
            tracing::info!("Cancelled pending job for entry {}", id);
            self.inner.notify.notify_one();
        }
        Ok(())
    }

    /// Snapshot of every job, ordered by fire time.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.inner.table.lock().snapshot()
    }

    pub fn job_state(&self, id: EntryId) -> Option<JobState> {
        self.inner.table.lock().state(id)
    }

    /// Fire every job whose start has arrived.
    ///
    /// Each fired entry is executed on its own task; the handles are
    /// returned so callers can wait for them.
    pub fn fire_due(&self) -> Vec<JoinHandle<()>> {
        let due = self.inner.table.lock().take_due(Utc::now());
        due.into_iter()
            .map(|entry| {
                tracing::info!(
                    "Firing entry {} on channel {} (programme {})",
                    entry.id,
                    entry.channel_id,
                    entry.programme_id
                );
                let inner = self.inner.clone();
                tokio::spawn(async move { inner.execute(entry).await })
            })
            .collect()
    }

    /// Run the reload loop and the timer driver until `shutdown` is
    /// cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            "Scheduler started (lookahead {}, reload every {}s)",
            self.inner.settings.queue_size,
            self.inner.settings.reload_interval_secs
        );

        let reloader = {
            let this = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { this.reload_loop(shutdown).await })
        };

        self.drive(shutdown).await;

        if let Err(e) = reloader.await {
            tracing::warn!("Reload loop ended abnormally: {}", e);
        }
        tracing::info!("Scheduler stopped");
    }

    async fn reload_loop(&self, shutdown: CancellationToken) {
        let period = Duration::from_secs(self.inner.settings.reload_interval_secs);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    // failures are logged by reload
                    let _ = self.reload().await;
                }
            }
        }
    }

    async fn drive(&self, shutdown: CancellationToken) {
        loop {
            self.fire_due();

            let deadline = self.inner.table.lock().next_deadline();
            let wait = match deadline {
                Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
                None => IDLE_WAIT,
            };

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = self.inner.notify.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

impl Inner {
    async fn execute(&self, entry: ScheduleEntry) {
        let id = entry.id;
        let outcome = self.play(&entry).await;

        match &outcome {
            Ok(()) => tracing::info!("Entry {} handed to render dispatch", id),
            Err(e) => tracing::error!("Entry {} failed: {}", id, e),
        }
        self.table
            .lock()
            .finish(id, outcome.map_err(|e| e.to_string()));
    }

    async fn play(&self, entry: &ScheduleEntry) -> Result<()> {
        let programme = self.load_programme(entry).await?;

        if programme.is_live() {
            tracing::info!(
                "Programme {} is live content, nothing to play for entry {}",
                programme.id,
                entry.id
            );
            return Ok(());
        }

        let request = PlayRequest {
            destination: entry.ingest_url.clone(),
            videos: programme.videos,
            width: self.settings.play_width,
            height: self.settings.play_height,
            bitrate: self.settings.play_bitrate,
        };
        self.dispatch.play(&request).await
    }

    // Stamps the broadcast start and resolves the programme in one trip to
    // the blocking pool.
    async fn load_programme(&self, entry: &ScheduleEntry) -> Result<Programme> {
        let id = entry.id;
        let programme_id = entry.programme_id;
        let now = Utc::now();

        let programme = with_conn(&self.pool, move |conn| {
            if let Err(e) = queries::schedule_entries::mark_broadcast_start(conn, id, &now) {
                tracing::warn!("Could not record broadcast start of entry {}: {}", id, e);
            }
            queries::programmes::get_programme(conn, programme_id)
        })
        .await?;

        programme.ok_or_else(|| Error::not_found("programme", programme_id))
    }
}
