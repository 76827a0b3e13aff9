//! The job table: one-shot timers keyed by schedule entry.
//!
//! Deadlines live in a min-heap of `(fire time, entry id)`; the job itself,
//! including its state, lives in a map keyed by entry id. Moving or
//! cancelling a job leaves its old heap item behind, and stale items are
//! skipped when they reach the top of the heap.

use chrono::{DateTime, Utc};
use playout_common::{ChannelId, EntryId, ProgrammeId};
use playout_db::models::ScheduleEntry;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Lifecycle of a job.
///
/// `Pending -> Fired -> Completed | Failed`, or `Pending -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Fired,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
struct Job {
    entry: ScheduleEntry,
    state: JobState,
    error: Option<String>,
}

impl Job {
    fn fire_at(&self) -> DateTime<Utc> {
        self.entry.scheduled_start
    }
}

/// Read-only view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub entry_id: EntryId,
    pub channel_id: ChannelId,
    pub programme_id: ProgrammeId,
    pub fire_at: DateTime<Utc>,
    pub state: JobState,
    pub error: Option<String>,
}

/// What a reload changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Newly registered jobs.
    pub added: usize,
    /// Pending jobs whose start time moved.
    pub moved: usize,
    /// Pending jobs that fell out of the lookahead window.
    pub dropped: usize,
    /// Finished or cancelled jobs removed from the table.
    pub pruned: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Registered {
    Added,
    Moved,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct JobTable {
    heap: BinaryHeap<Reverse<(DateTime<Utc>, EntryId)>>,
    jobs: HashMap<EntryId, Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a Pending job for `entry`.
    ///
    /// Returns `false` when nothing changed: the entry is already Pending at
    /// the same start, or its job has already fired or finished.
    pub fn schedule(&mut self, entry: ScheduleEntry) -> bool {
        self.register(entry) != Registered::Unchanged
    }

    fn register(&mut self, entry: ScheduleEntry) -> Registered {
        let id = entry.id;
        let fire_at = entry.scheduled_start;

        match self.jobs.get_mut(&id) {
            Some(job) if job.state != JobState::Pending => Registered::Unchanged,
            Some(job) if job.fire_at() == fire_at => {
                job.entry = entry;
                Registered::Unchanged
            }
            Some(job) => {
                job.entry = entry;
                self.heap.push(Reverse((fire_at, id)));
                Registered::Moved
            }
            None => {
                self.jobs.insert(
                    id,
                    Job {
                        entry,
                        state: JobState::Pending,
                        error: None,
                    },
                );
                self.heap.push(Reverse((fire_at, id)));
                Registered::Added
            }
        }
    }

    /// Replace the table's view of the future with `upcoming`, the entries
    /// starting after `now`.
    ///
    /// Pending jobs missing from `upcoming` are dropped and finished jobs
    /// are pruned. Fired jobs are left alone until they finish, and so are
    /// Pending jobs already due at `now`: they are no longer upcoming but
    /// have not been fired yet.
    pub fn reconcile(
        &mut self,
        upcoming: Vec<ScheduleEntry>,
        now: DateTime<Utc>,
    ) -> ReloadSummary {
        let keep: HashSet<EntryId> = upcoming.iter().map(|e| e.id).collect();
        let mut summary = ReloadSummary::default();

        self.jobs.retain(|id, job| {
            if keep.contains(id) {
                return true;
            }
            match job.state {
                JobState::Pending if job.fire_at() <= now => true,
                JobState::Pending => {
                    summary.dropped += 1;
                    false
                }
                JobState::Fired => true,
                _ => {
                    summary.pruned += 1;
                    false
                }
            }
        });

        for entry in upcoming {
            match self.register(entry) {
                Registered::Added => summary.added += 1,
                Registered::Moved => summary.moved += 1,
                Registered::Unchanged => {}
            }
        }

        self.compact();
        summary
    }

    /// Cancel a Pending job. Returns `false` if there was none.
    pub fn cancel(&mut self, id: EntryId) -> bool {
        match self.jobs.get_mut(&id) {
            Some(job) if job.state == JobState::Pending => {
                job.state = JobState::Cancelled;
                true
            }
            _ => false,
        }
    }

    fn is_live(&self, fire_at: DateTime<Utc>, id: EntryId) -> bool {
        self.jobs
            .get(&id)
            .is_some_and(|job| job.state == JobState::Pending && job.fire_at() == fire_at)
    }

    /// Earliest deadline of a Pending job.
    pub fn next_deadline(&mut self) -> Option<DateTime<Utc>> {
        while let Some(Reverse((fire_at, id))) = self.heap.peek().copied() {
            if self.is_live(fire_at, id) {
                return Some(fire_at);
            }
            self.heap.pop();
        }
        None
    }

    /// Mark every Pending job due at `now` as Fired and return their entries
    /// in start order.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        let mut due = Vec::new();
        while let Some(Reverse((fire_at, id))) = self.heap.peek().copied() {
            if fire_at > now {
                break;
            }
            self.heap.pop();
            if !self.is_live(fire_at, id) {
                continue;
            }
            if let Some(job) = self.jobs.get_mut(&id) {
                job.state = JobState::Fired;
                due.push(job.entry.clone());
            }
        }
        due
    }

    /// Record the outcome of a Fired job.
    pub fn finish(&mut self, id: EntryId, outcome: std::result::Result<(), String>) {
        if let Some(job) = self.jobs.get_mut(&id) {
            if job.state != JobState::Fired {
                return;
            }
            match outcome {
                Ok(()) => job.state = JobState::Completed,
                Err(e) => {
                    job.state = JobState::Failed;
                    job.error = Some(e);
                }
            }
        }
    }

    pub fn state(&self, id: EntryId) -> Option<JobState> {
        self.jobs.get(&id).map(|job| job.state)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// All jobs ordered by fire time.
    pub fn snapshot(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<JobSnapshot> = self
            .jobs
            .iter()
            .map(|(id, job)| JobSnapshot {
                entry_id: *id,
                channel_id: job.entry.channel_id.clone(),
                programme_id: job.entry.programme_id,
                fire_at: job.fire_at(),
                state: job.state,
                error: job.error.clone(),
            })
            .collect();
        jobs.sort_by_key(|j| (j.fire_at, j.entry_id));
        jobs
    }

    // Drop stale heap items once they outnumber live jobs.
    fn compact(&mut self) {
        if self.heap.len() <= self.jobs.len() * 2 + 16 {
            return;
        }
        let heap = std::mem::take(&mut self.heap);
        self.heap = heap
            .into_iter()
            .filter(|Reverse((fire_at, id))| self.is_live(*fire_at, *id))
            .collect();
    }
}
