//! Job tracker for background execution
//!
//! Every `&` entry gets a job id and a pid from two monotonic counters. The
//! spawned task's handle is kept so callers can wait for completion instead
//! of relying on timing.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// First job id of a session
pub const FIRST_JOB_ID: usize = 0;

/// First pid of a session
pub const FIRST_PID: u32 = 10000;

/// A background job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Job id, shown in brackets in notices
    pub id: usize,
    /// Process id
    pub pid: u32,
}

#[derive(Debug)]
struct JobState {
    next_id: usize,
    next_pid: u32,
    /// Jobs whose task has not finished yet
    running: HashSet<usize>,
    /// Handles not yet awaited by `wait_all`
    handles: HashMap<usize, JoinHandle<()>>,
}

/// Tracks background jobs and their task handles.
#[derive(Debug)]
pub struct JobTracker {
    state: Mutex<JobState>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    /// Create a tracker with the session-initial counters.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(JobState {
                next_id: FIRST_JOB_ID,
                next_pid: FIRST_PID,
                running: HashSet::new(),
                handles: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the ids for a new job and count it as live.
    pub fn allocate(&self) -> Job {
        let mut state = self.state();
        let job = Job {
            id: state.next_id,
            pid: state.next_pid,
        };
        state.next_id += 1;
        state.next_pid += 1;
        state.running.insert(job.id);
        job
    }

    /// Keep the handle of a job's task.
    ///
    /// A task that already finished is not tracked again.
    pub fn attach(&self, id: usize, handle: JoinHandle<()>) {
        let mut state = self.state();
        if state.running.contains(&id) {
            state.handles.insert(id, handle);
        }
    }

    /// Mark a job as finished.
    pub fn finish(&self, id: usize) {
        let mut state = self.state();
        state.running.remove(&id);
        state.handles.remove(&id);
    }

    /// Number of jobs that have not finished.
    pub fn live_count(&self) -> usize {
        self.state().running.len()
    }

    /// Wait until every job, including jobs launched by jobs, has finished.
    pub async fn wait_all(&self) {
        loop {
            let handles: Vec<(usize, JoinHandle<()>)> = self.state().handles.drain().collect();
            if handles.is_empty() {
                break;
            }
            for (id, handle) in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(job = id, error = %e, "background job did not complete");
                    self.finish(id);
                }
            }
        }
    }
}
