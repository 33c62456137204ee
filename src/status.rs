use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{CiLocalError, Result};

/// Last known outcome of a job run. A job that was never run has no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }

    /// Short label shown next to the job name in the job tree.
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "(...)",
            Self::Succeeded => "(success)",
            Self::Failed => "(failed)",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub name: String,
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
}

impl StatusEntry {
    fn new(name: &str, status: JobStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            updated_at: Utc::now(),
        }
    }
}

/// In-memory registry of job statuses for one session.
///
/// Every mutation is followed by a change notification. Subscribers get no
/// payload and are expected to re-read the whole registry with
/// [`StatusTracker::snapshot`].
///
/// Runs of the same job may overlap. A job stays running until its last run
/// in flight reports, and that run's outcome is the one kept.
pub struct StatusTracker {
    entries: Mutex<IndexMap<String, Slot>>,
    changed: watch::Sender<u64>,
}

struct Slot {
    entry: StatusEntry,
    in_flight: usize,
}

/// Receives change notifications from a [`StatusTracker`].
pub struct StatusSubscriber {
    rx: watch::Receiver<u64>,
}

impl StatusTracker {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            entries: Mutex::new(IndexMap::new()),
            changed,
        }
    }

    /// Marks `name` as in progress. Allowed from any state, so a finished job
    /// can be run again, also while an earlier run is still going.
    pub fn set_running(&self, name: &str) {
        let in_flight = {
            let mut entries = self.lock();
            let slot = entries.entry(name.to_string()).or_insert_with(|| Slot {
                entry: StatusEntry::new(name, JobStatus::Running),
                in_flight: 0,
            });
            slot.entry.status = JobStatus::Running;
            slot.entry.updated_at = Utc::now();
            slot.in_flight += 1;
            slot.in_flight
        };
        debug!("Job {name} is running ({in_flight} in flight)");
        self.notify_changed();
    }

    /// Records the outcome of one run of `name` and returns the job's status
    /// afterwards. While other runs are still in flight it stays `Running`;
    /// the last run to finish decides the final status.
    ///
    /// # Errors
    ///
    /// Returns `CiLocalError::NotRunning` if `name` has no run in flight.
    /// The registry is left untouched in that case.
    pub fn set_result(&self, name: &str, success: bool) -> Result<JobStatus> {
        let status = {
            let mut entries = self.lock();
            let slot = match entries.get_mut(name) {
                Some(slot) if slot.in_flight > 0 => slot,
                _ => return Err(CiLocalError::NotRunning(name.to_string())),
            };
            slot.in_flight -= 1;
            if slot.in_flight == 0 {
                slot.entry.status = JobStatus::from_success(success);
            }
            slot.entry.updated_at = Utc::now();
            slot.entry.status
        };
        debug!("Job {name} {status}");
        self.notify_changed();
        Ok(status)
    }

    pub fn get(&self, name: &str) -> Option<JobStatus> {
        self.lock().get(name).map(|slot| slot.entry.status)
    }

    /// All entries, in the order jobs were first run.
    pub fn snapshot(&self) -> Vec<StatusEntry> {
        self.lock().values().map(|slot| slot.entry.clone()).collect()
    }

    pub fn notify_changed(&self) {
        self.changed.send_modify(|generation| *generation += 1);
    }

    pub fn subscribe(&self) -> StatusSubscriber {
        StatusSubscriber {
            rx: self.changed.subscribe(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSubscriber {
    /// Waits for the next change notification. Returns `false` once the
    /// tracker has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unknown_job_has_no_status() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.get("build"), None);
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_running_then_success() {
        let tracker = StatusTracker::new();
        tracker.set_running("test");
        assert_eq!(tracker.get("test"), Some(JobStatus::Running));

        let status = tracker.set_result("test", true).unwrap();
        assert_eq!(status, JobStatus::Succeeded);
        assert_eq!(tracker.get("test"), Some(JobStatus::Succeeded));
    }

    #[test]
    fn test_running_then_failure() {
        let tracker = StatusTracker::new();
        tracker.set_running("test");
        tracker.set_result("test", false).unwrap();
        assert_eq!(tracker.get("test"), Some(JobStatus::Failed));
    }

    #[test]
    fn test_rerun_overrides_terminal_states() {
        let tracker = StatusTracker::new();
        for success in [true, false] {
            tracker.set_running("job");
            tracker.set_result("job", success).unwrap();
            tracker.set_running("job");
            assert_eq!(tracker.get("job"), Some(JobStatus::Running));
            tracker.set_result("job", success).unwrap();
        }
    }

    #[test]
    fn test_result_without_running_is_rejected() {
        let tracker = StatusTracker::new();
        let result = tracker.set_result("deploy", true);
        assert!(matches!(result, Err(CiLocalError::NotRunning(name)) if name == "deploy"));
        assert_eq!(tracker.get("deploy"), None);
    }

    #[test]
    fn test_second_result_is_rejected() {
        let tracker = StatusTracker::new();
        tracker.set_running("deploy");
        tracker.set_result("deploy", false).unwrap();

        assert!(tracker.set_result("deploy", true).is_err());
        assert_eq!(tracker.get("deploy"), Some(JobStatus::Failed));
    }

    #[test]
    fn test_overlapping_runs_keep_last_result() {
        let tracker = StatusTracker::new();
        tracker.set_running("deploy");
        tracker.set_running("deploy");

        assert_eq!(tracker.set_result("deploy", true).unwrap(), JobStatus::Running);
        assert_eq!(tracker.get("deploy"), Some(JobStatus::Running));

        assert_eq!(tracker.set_result("deploy", false).unwrap(), JobStatus::Failed);
        assert_eq!(tracker.get("deploy"), Some(JobStatus::Failed));

        assert!(tracker.set_result("deploy", true).is_err());
        assert_eq!(tracker.get("deploy"), Some(JobStatus::Failed));
    }

    #[test]
    fn test_snapshot_keeps_first_run_order() {
        let tracker = StatusTracker::new();
        tracker.set_running("b");
        tracker.set_running("a");
        tracker.set_result("b", true).unwrap();
        tracker.set_running("b");

        let names: Vec<_> = tracker.snapshot().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(JobStatus::Running.label(), "(...)");
        assert_eq!(JobStatus::Succeeded.label(), "(success)");
        assert_eq!(JobStatus::Failed.label(), "(failed)");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_subscribers_are_woken_by_each_mutation() {
        let tracker = StatusTracker::new();
        let mut subscriber = tracker.subscribe();

        tracker.set_running("build");
        let woke = tokio::time::timeout(Duration::from_secs(1), subscriber.changed()).await;
        assert_eq!(woke.ok(), Some(true));

        tracker.set_result("build", true).unwrap();
        let woke = tokio::time::timeout(Duration::from_secs(1), subscriber.changed()).await;
        assert_eq!(woke.ok(), Some(true));
        assert_eq!(tracker.snapshot()[0].status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_rejected_result_does_not_notify() {
        let tracker = StatusTracker::new();
        let mut subscriber = tracker.subscribe();

        assert!(tracker.set_result("ghost", true).is_err());
        let woke =
            tokio::time::timeout(Duration::from_millis(50), subscriber.changed()).await;
        assert!(woke.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_sees_tracker_drop() {
        let tracker = StatusTracker::new();
        let mut subscriber = tracker.subscribe();
        drop(tracker);
        assert!(!subscriber.changed().await);
    }
}
