//! Named periodic background tasks.
//!
//! Tasks are registered under a well-known name with a fixed interval
//! and can be cancelled and later resumed with their original schedule,
//! so tests can suspend a periodic job deterministically. A scoped
//! [`PauseGuard`] restores the schedule on all exit paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, warn};

/// A schedulable job. Jobs are synchronous and short-lived; long work
/// belongs inside the job's own components.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// A cancelled task's schedule, reusable for resumption.
pub struct CancelledTask {
    pub interval: Duration,
    pub job: Job,
}

struct RunningTask {
    interval: Duration,
    job: Job,
    handle: tokio::task::JoinHandle<()>,
}

/// Registry of named periodic tasks running on the tokio runtime.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<String, RunningTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a periodic task under the given name, replacing any task
    /// already registered under it. The first tick is skipped so the
    /// job never runs at registration time.
    pub fn schedule(&self, name: &str, task_interval: Duration, job: Job) {
        let loop_job = Arc::clone(&job);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(task_interval);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                loop_job();
            }
        });

        debug!(task = name, interval_secs = task_interval.as_secs(), "Scheduled periodic task");

        if let Ok(mut tasks) = self.tasks.lock() {
            if let Some(previous) = tasks.insert(
                name.to_string(),
                RunningTask {
                    interval: task_interval,
                    job,
                    handle,
                },
            ) {
                warn!(task = name, "Replacing already-scheduled task");
                previous.handle.abort();
            }
        }
    }

    /// Cancel a task, returning its schedule so the caller can resume
    /// it later via [`Self::resume`]. Already-buffered work owned by
    /// the job's components is unaffected.
    pub fn cancel(&self, name: &str) -> Option<CancelledTask> {
        let task = self
            .tasks
            .lock()
            .ok()
            .and_then(|mut tasks| tasks.remove(name))?;
        task.handle.abort();
        debug!(task = name, "Cancelled periodic task");
        Some(CancelledTask {
            interval: task.interval,
            job: task.job,
        })
    }

    /// Restart a previously cancelled task with its original schedule.
    pub fn resume(&self, name: &str, task: CancelledTask) {
        self.schedule(name, task.interval, task.job);
    }

    /// Whether a task is currently registered under the name.
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .map(|tasks| tasks.contains_key(name))
            .unwrap_or(false)
    }

    /// Cancel a task for the lifetime of the returned guard; the
    /// original schedule is re-registered when the guard drops.
    pub fn pause(self: &Arc<Self>, name: &str) -> Option<PauseGuard> {
        let task = self.cancel(name)?;
        Some(PauseGuard {
            scheduler: Arc::clone(self),
            name: name.to_string(),
            task: Some(task),
        })
    }

    /// Abort all registered tasks.
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (name, task) in tasks.drain() {
                debug!(task = %name, "Aborting periodic task");
                task.handle.abort();
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Holds a cancelled task and resumes it with the original interval and
/// job on drop.
pub struct PauseGuard {
    scheduler: Arc<Scheduler>,
    name: String,
    task: Option<CancelledTask>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.scheduler.resume(&self.name, task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_task_runs_periodically() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule("test-task", Duration::from_millis(20), counting_job(&counter));
        tokio::time::sleep(Duration::from_millis(110)).await;

        assert!(counter.load(Ordering::SeqCst) >= 2);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_and_resume_keeps_schedule() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule("test-task", Duration::from_millis(20), counting_job(&counter));
        let cancelled = scheduler.cancel("test-task").unwrap();
        assert!(!scheduler.is_scheduled("test-task"));
        assert_eq!(cancelled.interval, Duration::from_millis(20));

        let before = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), before);

        scheduler.resume("test-task", cancelled);
        assert!(scheduler.is_scheduled("test-task"));
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(counter.load(Ordering::SeqCst) > before);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_pause_guard_restores_on_drop() {
        let scheduler = Arc::new(Scheduler::new());
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule("test-task", Duration::from_millis(20), counting_job(&counter));
        {
            let _guard = scheduler.pause("test-task").unwrap();
            assert!(!scheduler.is_scheduled("test-task"));
        }
        assert!(scheduler.is_scheduled("test-task"));

        assert!(scheduler.pause("missing-task").is_none());
        scheduler.shutdown();
    }
}
