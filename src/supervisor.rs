//! Service supervision.
//!
//! Owns the bounded process lifetime and the shutdown sequencing of the
//! concurrently running listeners. Each supervised task gets a
//! [`FailureReporter`] for at most one fatal error; the supervisor blocks
//! on whichever comes first, the global deadline or a reported failure,
//! then flips the shutdown watch and joins every launched task under a
//! bounded grace period. There is no retry and no per-subsystem restart:
//! a listener failure ends the process.

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Grace period for supervised tasks to observe shutdown and exit.
const JOIN_GRACE: Duration = Duration::from_secs(5);

/// A fatal failure reported by a supervised task.
#[derive(Debug)]
pub struct TaskFailure {
    /// Name of the failing task ("api", "metrics").
    pub task: &'static str,
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed: {}", self.task, self.error)
    }
}

/// Why the supervisor shut the service down.
#[derive(Debug)]
pub enum ShutdownCause {
    /// The global run deadline elapsed. Designed termination, not an error.
    DeadlineElapsed,
    /// A supervised task reported a fatal failure.
    TaskFailed(TaskFailure),
}

/// Per-task handle for reporting one fatal failure.
#[derive(Clone)]
pub struct FailureReporter {
    task: &'static str,
    tx: mpsc::Sender<TaskFailure>,
}

impl FailureReporter {
    /// Report a fatal failure. Never blocks; the channel is sized for one
    /// report per task, so a full channel means the report is redundant.
    pub fn report(&self, error: Box<dyn std::error::Error + Send + Sync>) {
        let failure = TaskFailure {
            task: self.task,
            error,
        };
        if let Err(e) = self.tx.try_send(failure) {
            warn!("Failure report dropped: {}", e);
        }
    }
}

/// Supervisor for the service's concurrent listener tasks.
pub struct Supervisor {
    deadline: Duration,
    shutdown_tx: watch::Sender<bool>,
    failures_tx: mpsc::Sender<TaskFailure>,
    failures_rx: mpsc::Receiver<TaskFailure>,
    tasks: JoinSet<()>,
}

impl Supervisor {
    /// Create a supervisor with the given global lifetime. `task_capacity`
    /// sizes the failure channel and must cover every task that gets a
    /// reporter.
    pub fn new(deadline: Duration, task_capacity: usize) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (failures_tx, failures_rx) = mpsc::channel(task_capacity.max(1));

        Self {
            deadline,
            shutdown_tx,
            failures_tx,
            failures_rx,
            tasks: JoinSet::new(),
        }
    }

    /// Shutdown signal receiver for a supervised task.
    pub fn shutdown_watch(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Failure reporter for a supervised task.
    pub fn failure_reporter(&self, task: &'static str) -> FailureReporter {
        FailureReporter {
            task,
            tx: self.failures_tx.clone(),
        }
    }

    /// Launch a supervised task. Fire-and-forget at launch; the task is
    /// joined during shutdown.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(future);
    }

    /// Block until the deadline elapses or a task reports a failure,
    /// then shut everything down. Consumes the supervisor; all launched
    /// tasks are joined (or aborted after the grace period) before this
    /// returns.
    pub async fn run(mut self) -> ShutdownCause {
        // Running: a designed race, no priority between the two triggers.
        let cause = tokio::select! {
            _ = tokio::time::sleep(self.deadline) => {
                info!("Run deadline elapsed after {:?}", self.deadline);
                ShutdownCause::DeadlineElapsed
            }
            Some(failure) = self.failures_rx.recv() => {
                error!("{}", failure);
                ShutdownCause::TaskFailed(failure)
            }
        };

        // ShuttingDown: stop the listeners, then join every task.
        let _ = self.shutdown_tx.send(true);

        let tasks = &mut self.tasks;
        let join_all = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(JOIN_GRACE, join_all).await.is_err() {
            warn!("Tasks still running after {:?}, aborting", JOIN_GRACE);
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }

        // A second failure racing the first is still surfaced, just not
        // the shutdown trigger.
        while let Ok(failure) = self.failures_rx.try_recv() {
            error!("Additional failure during shutdown: {}", failure);
        }

        cause
    }
}
