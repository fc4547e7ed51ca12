//! Background task management
//!
//! Owns the long-running tasks of a service (queue consumers, periodic jobs)
//! together with the shutdown token they watch.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Task kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Queue consumer, one per subscribed queue
    Consumer,
    /// Timer driven job
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Consumer => write!(f, "Consumer"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

struct RegisteredTask {
    name: String,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("order_stock_queue", TaskKind::Consumer, run_consumer(.., token));
///
/// // on Ctrl-C
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that tasks watch for the shutdown signal
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn and register a task
    ///
    /// Panics inside the task are caught and logged; a task returning before
    /// shutdown was requested is logged as unexpected.
    pub fn spawn<F>(&mut self, name: impl Into<String>, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let token = self.shutdown.clone();

        let wrapped_future = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) => {
                    if !token.is_cancelled() {
                        tracing::warn!(task = %task_name, kind = %kind, "Background task completed unexpectedly");
                    }
                }
                Err(panic_info) => {
                    let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(
                        task = %task_name,
                        kind = %kind,
                        panic = %panic_msg,
                        "Background task panicked"
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn log_summary(&self) {
        let consumers = self
            .tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Consumer)
            .count();
        tracing::info!(
            total = self.tasks.len(),
            consumers,
            "Background tasks registered"
        );
    }

    /// Cancel all tasks and wait for them to drain
    pub async fn shutdown(self) {
        tracing::info!(count = self.tasks.len(), "Shutting down background tasks");

        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task failed"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_work() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        let drained = Arc::new(AtomicBool::new(false));
        let flag = drained.clone();

        tasks.spawn("drainer", TaskKind::Consumer, async move {
            token.cancelled().await;
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        tasks.shutdown().await;
        assert!(drained.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        let drained = Arc::new(AtomicBool::new(false));
        let flag = drained.clone();

        tasks.spawn("boom", TaskKind::Periodic, async {
            panic!("boom");
        });
        tasks.spawn("survivor", TaskKind::Consumer, async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        tasks.shutdown().await;
        assert!(drained.load(Ordering::SeqCst));
    }
}
