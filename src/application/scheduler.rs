//! Interval scheduling with cancellation

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::shared::errors::AppError;

/// Task run on every tick; each call returns the work of one tick
pub type IntervalTask = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first tick immediately
    fn on_interval(&self, period: Duration, task: IntervalTask) -> ScheduleHandle;
}

/// Handle of a scheduled task. Dropping the handle also stops the task.
pub struct ScheduleHandle {
    cancel: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Stop scheduling; a tick already running finishes first
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Wait for the task loop to exit
    pub async fn join(self) -> Result<(), AppError> {
        let Self { cancel, join } = self;
        let result = join.await.map_err(|e| AppError::Scheduler(e.to_string()));
        drop(cancel);
        result
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn on_interval(&self, period: Duration, mut task: IntervalTask) -> ScheduleHandle {
        let (cancel, mut cancelled) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = interval.tick() => {
                        if *cancelled.borrow() {
                            break;
                        }
                        task().await;
                    }
                }
            }
            debug!("Interval task stopped");
        });
        ScheduleHandle { cancel, join }
    }
}
