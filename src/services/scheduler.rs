//! Background scheduler for the three periodic passes.
//!
//! Assignment, the review-state drain and the single-shot drain each run on
//! their own tokio task with their own timer. Each task runs its pass once at
//! start, then on every tick, and also on demand through [`SchedulerHandle`].
//! A pass in progress is never interrupted; `Stop` takes effect between passes.

use crate::config::SchedulerConfig;
use crate::db::pass_log;
use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::assignment::AssignmentEngine;
use crate::services::notification::NotificationEngine;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Commands accepted by a pass task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassCommand {
    /// Run the pass now.
    Trigger,
    /// Exit after the current pass, if any.
    Stop,
}

/// Summary of one run, as written to `pass_log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub summary: String,
    /// Items that failed and will be retried.
    pub failures: usize,
}

/// A unit of periodic work.
#[async_trait]
pub trait PeriodicPass: Send + Sync {
    /// Name used in logs and `pass_log.operation`.
    fn name(&self) -> &'static str;

    async fn run_once(&self) -> Result<PassOutcome, AppError>;
}

pub struct AssignmentPass(pub Arc<AssignmentEngine>);

#[async_trait]
impl PeriodicPass for AssignmentPass {
    fn name(&self) -> &'static str {
        "assignment"
    }

    async fn run_once(&self) -> Result<PassOutcome, AppError> {
        let report = self.0.run_pass().await?;
        Ok(PassOutcome {
            summary: report.summary(),
            failures: report.errors.len(),
        })
    }
}

pub struct ReviewStatePass(pub Arc<NotificationEngine>);

#[async_trait]
impl PeriodicPass for ReviewStatePass {
    fn name(&self) -> &'static str {
        "review_state"
    }

    async fn run_once(&self) -> Result<PassOutcome, AppError> {
        let report = self.0.run_review_state_pass().await?;
        Ok(PassOutcome {
            summary: report.summary(),
            failures: report.errors.len(),
        })
    }
}

pub struct SingleShotPass(pub Arc<NotificationEngine>);

#[async_trait]
impl PeriodicPass for SingleShotPass {
    fn name(&self) -> &'static str {
        "single_shot"
    }

    async fn run_once(&self) -> Result<PassOutcome, AppError> {
        let report = self.0.run_single_shot_pass().await?;
        Ok(PassOutcome {
            summary: report.summary(),
            failures: report.errors.len(),
        })
    }
}

/// Control handle for a running scheduler.
pub struct SchedulerHandle {
    assignment_tx: mpsc::Sender<PassCommand>,
    review_state_tx: mpsc::Sender<PassCommand>,
    single_shot_tx: mpsc::Sender<PassCommand>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Run the assignment pass as soon as its task is free.
    pub async fn trigger_assignment(&self) -> Result<(), AppError> {
        send(&self.assignment_tx, PassCommand::Trigger).await
    }

    /// Run both notification drains as soon as their tasks are free.
    pub async fn trigger_notifications(&self) -> Result<(), AppError> {
        send(&self.review_state_tx, PassCommand::Trigger).await?;
        send(&self.single_shot_tx, PassCommand::Trigger).await
    }

    /// Stop every task and wait for in-flight passes to finish.
    pub async fn shutdown(self) {
        for tx in [&self.assignment_tx, &self.review_state_tx, &self.single_shot_tx] {
            // A task that already exited has dropped its receiver.
            let _ = tx.send(PassCommand::Stop).await;
        }
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                log::error!("[scheduler] pass task ended abnormally: {}", e);
            }
        }
        log::info!("[scheduler] stopped");
    }
}

async fn send(tx: &mpsc::Sender<PassCommand>, cmd: PassCommand) -> Result<(), AppError> {
    tx.send(cmd)
        .await
        .map_err(|_| AppError::internal("Scheduler not running"))
}

pub struct Scheduler;

impl Scheduler {
    /// Spawn the three pass tasks.
    pub fn start(
        pool: DbPool,
        assignment: Arc<AssignmentEngine>,
        notification: Arc<NotificationEngine>,
        config: &SchedulerConfig,
    ) -> SchedulerHandle {
        let (assignment_tx, a) = spawn_pass(
            pool.clone(),
            Arc::new(AssignmentPass(assignment)),
            config.assign_interval,
        );
        let (review_state_tx, r) = spawn_pass(
            pool.clone(),
            Arc::new(ReviewStatePass(notification.clone())),
            config.notify_interval,
        );
        let (single_shot_tx, s) = spawn_pass(
            pool,
            Arc::new(SingleShotPass(notification)),
            config.events_interval,
        );

        log::info!(
            "[scheduler] started (assign every {}s, notify every {}s, events every {}s)",
            config.assign_interval.as_secs(),
            config.notify_interval.as_secs(),
            config.events_interval.as_secs()
        );

        SchedulerHandle {
            assignment_tx,
            review_state_tx,
            single_shot_tx,
            tasks: vec![a, r, s],
        }
    }
}

/// Spawn one pass loop. Returns its command sender and task handle.
pub fn spawn_pass(
    pool: DbPool,
    pass: Arc<dyn PeriodicPass>,
    period: Duration,
) -> (mpsc::Sender<PassCommand>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<PassCommand>(16);

    let task = tokio::spawn(async move {
        run_and_record(&pool, pass.as_ref()).await;

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the immediate first tick; the pass just ran.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    run_and_record(&pool, pass.as_ref()).await;
                }
                cmd = rx.recv() => match cmd {
                    Some(PassCommand::Trigger) => {
                        log::debug!("[scheduler] {} triggered", pass.name());
                        run_and_record(&pool, pass.as_ref()).await;
                    }
                    Some(PassCommand::Stop) | None => break,
                }
            }
        }
        log::debug!("[scheduler] {} stopped", pass.name());
    });

    (tx, task)
}

/// Run a pass, log the outcome and record it in `pass_log`.
async fn run_and_record(pool: &DbPool, pass: &dyn PeriodicPass) {
    let start = Instant::now();
    let result = pass.run_once().await;
    let duration_ms = start.elapsed().as_millis() as i64;

    let (status, message) = match &result {
        Ok(outcome) if outcome.failures == 0 => {
            log::info!("[scheduler] {} pass: {}", pass.name(), outcome.summary);
            ("success", outcome.summary.clone())
        }
        Ok(outcome) => {
            log::warn!("[scheduler] {} pass: {}", pass.name(), outcome.summary);
            ("partial", outcome.summary.clone())
        }
        Err(e) => {
            log::error!("[scheduler] {} pass failed: {}", pass.name(), e);
            ("error", e.to_string())
        }
    };

    if let Err(e) =
        pass_log::record_pass(pool, pass.name(), status, Some(&message), Some(duration_ms)).await
    {
        log::warn!("[scheduler] could not record {} pass: {}", pass.name(), e);
    }
}
