//! In-process alert job queue.
//!
//! At-least-once delivery of run keys to the alert pipeline. Jobs that fail
//! are redelivered with exponential backoff until `max_deliveries` is reached.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{AppError, AppResult};
use crate::models::RunKey;
use crate::services::alert_job::AlertPipeline;

/// One delivery of an alert job.
#[derive(Debug, Clone)]
pub struct AlertTask {
    pub run_key: RunKey,
    /// Stable across redeliveries of the same job
    pub delivery_id: Uuid,
    /// 1 for the first delivery
    pub delivery: u32,
}

impl AlertTask {
    pub fn new(run_key: RunKey) -> Self {
        AlertTask {
            run_key,
            delivery_id: Uuid::now_v7(),
            delivery: 1,
        }
    }

    fn redelivery(&self) -> Self {
        AlertTask {
            run_key: self.run_key.clone(),
            delivery_id: self.delivery_id,
            delivery: self.delivery + 1,
        }
    }
}

/// Producer handle for the alert queue.
#[derive(Clone)]
pub struct AlertQueue {
    sender: mpsc::Sender<AlertTask>,
}

impl AlertQueue {
    /// Create a queue and the receiver to hand to `start_alert_worker`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AlertTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (AlertQueue { sender }, receiver)
    }

    /// Enqueue one job for a completed run. Fails when the queue is full or closed.
    pub fn enqueue(&self, run_key: RunKey) -> AppResult<Uuid> {
        let task = AlertTask::new(run_key);
        let delivery_id = task.delivery_id;
        self.sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(t) => {
                AppError::Queue(format!("queue full, dropped {}", t.run_key))
            }
            mpsc::error::TrySendError::Closed(t) => {
                AppError::Queue(format!("queue closed, dropped {}", t.run_key))
            }
        })?;
        Ok(delivery_id)
    }
}

/// Start the worker draining `receiver`.
///
/// A failed job is redelivered after a backoff while it keeps its
/// concurrency slot. The worker stops once every `AlertQueue` handle is
/// dropped and the queue is drained; the returned handle resolves after
/// in-flight jobs finish.
pub fn start_alert_worker(
    pipeline: AlertPipeline,
    mut receiver: mpsc::Receiver<AlertTask>,
    config: QueueConfig,
) -> JoinHandle<()> {
    let concurrency = config.concurrency.max(1);

    tokio::spawn(async move {
        info!(
            "Starting alert worker (concurrency: {}, max deliveries: {})",
            concurrency, config.max_deliveries
        );
        let permits = Arc::new(Semaphore::new(concurrency));

        while let Some(task) = receiver.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let pipeline = pipeline.clone();
            let config = config.clone();

            tokio::spawn(async move {
                deliver(&pipeline, task, &config).await;
                drop(permit);
            });
        }

        // Wait for in-flight jobs before reporting shutdown.
        let _ = permits.acquire_many(concurrency as u32).await;
        info!("Alert worker stopped");
    })
}

async fn deliver(pipeline: &AlertPipeline, mut task: AlertTask, config: &QueueConfig) {
    loop {
        let span = info_span!(
            "alert_task",
            run_key = %task.run_key,
            delivery_id = %task.delivery_id,
            delivery = task.delivery
        );
        let result = pipeline.process(&task.run_key).instrument(span.clone()).await;

        let delay = match result {
            Ok(outcome) => {
                span.in_scope(|| info!("Alert job finished: {}", outcome.as_str()));
                return;
            }
            Err(e) if task.delivery < config.max_deliveries => {
                let delay = redelivery_delay(config.redelivery_backoff, task.delivery);
                span.in_scope(|| warn!("Alert job failed: {}. Redelivering in {:?}", e, delay));
                delay
            }
            Err(e) => {
                span.in_scope(|| {
                    error!(
                        "Alert job failed after {} deliveries, dropping: {}",
                        task.delivery, e
                    )
                });
                return;
            }
        };

        tokio::time::sleep(delay).await;
        task = task.redelivery();
    }
}

fn redelivery_delay(base: Duration, delivery: u32) -> Duration {
    base * (1u32 << delivery.saturating_sub(1).min(6))
}
