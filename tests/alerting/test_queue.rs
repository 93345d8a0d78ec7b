//! In-process queue delivery.

use std::time::Duration;

use testwatch_lib::config::QueueConfig;
use testwatch_lib::models::RunKey;
use testwatch_lib::models::TestCaseResult::*;
use testwatch_lib::services::{start_alert_worker, AlertQueue};

use super::test_helpers::*;

fn queue_config(max_deliveries: u32) -> QueueConfig {
    QueueConfig {
        capacity: 16,
        max_deliveries,
        concurrency: 2,
        redelivery_backoff: Duration::from_millis(1),
    }
}

#[actix_rt::test]
async fn test_worker_processes_enqueued_jobs() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    h.seed_run(T0 + HOUR, &[("X", Fail)]);

    let (queue, receiver) = AlertQueue::channel(16);
    let worker = start_alert_worker(h.pipeline.clone(), receiver, queue_config(3));

    let first = queue.enqueue(RunKey::new(TEST_NAME, T0)).unwrap();
    let second = queue.enqueue(RunKey::new(TEST_NAME, T0 + HOUR)).unwrap();
    assert_ne!(first, second);

    drop(queue);
    worker.await.unwrap();

    assert_eq!(h.store.status(TEST_NAME).unwrap().timestamp, T0 + HOUR);
}

#[actix_rt::test]
async fn test_failed_job_is_redelivered() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    // Exhaust every commit attempt of the first delivery.
    h.store.inject_outages(3);

    let (queue, receiver) = AlertQueue::channel(4);
    let worker = start_alert_worker(h.pipeline.clone(), receiver, queue_config(2));
    queue.enqueue(RunKey::new(TEST_NAME, T0)).unwrap();

    drop(queue);
    worker.await.unwrap();

    assert_eq!(h.store.status(TEST_NAME).unwrap().timestamp, T0);
    assert_eq!(h.mailer.sent().len(), 1);
}

#[actix_rt::test]
async fn test_job_dropped_after_max_deliveries() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    h.store.inject_outages(6);

    let (queue, receiver) = AlertQueue::channel(4);
    let worker = start_alert_worker(h.pipeline.clone(), receiver, queue_config(2));
    queue.enqueue(RunKey::new(TEST_NAME, T0)).unwrap();

    drop(queue);
    worker.await.unwrap();

    assert!(h.store.status(TEST_NAME).is_none());
}
