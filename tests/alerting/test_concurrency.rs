//! Concurrent and retried status commits.

use std::sync::Arc;
use std::time::Duration;

use testwatch_lib::error::AppError;
use testwatch_lib::models::TestCaseResult::*;
use testwatch_lib::models::{RunKey, TestStatus};
use testwatch_lib::services::committer::{CommitOutcome, StatusCommitter};
use testwatch_lib::services::JobOutcome;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_newest_commit_wins_in_either_order() {
    for order in [[100, 90], [90, 100]] {
        let h = Harness::new();
        let committer = StatusCommitter::new(h.store.clone(), 10, Duration::from_millis(1));

        let handles: Vec<_> = order
            .iter()
            .map(|timestamp| {
                let committer = committer.clone();
                let candidate = TestStatus::with_results(TEST_NAME, *timestamp, 0, vec![]);
                tokio::spawn(async move { committer.commit(&candidate).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(h.store.status(TEST_NAME).unwrap().timestamp, 100);
        assert!(outcomes.contains(&CommitOutcome::Committed));
    }
}

#[actix_rt::test]
async fn test_concurrent_jobs_for_one_test() {
    let h = Arc::new(Harness::new());
    h.seed_run(T0, &[("X", Fail)]);
    h.seed_run(T0 + HOUR, &[("X", Pass)]);

    let jobs: Vec<_> = [T0 + HOUR, T0, T0 + HOUR]
        .into_iter()
        .map(|run_id| {
            let pipeline = h.pipeline.clone();
            tokio::spawn(async move { pipeline.process(&RunKey::new(TEST_NAME, run_id)).await })
        })
        .collect();

    for job in jobs {
        job.await.unwrap().unwrap();
    }

    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.timestamp, T0 + HOUR);
    assert!(status.failing_cases.is_empty());
}

#[actix_rt::test]
async fn test_conflicts_are_retried() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    h.store.inject_conflicts(2);

    let outcome = h
        .pipeline
        .process(&RunKey::new(TEST_NAME, T0))
        .await
        .unwrap();

    assert!(matches!(outcome, JobOutcome::Committed { .. }));
    assert_eq!(h.store.status_writes(), 1);
}

#[actix_rt::test]
async fn test_exhausted_retries_surface_and_leave_no_state() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    h.store.inject_outages(3);

    let err = h
        .pipeline
        .process(&RunKey::new(TEST_NAME, T0))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RetriesExhausted { attempts: 3, .. }));
    assert!(h.store.status(TEST_NAME).is_none());
    assert!(h.mailer.sent().is_empty());

    // Redelivery after the outage succeeds.
    let outcome = h
        .pipeline
        .process(&RunKey::new(TEST_NAME, T0))
        .await
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Committed { notified: true, .. }));
}
