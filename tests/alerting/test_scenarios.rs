//! Classification scenarios driven through the full pipeline.

use testwatch_lib::models::TestCaseResult::*;
use testwatch_lib::models::{
    RunKey, RunType, TestCase, TestCaseBatch, TestCaseReference, TestRun, TestStatus,
};
use testwatch_lib::services::digest::Headline;
use testwatch_lib::services::JobOutcome;

use super::test_helpers::*;

fn key(run_id: i64) -> RunKey {
    RunKey::new(TEST_NAME, run_id)
}

/// Seed a processed run at `T0` where `failing` cases failed, and a matching status.
fn seed_prior_failures(h: &Harness, failing: &[&str]) {
    let cases: Vec<_> = failing.iter().map(|name| (*name, Fail)).collect();
    h.seed_run(T0, &cases);
    let refs = (0..failing.len())
        .map(|offset| TestCaseReference::new(T0, offset as u32))
        .collect();
    h.store
        .put_status(TestStatus::with_results(TEST_NAME, T0, 0, refs));
}

#[actix_rt::test]
async fn test_fixed_case_leaves_failing_set() {
    let h = Harness::new();
    seed_prior_failures(&h, &["X"]);
    h.seed_run(T0 + HOUR, &[("X", Pass)]);

    let outcome = h.pipeline.process(&key(T0 + HOUR)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::AllFixed),
            notified: true
        }
    );
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.timestamp, T0 + HOUR);
    assert_eq!(status.passing_count, 1);
    assert!(status.failing_cases.is_empty());

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html_body.contains("All test cases passed"));
    assert!(sent[0].html_body.contains("<i>X</i>"));
}

#[actix_rt::test]
async fn test_new_failure_references_breakage() {
    let h = Harness::new();
    h.seed_run(T0, &[("A", Pass), ("X", Fail)]);

    let outcome = h.pipeline.process(&key(T0)).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::NewFailure),
            ..
        }
    ));
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.failing_cases, vec![TestCaseReference::new(T0, 1)]);
    assert_eq!(status.failing_count, 1);
    assert_eq!(status.passing_count, 1);

    let sent = h.mailer.sent();
    assert_eq!(sent[0].subject, "Test Alert: VtsKernelTest @ 06/15/2017");
    assert!(sent[0].html_body.contains("<b>X</b>"));
    assert!(sent[0].html_body.contains("build ID(s): 4455."));
    assert_eq!(sent[0].recipients, vec!["owner@example.com"]);
}

#[actix_rt::test]
async fn test_skipped_failure_carries_forward() {
    let h = Harness::new();
    seed_prior_failures(&h, &["Y"]);
    h.seed_run(T0 + HOUR, &[("Y", Skip)]);

    let outcome = h.pipeline.process(&key(T0 + HOUR)).await.unwrap();

    // Nothing worth a digest: the only change is a skipped failure.
    assert_eq!(
        outcome,
        JobOutcome::Committed {
            headline: None,
            notified: false
        }
    );
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.timestamp, T0 + HOUR);
    assert_eq!(status.failing_cases, vec![TestCaseReference::new(T0, 0)]);
    assert!(h.mailer.sent().is_empty());
}

#[actix_rt::test]
async fn test_transient_failure_is_not_fixed() {
    let h = Harness::new();
    seed_prior_failures(&h, &["Z"]);
    h.seed_run(T0 + HOUR, &[("Z", Fail)]);
    h.seed_run(T0 + 2 * HOUR, &[("Z", Pass)]);

    let outcome = h.pipeline.process(&key(T0 + 2 * HOUR)).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::TransientFailure),
            ..
        }
    ));
    let status = h.store.status(TEST_NAME).unwrap();
    assert!(status.failing_cases.is_empty());
    assert_eq!(status.passing_count, 1);

    let body = &h.mailer.sent()[0].html_body;
    assert!(body.contains("transient test case failures occurred"));
    assert!(!body.contains("were fixed"));
}

#[actix_rt::test]
async fn test_continued_failure_keeps_first_reference() {
    let h = Harness::new();
    seed_prior_failures(&h, &["X"]);
    h.seed_run(T0 + HOUR, &[("X", Fail)]);

    let outcome = h.pipeline.process(&key(T0 + HOUR)).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::ContinuedFailure),
            ..
        }
    ));
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.failing_cases, vec![TestCaseReference::new(T0, 0)]);
    assert!(h.mailer.sent()[0].html_body.contains("Continuous test case failure(s)"));
}

#[actix_rt::test]
async fn test_unrecognised_result_keeps_batch_readable() {
    let h = Harness::new();
    seed_prior_failures(&h, &["X"]);
    h.store.insert_raw_batch(
        T0,
        serde_json::json!([
            {"name": "X", "result": "fail"},
            {"name": "Y", "result": "flaky"}
        ]),
    );
    h.seed_run(T0 + HOUR, &[("X", Fail), ("Y", Pass)]);

    let outcome = h.pipeline.process(&key(T0 + HOUR)).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::ContinuedFailure),
            ..
        }
    ));
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.failing_cases, vec![TestCaseReference::new(T0, 0)]);
    assert_eq!(status.passing_count, 1);
}

#[actix_rt::test]
async fn test_replay_changes_nothing() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);

    h.pipeline.process(&key(T0)).await.unwrap();
    let first = h.store.status(TEST_NAME).unwrap();

    let outcome = h.pipeline.process(&key(T0)).await.unwrap();
    assert_eq!(outcome, JobOutcome::AlreadyProcessed);
    assert_eq!(h.store.status(TEST_NAME).unwrap(), first);
    assert_eq!(h.store.status_writes(), 1);
    assert_eq!(h.mailer.sent().len(), 1);
}

#[actix_rt::test]
async fn test_out_of_order_delivery_never_rewinds() {
    let h = Harness::new();
    h.seed_run(T0, &[("X", Fail)]);
    h.seed_run(T0 + HOUR, &[("X", Pass)]);

    h.pipeline.process(&key(T0 + HOUR)).await.unwrap();
    let outcome = h.pipeline.process(&key(T0)).await.unwrap();

    assert_eq!(outcome, JobOutcome::AlreadyProcessed);
    assert_eq!(h.store.status(TEST_NAME).unwrap().timestamp, T0 + HOUR);
}

#[actix_rt::test]
async fn test_timestamps_never_decrease() {
    let h = Harness::new();
    let run_ids = [T0 + 3 * HOUR, T0, T0 + HOUR, T0 + 5 * HOUR, T0 + 4 * HOUR];
    for run_id in run_ids {
        h.seed_run(run_id, &[("X", Pass)]);
    }

    let mut last = 0;
    for run_id in run_ids {
        h.pipeline.process(&key(run_id)).await.unwrap();
        let timestamp = h.store.status(TEST_NAME).unwrap().timestamp;
        assert!(timestamp >= last);
        last = timestamp;
    }
    assert_eq!(last, T0 + 5 * HOUR);
}

#[actix_rt::test]
async fn test_empty_window_commits_nothing() {
    let h = Harness::new();
    // A presubmit-only history produces no postsubmit window.
    h.store.insert_run(TestRun {
        test_name: TEST_NAME.to_string(),
        run_id: T0,
        end_timestamp: T0 + 1,
        run_type: RunType::Presubmit,
        pass_count: 0,
        fail_count: 1,
        test_case_ids: vec![],
        build_ids: vec![],
    });

    let outcome = h.pipeline.process(&key(T0)).await.unwrap();

    assert_eq!(outcome, JobOutcome::NoUpdate);
    assert!(h.store.status(TEST_NAME).is_none());
    assert_eq!(h.store.status_writes(), 0);
    assert!(h.mailer.sent().is_empty());
}

#[actix_rt::test]
async fn test_window_is_capped_at_lookback() {
    let h = Harness::new();
    // Failure older than the lookback window is not observed.
    h.seed_run(T0, &[("X", Fail)]);
    h.seed_run(T0 + 30 * HOUR, &[("X", Pass)]);

    let outcome = h.pipeline.process(&key(T0 + 30 * HOUR)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Committed {
            headline: None,
            notified: false
        }
    );
}

#[actix_rt::test]
async fn test_corrupt_records_are_skipped() {
    let h = Harness::new();
    h.store.insert_malformed_run(TEST_NAME, T0);
    h.seed_run(T0 + HOUR, &[("A", Pass)]);
    h.store
        .insert_raw_batch(T0 + HOUR, serde_json::json!({"garbage": true}));
    h.seed_run(T0 + 2 * HOUR, &[("X", Fail)]);

    let outcome = h.pipeline.process(&key(T0 + 2 * HOUR)).await.unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::NewFailure),
            ..
        }
    ));
    let status = h.store.status(TEST_NAME).unwrap();
    assert_eq!(status.failing_count, 1);
    assert_eq!(status.passing_count, 0);
}

#[actix_rt::test]
async fn test_mail_failure_keeps_commit() {
    let h = Harness::with_mailer(RecordingMailer::failing());
    h.seed_run(T0, &[("X", Fail)]);

    let outcome = h.pipeline.process(&key(T0)).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::NewFailure),
            notified: false
        }
    );
    assert_eq!(h.store.status(TEST_NAME).unwrap().timestamp, T0);
}

#[actix_rt::test]
async fn test_no_subscribers_sends_nothing() {
    let h = Harness::new();
    let other = RunKey::new("UnwatchedTest", T0);
    h.store.insert_run(TestRun {
        test_name: other.test_name.clone(),
        run_id: T0,
        end_timestamp: T0 + 1,
        run_type: RunType::Postsubmit,
        pass_count: 0,
        fail_count: 1,
        test_case_ids: vec![T0],
        build_ids: vec![],
    });
    h.store.insert_batch(&TestCaseBatch::new(
        T0,
        vec![TestCase::new("X", Fail)],
    ));

    let outcome = h.pipeline.process(&other).await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Committed {
            headline: Some(Headline::NewFailure),
            notified: false
        }
    );
    assert!(h.mailer.sent().is_empty());
}

#[actix_rt::test]
async fn test_build_ids_are_deduplicated() {
    let h = Harness::new();
    h.seed_run_with_build(T0, &[("X", Pass)], "200");
    h.seed_run_with_build(T0 + HOUR, &[("X", Fail)], "100");
    h.seed_run_with_build(T0 + 2 * HOUR, &[("X", Fail)], "200");

    h.pipeline.process(&key(T0 + 2 * HOUR)).await.unwrap();

    assert!(h.mailer.sent()[0].html_body.contains("build ID(s): 100,200."));
}
