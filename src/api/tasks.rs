//! Alert job task endpoints.
//!
//! `POST /tasks/alert_job` is the queue callback that runs one job inline.
//! `POST /tasks/alert_job/enqueue` hands a run key to the in-process queue.

use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::models::RunKey;
use crate::services::{AlertPipeline, AlertQueue, JobOutcome};

/// Form body of a queue callback.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AlertJobForm {
    /// Run key in the form `<test_name>:<run_id>`
    pub run_key: String,
}

/// Result of running an alert job.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertJobResponse {
    pub run_key: String,
    /// invalid_key, already_processed, no_update, stale or committed
    pub outcome: String,
    /// Digest headline when a digest applies
    pub headline: Option<String>,
    pub notified: bool,
}

impl AlertJobResponse {
    fn from_outcome(run_key: &RunKey, outcome: JobOutcome) -> Self {
        let (headline, notified) = match outcome {
            JobOutcome::Committed { headline, notified } => {
                (headline.map(|h| h.as_str().to_string()), notified)
            }
            _ => (None, false),
        };
        AlertJobResponse {
            run_key: run_key.to_string(),
            outcome: outcome.as_str().to_string(),
            headline,
            notified,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnqueueAlertRequest {
    pub run_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnqueueAlertResponse {
    pub run_key: String,
    /// Identifier shared by every delivery of this job
    pub delivery_id: String,
}

/// Run the alert job for a completed run.
///
/// A malformed run key is acknowledged with 200 so the queue drops it.
/// Commit failures return 5xx so the queue redelivers.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/alert_job",
    tag = "Tasks",
    request_body(content = AlertJobForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Job processed or dropped", body = AlertJobResponse),
        (status = 500, description = "Store failure, redeliver"),
        (status = 503, description = "Commit retries exhausted, redeliver")
    )
)]
#[post("/tasks/alert_job")]
#[instrument(name = "tasks.alert_job", skip(pipeline, form))]
pub async fn run_alert_job(
    pipeline: web::Data<AlertPipeline>,
    form: web::Form<AlertJobForm>,
) -> AppResult<HttpResponse> {
    let run_key = match RunKey::parse(&form.run_key) {
        Ok(key) => key,
        Err(e) => {
            warn!("Dropping alert job: {}", e);
            return Ok(HttpResponse::Ok().json(AlertJobResponse {
                run_key: form.run_key.clone(),
                outcome: "invalid_key".to_string(),
                headline: None,
                notified: false,
            }));
        }
    };

    let outcome = pipeline.process(&run_key).await?;
    info!(run_key = %run_key, outcome = outcome.as_str(), "Alert job done");

    Ok(HttpResponse::Ok().json(AlertJobResponse::from_outcome(&run_key, outcome)))
}

/// Enqueue the alert job for a completed run.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/alert_job/enqueue",
    tag = "Tasks",
    request_body = EnqueueAlertRequest,
    responses(
        (status = 202, description = "Job enqueued", body = EnqueueAlertResponse),
        (status = 400, description = "Invalid run key"),
        (status = 503, description = "Queue full or closed")
    )
)]
#[post("/tasks/alert_job/enqueue")]
pub async fn enqueue_alert_job(
    queue: web::Data<AlertQueue>,
    body: web::Json<EnqueueAlertRequest>,
) -> AppResult<HttpResponse> {
    let run_key = RunKey::parse(&body.run_key)?;
    let delivery_id = queue.enqueue(run_key.clone()).map_err(|e| {
        warn!("Failed to enqueue {}: {}", run_key, e);
        e
    })?;

    Ok(HttpResponse::Accepted().json(EnqueueAlertResponse {
        run_key: run_key.to_string(),
        delivery_id: delivery_id.to_string(),
    }))
}

/// Configure task routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(enqueue_alert_job).service(run_alert_job);
}

