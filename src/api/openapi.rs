//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Testwatch Server",
        version = "0.1.0",
        description = "Test run diffing and alerting: classifies each completed run against the stored test status and mails a digest when failures change"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        api::health::health,
        api::health::ready,
        api::tasks::run_alert_job,
        api::tasks::enqueue_alert_job,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::tasks::AlertJobForm,
            api::tasks::AlertJobResponse,
            api::tasks::EnqueueAlertRequest,
            api::tasks::EnqueueAlertResponse,
            models::TestCaseResult,
            models::RunType,
            models::TestCaseReference,
            models::TestStatus,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Tasks", description = "Alert job queue callbacks")
    )
)]
pub struct ApiDoc;
