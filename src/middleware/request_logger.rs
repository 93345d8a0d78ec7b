//! Request logging middleware.
//!
//! Task callbacks carry the delivering queue's task name and retry count in
//! headers; both are attached to the request log lines when present.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderMap;
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;
use tracing::{error, info, warn};

pub const TASK_NAME_HEADER: &str = "x-task-name";
pub const TASK_RETRY_HEADER: &str = "x-task-retry-count";

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
}

fn header_or<'a>(headers: &'a HeaderMap, name: &str, fallback: &'a str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback)
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let task_name = header_or(req.headers(), TASK_NAME_HEADER, "-").to_string();
        let task_retry = header_or(req.headers(), TASK_RETRY_HEADER, "0").to_string();

        info!(
            target: "api",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            task = %task_name,
            retry = %task_retry,
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let elapsed = start.elapsed().as_millis();
            let status = res.status();

            if status.is_success() {
                info!(
                    target: "api",
                    method = %method,
                    path = %path,
                    task = %task_name,
                    status = status.as_u16(),
                    duration_ms = %elapsed,
                    "← Request completed"
                );
            } else if status.is_client_error() {
                warn!(
                    target: "api",
                    method = %method,
                    path = %path,
                    task = %task_name,
                    status = status.as_u16(),
                    duration_ms = %elapsed,
                    "← Client error"
                );
            } else {
                error!(
                    target: "api",
                    method = %method,
                    path = %path,
                    task = %task_name,
                    retry = %task_retry,
                    status = status.as_u16(),
                    duration_ms = %elapsed,
                    "← Server error, task will be redelivered"
                );
            }

            Ok(res)
        })
    }
}
