//! Testwatch server - main entry point.
//!
//! Starts the Actix-web server with the alert task routes and the in-process
//! alert worker.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use testwatch_lib::api::{self, ApiDoc};
use testwatch_lib::config::Config;
use testwatch_lib::db::DbPool;
use testwatch_lib::middleware;
use testwatch_lib::services::{start_alert_worker, AlertPipeline, AlertQueue, SmtpMailer};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, SMTP_USERNAME and SMTP_PASSWORD must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Testwatch Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development defaults for DATABASE_URL and SMTP");
    }

    let pool = DbPool::connect(&config.database)
        .await
        .expect("Failed to connect to database");
    info!("Database connection established");

    pool.run_migrations()
        .await
        .expect("Failed to run migrations");

    let mailer = SmtpMailer::new(&config.smtp).expect("Failed to configure SMTP transport");
    info!(
        "Mail relay: {}:{} (starttls: {})",
        config.smtp.host, config.smtp.port, config.smtp.starttls
    );

    let store = Arc::new(pool.clone());
    let pipeline = AlertPipeline::new(
        store.clone(),
        store,
        Arc::new(mailer),
        config.alert.clone(),
    );

    let (queue, receiver) = AlertQueue::channel(config.queue.capacity);
    let worker = start_alert_worker(pipeline.clone(), receiver, config.queue.clone());
    info!(
        "Alert worker started (capacity: {}, concurrency: {})",
        config.queue.capacity, config.queue.concurrency
    );

    let bind_address = config.bind_address();
    let worker_count = if config.is_development() {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(pipeline.clone()))
            .app_data(web::Data::new(queue.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_task_routes),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run();

    server.await?;

    // Server closure dropped every queue handle; drain in-flight jobs.
    if let Err(e) = worker.await {
        error!("Alert worker panicked: {}", e);
    }

    Ok(())
}
