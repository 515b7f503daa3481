mod doc;
mod dtos;
mod error;
mod routes;
mod state;
mod utils;

use database::{LogNotifier, SchedulingPolicy, db::create_connection};
use log::info;
use migration::{Migrator, MigratorTrait};
use state::AppState;
use std::{env, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utils::shutdown::shutdown_signal;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let db = create_connection()
        .await
        .expect("Failed to connect to the database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let policy = SchedulingPolicy::from_env();
    info!(
        "Scheduling policy: horizon {} days, initiation lead {} min, batches of {}",
        policy.horizon_days,
        policy.initiate_lead.num_minutes(),
        policy.batch_size
    );

    let timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let request_timeout = Duration::from_secs(timeout_secs);

    let state = AppState {
        db,
        notifier: Arc::new(LogNotifier),
        policy,
        request_timeout,
    };

    let (router, api) = routes::router(state);
    let app = router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CompressionLayer::new()),
        );

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");
    info!("Running axum on http://{bind_addr}, docs at /docs");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
