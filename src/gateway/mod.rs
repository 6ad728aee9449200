//! HTTP Gateway
//!
//! ```text
//! /v1/health                                GET
//! /v1/transactions                          POST   ─┐
//! /v1/transactions/{transaction_id}         GET     ├─ idempotency ▸ dlq ▸ handler
//! /v1/transactions/{transaction_id}/status  POST   ─┘
//! /v1/dlq/processes                         POST
//! /v1/dlq/processes/{process_id}            GET, DELETE
//! /docs                                     Swagger UI
//! ```

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Build the complete router (also used by black-box tests)
pub fn build_router(state: Arc<AppState>) -> Router {
    // `route_layer` wraps outward: the last layer added runs first
    let transaction_routes = Router::new()
        .route("/transactions", post(handlers::create_transaction))
        .route(
            "/transactions/{transaction_id}",
            get(handlers::get_transaction),
        )
        .route(
            "/transactions/{transaction_id}/status",
            post(handlers::update_transaction_status),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::dlq_middleware,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::idempotency_middleware,
        ));

    let dlq_routes = Router::new()
        .route("/processes", post(handlers::register_dlq_process))
        .route(
            "/processes/{process_id}",
            get(handlers::get_dlq_process).delete(handlers::delete_dlq_process),
        );

    Router::new()
        .route("/v1/health", get(handlers::health_check))
        .nest("/v1", transaction_routes)
        .nest("/v1/dlq", dlq_routes)
        .with_state(state)
        // Stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves
pub async fn run_server<F>(
    host: &str,
    port: u16,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        )
    })?;

    info!(addr = %addr, "Gateway listening");
    info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Gateway stopped");
    Ok(())
}
