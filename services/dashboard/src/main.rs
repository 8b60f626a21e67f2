//! Dashboard Service - Deck performance over the tournament store
//!
//! Endpoints:
//! - GET / - Scatter plot page (or an empty-state message)
//! - GET /chart.json - Plotly figure JSON
//! - GET /performance - Classified deck statistics
//! - GET /health - Health check
//!
//! The store is opened read-only; the ETL service is the only writer.

mod chart;
mod performance;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use performance::{PerformanceError, PerformanceReport};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

const EMPTY_MESSAGE: &str = "No deck data found to display.";

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Empty results are a 404 with a readable message; query failures are 500s
fn performance_error_response(err: &PerformanceError) -> Response {
    match err {
        PerformanceError::Empty => error_response(StatusCode::NOT_FOUND, EMPTY_MESSAGE),
        PerformanceError::Query(e) => {
            tracing::error!(error = %e, "Performance query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn load_report(state: &AppState) -> Result<PerformanceReport, PerformanceError> {
    performance::deck_performance(&state.pool).await
}

async fn performance_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_report(&state).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => performance_error_response(&e),
    }
}

async fn chart_json_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_report(&state).await {
        Ok(report) => Json(chart::figure(&report)).into_response(),
        Err(e) => performance_error_response(&e),
    }
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match load_report(&state).await {
        Ok(report) => Html(chart::render_page(&report)).into_response(),
        Err(PerformanceError::Empty) => {
            tracing::warn!("No deck data to plot");
            Html(chart::render_empty(EMPTY_MESSAGE)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build dashboard page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(chart::render_empty(&format!("Error processing data: {}", e))),
            )
                .into_response()
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/chart.json", get(chart_json_handler))
        .route("/performance", get(performance_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Main
// ============================================================================

/// Read-only pool; waits on the writer's lock instead of failing
async fn connect_read_only(path: &Path) -> anyhow::Result<SqlitePool> {
    anyhow::ensure!(
        path.exists(),
        "Database not found at {}. Run the ETL first.",
        path.display()
    );

    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let db_path = PathBuf::from(
        std::env::var("DASHBOARD_DB_PATH")
            .unwrap_or_else(|_| "data/refined/tournaments.sqlite".to_string()),
    );
    let bind = std::env::var("DASHBOARD_BIND").unwrap_or_else(|_| "127.0.0.1:8501".to_string());

    tracing::info!(path = %db_path.display(), "Opening database");
    let pool = connect_read_only(&db_path).await?;

    let app = router(Arc::new(AppState { pool }));

    tracing::info!("Dashboard listening on http://{}", bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
