// 🌐 REST API - sales notes endpoints (Axum)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::db::{get_all_records, FinancialRecord};
use crate::migrate::{migrate, MigrationReport};
use crate::sales_log::{parse_sales_log, MonthData};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }
}

#[derive(Serialize)]
struct ItemsResponse<T> {
    items: T,
}

#[derive(Serialize)]
struct ReportResponse {
    report: MigrationReport,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Pull the `text` field out of a `{ "text": string }` body.
///
/// Axum's own JSON rejection would answer 415/422; the notes endpoints
/// always answer 400 with an `error` body instead.
fn require_text(body: Result<Json<Value>, JsonRejection>) -> Result<String, Response> {
    let Json(value) = body.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected notes body");
        error_response(StatusCode::BAD_REQUEST, "Request body must be JSON")
    })?;

    match value.get("text") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(error_response(StatusCode::BAD_REQUEST, "`text` must be a string")),
        None => Err(error_response(StatusCode::BAD_REQUEST, "Missing `text`")),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/notes/parse - Parse a sales log into months
async fn parse_notes(body: Result<Json<Value>, JsonRejection>) -> Response {
    let text = match require_text(body) {
        Ok(text) => text,
        Err(response) => return response,
    };

    let items: Vec<MonthData> = parse_sales_log(&text);
    tracing::info!(months = items.len(), "sales notes parsed");

    (StatusCode::OK, Json(ItemsResponse { items })).into_response()
}

/// POST /api/notes/migrate - Parse and persist as financial records
async fn migrate_notes(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let text = match require_text(body) {
        Ok(text) => text,
        Err(response) => return response,
    };

    let months = parse_sales_log(&text);
    let mut conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"),
    };

    match migrate(&mut conn, &months) {
        Ok(report) => (StatusCode::OK, Json(ReportResponse { report })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "migration failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Migration failed: {}", e))
        }
    }
}

/// GET /api/records - All stored financial records
async fn list_records(State(state): State<AppState>) -> Response {
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"),
    };

    match get_all_records(&conn) {
        Ok(items) => {
            (StatusCode::OK, Json(ItemsResponse::<Vec<FinancialRecord>> { items })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load records");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to load records: {}", e))
        }
    }
}

/// Build the API router, nested under `/api`
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/notes/parse", post(parse_notes))
        .route("/notes/migrate", post(migrate_notes))
        .route("/records", get(list_records))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
