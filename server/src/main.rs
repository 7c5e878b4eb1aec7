use anyhow::{Context, Result};
use app_core::{Core, CoreBuilder, DatabasePort, PunchReadout};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use db_json::JsonDb;
use printer_escpos::MuxSink;
use serde::Serialize;
use serde_json::json;
use std::{env, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, prelude::*};

#[derive(Clone)]
struct AppState {
    core: Arc<Core>,
    printer_device: Option<String>,
}

fn init_tracing_bunyan() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,axum=info"));

    // Name identifies the service in log streams
    let formatting_layer = BunyanFormattingLayer::new(
        "o-race-center".into(),
        std::io::stdout, // single sink: JSON to stdout
    );

    // Build a Bunyan-only subscriber:
    // - JsonStorageLayer: propagates span fields to child events
    // - BunyanFormattingLayer: strict Bunyan JSON output
    // - ErrorLayer: enrich errors with span context
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

// --- /health (service liveness) ---
#[instrument(name = "health")]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// --- /health/db (store readiness) ---
#[derive(Serialize)]
struct DbStatus {
    db: &'static str,
}

#[instrument(name = "health_db", skip(app_state))]
async fn health_db(State(app_state): State<AppState>) -> impl IntoResponse {
    match app_state.core.database.ping_db().await {
        Ok(_) => (StatusCode::OK, Json(DbStatus { db: "ok" })),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DbStatus { db: "down" }),
        ),
    }
}

// --- POST /card (readout ingestion) ---
#[instrument(name = "receive_card", skip(app_state, body))]
async fn receive_card(State(app_state): State<AppState>, body: Bytes) -> Response {
    let readout: PunchReadout = match serde_json::from_slice(&body) {
        Ok(readout) => readout,
        Err(e) => {
            info!(error = %e, "readout_rejected");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "validation failed", "details": e.to_string() })),
            )
                .into_response();
        }
    };

    // every readout acquires its own sink; a dead printer only mutes paper
    let mut sink = MuxSink::open(app_state.printer_device.as_deref());
    match app_state.core.process_readout(&readout, &mut sink).await {
        Ok(outcome) => {
            info!(
                card_number = readout.card_number,
                status = %outcome.status,
                receipt = %sink.lines().join("\n"),
                "readout_processed"
            );
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => {
            error!(card_number = readout.card_number, error = %e, "readout_failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// --- GET /results (kiosk polling) ---
#[instrument(name = "results", skip(app_state))]
async fn results(State(app_state): State<AppState>) -> Response {
    let day = match app_state.core.current_day().await {
        Ok(day) => day,
        Err(e) => {
            error!(error = %e, "results_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };
    match app_state.core.results_for_day(day).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => {
            error!(error = %e, "results_failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // Load .env first if present; ignore if missing (Docker sets envs)
    let _ = dotenvy::dotenv();
    // map all log! calls in dependencies to tracing
    LogTracer::init()?;
    init_tracing_bunyan()?;

    let db = match env::var("ORC_DB_PATH") {
        Ok(path) if !path.is_empty() => JsonDb::open(&path)
            .with_context(|| format!("opening event database {path}"))?,
        _ => JsonDb::in_memory(),
    };
    let core = CoreBuilder::new().set_db(Arc::new(db)).build();
    let app_state = AppState {
        core: Arc::new(core),
        printer_device: env::var("ORC_PRINTER_DEVICE").ok().filter(|d| !d.is_empty()),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        .route("/card", post(receive_card))
        .route("/results", get(results))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = env::var("ORC_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:12345".to_string());
    info!(%addr, "listening on http server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
