use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{reading_body, TemperatureReading},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings();
    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;

    info!(
        %addr,
        api = %settings.api_name,
        site = %settings.site_name,
        shape = ?settings.response_shape,
        "lake endpoint server listening"
    );
    let app = build_router(AppState {
        settings: Arc::new(settings),
    });
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/hello/:name", get(hello))
        .route("/api/:name", get(api_reading))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn hello(Path(name): Path<String>) -> String {
    format!("Nice to meet you, {name}!")
}

async fn api_reading(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ApiError>)> {
    let settings = &state.settings;
    if name != settings.api_name {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                ErrorCode::NotFound,
                format!("no reading published under '{name}'"),
            )),
        ));
    }

    let reading = TemperatureReading::new(settings.site_name.clone(), settings.temperature);
    debug!(api = %name, temp = reading.temp, "serving temperature reading");
    Ok(Json(reading_body(settings.response_shape, &reading)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
