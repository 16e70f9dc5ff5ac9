use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    registered_drivers: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub drivers: HealthCheck,
    pub checked_at: String,
}

pub fn router(registered_drivers: usize) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { registered_drivers })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    registered_drivers: usize,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(serve_error) = axum::serve(listener, router(registered_drivers)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %serve_error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let drivers = driver_check(state.registered_drivers);
    let ready = drivers.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "banter-server runtime initialized".to_string(),
        },
        drivers,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn driver_check(registered_drivers: usize) -> HealthCheck {
    if registered_drivers > 0 {
        HealthCheck {
            status: "ready",
            detail: format!("{registered_drivers} driver(s) registered"),
        }
    } else {
        HealthCheck { status: "degraded", detail: "no drivers registered".to_string() }
    }
}
