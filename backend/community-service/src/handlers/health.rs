use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::error;

use crate::config::StorageBackend;
use crate::db::AdminRepository;
use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    checks: HashMap<&'static str, ComponentCheck>,
    timestamp: String,
}

/// Liveness: the process is up and serving
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        service: "community-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness: the store answers
///
/// Returns 503 when the database cannot be reached.
pub async fn ready(state: web::Data<AppState>) -> impl Responder {
    let start = Instant::now();
    let backend = match state.config.database.backend {
        StorageBackend::Postgres => "postgresql",
        StorageBackend::Memory => "memory",
    };

    let check = match state.store.ping().await {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: format!("{} store reachable", backend),
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("{} store unreachable: {}", backend, e),
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
    };

    let ready = check.status == ComponentStatus::Healthy;
    let response = ReadinessResponse {
        ready,
        checks: HashMap::from([("store", check)]),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
