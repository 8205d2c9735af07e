use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::{error, trace};

use crate::api::state::AppState;

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    timestamp: String,
    uptime: f64,
    database: &'static str,
    environment: String,
}

#[derive(Debug, Serialize)]
struct HealthFailure {
    status: &'static str,
    error: String,
    database: &'static str,
}

/// 存活探针 + 数据库连通性
pub struct HealthService;

impl HealthService {
    pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
        trace!("Received health check request");

        match state.links.ping().await {
            Ok(()) => HttpResponse::Ok().json(HealthReport {
                status: "OK",
                timestamp: chrono::Utc::now().to_rfc3339(),
                uptime: state.started_at.elapsed().as_secs_f64(),
                database: "Connected",
                environment: state.environment.as_ref().to_string(),
            }),
            Err(e) => {
                error!("Health check failed: {}", e);
                let error = if state.environment == crate::config::Environment::Production {
                    "Database unreachable".to_string()
                } else {
                    e.message()
                };
                HttpResponse::ServiceUnavailable().json(HealthFailure {
                    status: "ERROR",
                    error,
                    database: "Disconnected",
                })
            }
        }
    }
}
