//! Service health endpoint.

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

/// State for the health endpoint. Kept separate from [`crate::AppState`]
/// so tests that exercise handlers against in-memory stores need no
/// database.
pub struct HealthState {
    db_pool: PgPool,
}

impl HealthState {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }
}

/// Report service liveness and database reachability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up"),
        (status = 503, description = "Database is unreachable")
    )
)]
pub async fn health_check(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "blog-service"
        })),
    }
}
