use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}
