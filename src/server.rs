use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes, middleware, and static serving.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Probe ───────────────────────────────────────────────
        .route("/api/test", post(handlers::probe::run_probe))
        .route("/api/health", get(handlers::health::health))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Serve static/ directory for the dashboard ───────────
        .fallback_service(ServeDir::new("static"))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::fetch::HttpFetcher;
    use crate::sampler::Sampler;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn_app(store: &MemoryStore) -> String {
        let state = Arc::new(AppState {
            sampler: Sampler::new(
                Arc::new(store.clone()),
                Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap()),
                ProbeConfig::default(),
            ),
            probe_timeout: Duration::from_secs(30),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn plain_text_body_is_accepted() {
        let origin = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&origin)
            .await;
        let store = MemoryStore::new();
        let base = spawn_app(&store).await;

        // Same shape the dashboard sends: JSON text, no content type.
        let response = reqwest::Client::new()
            .post(format!("{base}/api/test"))
            .body(format!(r#"{{"url":"{}"}}"#, origin.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert!(response.headers().contains_key("x-response-time-us"));
        assert!(response.headers()["server-timing"]
            .to_str()
            .unwrap()
            .starts_with("probe;dur="));

        let text = response.text().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["cached"].as_array().unwrap().len(), 10);
        assert_eq!(json["uncached"].as_array().unwrap().len(), 10);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let store = MemoryStore::new();
        let base = spawn_app(&store).await;

        let response = reqwest::get(format!("{base}/api/health")).await.unwrap();
        assert!(response.headers()["server-timing"]
            .to_str()
            .unwrap()
            .starts_with("api;dur="));

        let text = response.text().await.unwrap();
        assert_eq!(text, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn dashboard_assets_are_not_timed() {
        let store = MemoryStore::new();
        let base = spawn_app(&store).await;

        let response = reqwest::get(format!("{base}/index.html")).await.unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert!(!response.headers().contains_key("x-response-time-us"));
        assert!(!response.headers().contains_key("server-timing"));
    }
}
