use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::sampler::ProbeResult;
use crate::AppState;

use super::AppError;

// ─── Request type ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub url: String,
}

// ─── POST /api/test ──────────────────────────────────────────────

/// The dashboard posts the JSON as plain text, so the body is parsed by
/// hand instead of through the `Json` extractor's content-type check.
pub async fn run_probe(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ProbeResult>, AppError> {
    let req: ProbeRequest = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;

    // Dropping the probe future on expiry cancels the in-flight call and
    // releases its cache connection.
    let result = tokio::time::timeout(state.probe_timeout, state.sampler.measure(&req.url))
        .await
        .map_err(|_| AppError::Timeout(state.probe_timeout))??;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::fetch::HttpFetcher;
    use crate::sampler::Sampler;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(store: &MemoryStore, probe_timeout: Duration) -> Arc<AppState> {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        Arc::new(AppState {
            sampler: Sampler::new(
                Arc::new(store.clone()),
                Arc::new(fetcher),
                ProbeConfig::default(),
            ),
            probe_timeout,
        })
    }

    async fn call(state: Arc<AppState>, body: &str) -> (StatusCode, serde_json::Value) {
        let response: Response = run_probe(State(state), body.to_owned())
            .await
            .into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn returns_both_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let store = MemoryStore::new();

        let body = serde_json::json!({ "url": server.uri() }).to_string();
        let (status, json) = call(state(&store, Duration::from_secs(30)), &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cached"].as_array().unwrap().len(), 10);
        assert_eq!(json["uncached"].as_array().unwrap().len(), 10);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_url_is_bad_request() {
        let store = MemoryStore::new();
        let (status, json) = call(
            state(&store, Duration::from_secs(30)),
            r#"{"url":"not a url"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Please provide a valid URL"));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let store = MemoryStore::new();
        let (status, json) = call(state(&store, Duration::from_secs(30)), "{url:").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn slow_origin_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        let store = MemoryStore::new();

        let body = serde_json::json!({ "url": server.uri() }).to_string();
        let (status, json) = call(state(&store, Duration::from_millis(200)), &body).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(json["error"].is_string());
        assert!(store.is_empty());
    }
}
