use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::fetch::Fetcher;
use crate::store::{KvConnection, KvStore};

/// Value written under the probed key; only its presence matters.
pub const CACHE_MARKER: &str = "true";

/// Index-aligned samples in whole milliseconds: `uncached[i]` and
/// `cached[i]` come from the same round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub cached: Vec<u64>,
    pub uncached: Vec<u64>,
}

impl ProbeResult {
    fn with_capacity(rounds: usize) -> Self {
        Self {
            cached: Vec::with_capacity(rounds),
            uncached: Vec::with_capacity(rounds),
        }
    }
}

/// Accepts absolute `http`/`https` URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(raw).map_err(|e| ProbeError::Validation {
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProbeError::Validation {
                message: format!("unsupported scheme {other:?}"),
            })
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProbeError::Validation {
            message: "missing host".into(),
        });
    }

    Ok(url)
}

/// Measures direct-fetch latency against a cache round trip for one URL.
///
/// Cheap to clone; every call to [`Sampler::measure`] opens its own cache
/// connection, so concurrent probes share nothing but the backends.
#[derive(Clone)]
pub struct Sampler {
    store: Arc<dyn KvStore>,
    fetcher: Arc<dyn Fetcher>,
    config: ProbeConfig,
}

impl Sampler {
    pub fn new(store: Arc<dyn KvStore>, fetcher: Arc<dyn Fetcher>, config: ProbeConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn rounds(&self) -> usize {
        self.config.rounds.get()
    }

    /// Runs every round or fails as a whole; no partial series is returned.
    ///
    /// The connection is closed on every path that reaches it. If this
    /// future is dropped mid-round the connection's `Drop` releases it and
    /// removes a key written in the interrupted round.
    pub async fn measure(&self, target: &str) -> Result<ProbeResult, ProbeError> {
        let url = validate_url(target)?;
        let probe_id = uuid::Uuid::new_v4();
        let span = info_span!("probe", %probe_id, url = %url);

        let outcome = self.probe(target, &url).instrument(span.clone()).await;
        span.in_scope(|| match &outcome {
            Ok(result) => info!(
                rounds = result.uncached.len(),
                uncached_ms = ?result.uncached,
                cached_ms = ?result.cached,
                "probe complete"
            ),
            Err(e) => warn!(kind = e.kind(), error = %e, "probe failed"),
        });
        outcome
    }

    async fn probe(&self, key: &str, url: &Url) -> Result<ProbeResult, ProbeError> {
        let mut conn = self
            .store
            .connect()
            .await
            .map_err(|e| ProbeError::Connection {
                message: e.to_string(),
            })?;

        let outcome = self.run_rounds(&mut *conn, key, url).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "closing cache connection failed");
        }
        outcome
    }

    async fn run_rounds(
        &self,
        conn: &mut dyn KvConnection,
        key: &str,
        url: &Url,
    ) -> Result<ProbeResult, ProbeError> {
        let rounds = self.rounds();
        let mut result = ProbeResult::with_capacity(rounds);

        for round in 0..rounds {
            // ── Uncached: straight to the origin ────────────────────
            let t0 = Instant::now();
            self.fetcher
                .fetch(url)
                .await
                .map_err(|e| ProbeError::measurement(round, e))?;
            let uncached = elapsed_ms(t0);

            // Untimed write so the read below is a hit.
            conn.set(key, CACHE_MARKER)
                .await
                .map_err(|e| ProbeError::measurement(round, e))?;

            // ── Cached: store round trip ────────────────────────────
            let t2 = Instant::now();
            let read = conn.get(key).await;
            let cached = elapsed_ms(t2);

            // Clean up before surfacing a read failure so the key never outlives the probe.
            if let Err(e) = conn.del(key).await {
                let warning = ProbeError::Cleanup {
                    round,
                    message: e.to_string(),
                };
                warn!(kind = warning.kind(), error = %warning, "probe key left behind");
            }

            match read.map_err(|e| ProbeError::measurement(round, e))? {
                Some(_) => {}
                None => warn!(round, "cache read missed a key written in the same round"),
            }

            debug!(round, uncached, cached, "round complete");
            result.uncached.push(uncached);
            result.cached.push(cached);
        }

        Ok(result)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
