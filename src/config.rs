use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ROUNDS: usize = 10;

/// Settings for one measurement run, handed to the sampler at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    pub rounds: NonZeroUsize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            rounds: NonZeroUsize::new(DEFAULT_ROUNDS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl ProbeConfig {
    pub fn with_rounds(mut self, rounds: NonZeroUsize) -> Self {
        self.rounds = rounds;
        self
    }
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `redis://...`, `rediss://...` or `memory://` for the in-process store
    pub redis_url: String,
    pub bind_addr: String,
    pub probe: ProbeConfig,
    /// Upper bound on one whole `POST /api/test` invocation
    pub probe_timeout: Duration,
    /// Per-request timeout of the direct fetch
    pub fetch_timeout: Duration,
    pub redis_connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            probe: ProbeConfig::default(),
            probe_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(15),
            redis_connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from an arbitrary variable source; unset variables
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rounds = match lookup("PROBE_ROUNDS") {
            Some(raw) => parse_var::<NonZeroUsize>("PROBE_ROUNDS", &raw, "must be an integer >= 1")?,
            None => defaults.probe.rounds,
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            probe: ProbeConfig::default().with_rounds(rounds),
            probe_timeout: secs_var(&lookup, "PROBE_TIMEOUT_SECS", defaults.probe_timeout)?,
            fetch_timeout: secs_var(&lookup, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?,
            redis_connect_timeout: secs_var(
                &lookup,
                "REDIS_CONNECT_TIMEOUT_SECS",
                defaults.redis_connect_timeout,
            )?,
        })
    }
}

fn secs_var<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => {
            let secs = parse_var::<u64>(var, &raw, "must be a whole number of seconds")?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: raw,
                    reason: "must be greater than zero".into(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: &str, reason: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_owned(),
        reason: reason.to_owned(),
    })
}
