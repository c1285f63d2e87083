use thiserror::Error;

/// Failure of a single probe invocation.
///
/// `Cleanup` is never returned from [`crate::sampler::Sampler::measure`];
/// it is built when a key deletion fails so the warning carries the same
/// shape as the fatal kinds when it is logged.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Please provide a valid URL: {message}")]
    Validation { message: String },

    #[error("Cannot connect to cache store: {message}")]
    Connection { message: String },

    #[error("Measurement failed in round {round}: {message}")]
    Measurement { round: usize, message: String },

    #[error("Failed to delete probe key in round {round}: {message}")]
    Cleanup { round: usize, message: String },
}

impl ProbeError {
    pub fn measurement(round: usize, err: impl std::fmt::Display) -> Self {
        Self::Measurement {
            round,
            message: err.to_string(),
        }
    }

    /// Stable short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Connection { .. } => "connection",
            Self::Measurement { .. } => "measurement",
            Self::Cleanup { .. } => "cleanup",
        }
    }
}

/// Error raised by a cache store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connect: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("{op} {key:?}: {message}")]
    Command {
        op: &'static str,
        key: String,
        message: String,
    },

    #[error("connection already closed")]
    Closed,
}

impl StoreError {
    pub fn command(op: &'static str, key: &str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            op,
            key: key.to_owned(),
            message: err.to_string(),
        }
    }
}

/// Transport-level failure of the direct fetch.
#[derive(Debug, Error)]
#[error("GET {url} failed: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid cache URL {url:?}: {reason}")]
    CacheUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_round_index() {
        let err = ProbeError::measurement(3, "GET boom");
        assert_eq!(err.to_string(), "Measurement failed in round 3: GET boom");
        assert_eq!(err.kind(), "measurement");
    }

    #[test]
    fn store_command_error_names_operation_and_key() {
        let err = StoreError::command("GET", "https://example.com/", "io error");
        assert_eq!(
            err.to_string(),
            "GET \"https://example.com/\": io error"
        );
    }
}
