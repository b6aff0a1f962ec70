use thiserror::Error;

/// Whether a failure is worth another delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Retry may succeed (network blips, busy downstreams).
    Transient,
    /// Retrying cannot help (malformed payload, unknown routing key that a
    /// handler chose to reject).
    Permanent,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Handler error: {message}")]
    Handler {
        message: String,
        category: ErrorCategory,
    },
}

impl BrokerError {
    /// A handler failure that should be retried.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// A handler failure that should be dropped after acknowledging.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            // Broken connections and timeouts recover; ConnectionManager
            // reconnects underneath us.
            Self::Redis(_) => ErrorCategory::Transient,
            Self::Serialization(_) | Self::Config(_) => ErrorCategory::Permanent,
            Self::Handler { category, .. } => *category,
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_categories() {
        assert_eq!(
            BrokerError::transient("redis down").category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            BrokerError::permanent("bad payload").category(),
            ErrorCategory::Permanent
        );
    }

    #[test]
    fn test_serialization_error_is_permanent() {
        let err: BrokerError = serde_json::from_slice::<String>(b"not-json")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }
}
