//! Error types for the telemetry agent
//!
//! Only startup failures escape to the process entry point. Everything that
//! can go wrong inside the cadence loop or the inbound message path is logged
//! where it is detected and does not surface here.

use thiserror::Error;

/// Main error type for agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Transport error: {0}")]
    TransportError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Subscription failed: {message}")]
    SubscriptionFailed { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AgentError {
    /// Create connection failure error
    pub fn connection_failed<S: Into<String>>(message: S) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create subscription failure error
    pub fn subscription_failed<S: Into<String>>(message: S) -> Self {
        Self::SubscriptionFailed {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_connection_failed_constructor() {
        let error = AgentError::connection_failed("TLS handshake rejected");
        assert!(matches!(error, AgentError::ConnectionFailed { .. }));
        assert_eq!(error.to_string(), "Connection failed: TLS handshake rejected");
    }

    #[test]
    fn test_subscription_failed_constructor() {
        let error = AgentError::subscription_failed("control/commands");
        assert!(matches!(error, AgentError::SubscriptionFailed { .. }));
        assert_eq!(error.to_string(), "Subscription failed: control/commands");
    }

    #[test]
    fn test_internal_error_constructor() {
        let error = AgentError::internal_error("cadence task panicked");
        assert!(matches!(error, AgentError::InternalError { .. }));
        assert_eq!(error.to_string(), "Internal error: cadence task panicked");
    }

    #[test]
    fn test_config_error_conversion() {
        let error: AgentError = ConfigError::InvalidConfig("bad port".to_string()).into();
        assert!(matches!(error, AgentError::ConfigError(_)));
        assert!(error.to_string().contains("bad port"));
    }

    #[test]
    fn test_transport_error_conversion() {
        let source: Box<dyn std::error::Error + Send + Sync> = "socket closed".into();
        let error: AgentError = source.into();
        assert!(matches!(error, AgentError::TransportError(_)));
        assert_eq!(error.to_string(), "Transport error: socket closed");
    }
}
