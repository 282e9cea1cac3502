//! Gateway error types

use thiserror::Error;

/// Delivery or resolution failure reported by the messaging gateway
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RateLimit, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Rejected, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Decode, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidInput, message)
    }
}

/// Error classification, used for logging and for deciding whether the
/// polling loop should back off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection failures, timeouts
    Network,
    /// Flood control (429)
    RateLimit,
    /// Bot token refused (401, 403)
    Auth,
    /// The network refused the request (bad chat, stale message, ...)
    Rejected,
    /// Response body did not match the expected shape
    Decode,
    /// Caller handed the gateway something it cannot send
    InvalidInput,
}

impl GatewayErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit)
    }
}
