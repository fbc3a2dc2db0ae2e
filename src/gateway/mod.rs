//! Messaging gateway abstraction
//!
//! The reminder engine talks to the outside world only through
//! [`MessagingGateway`]. Implementations perform exactly one provider call per
//! `send`; retrying is left to the next reminder cycle.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::models::Channel;

pub mod twilio;

pub use twilio::TwilioGateway;

/// A fully addressed outbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: Channel,
    /// Sender address, already carrying the channel prefix
    pub from: String,
    /// Destination address, already carrying the channel prefix
    pub to: String,
    pub body: String,
}

/// Successful provider acceptance. The identifier may legitimately be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_sid: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway call timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("network error: {details}")]
    Network { details: String },
    #[error("gateway rejected credentials: {details}")]
    Unauthorized { details: String },
    #[error("invalid destination '{to}': {details}")]
    InvalidDestination { to: String, details: String },
    #[error("rate limited by gateway")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("provider error (status {status}): {message}")]
    Provider {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("malformed gateway response: {details}")]
    MalformedResponse { details: String },
    #[error("gateway is not configured: {details}")]
    Configuration { details: String },
}

impl GatewayError {
    /// Text stored in the ledger for a failed attempt.
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Provider {
                code: Some(code),
                message,
                ..
            } => format!("{message} (code {code})"),
            GatewayError::RateLimited {
                retry_after_secs: Some(secs),
            } => format!("rate limited by gateway, retry after {secs}s"),
            other => other.to_string(),
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Network { .. } => "network",
            GatewayError::Unauthorized { .. } => "unauthorized",
            GatewayError::InvalidDestination { .. } => "invalid_destination",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Provider { .. } => "provider",
            GatewayError::MalformedResponse { .. } => "malformed_response",
            GatewayError::Configuration { .. } => "configuration",
        }
    }
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, GatewayError>;
}

/// One configured sender identity per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderIdentities {
    pub sms_from: Option<String>,
    pub whatsapp_from: Option<String>,
}

impl SenderIdentities {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            sms_from: config.sms_from.clone(),
            whatsapp_from: config.whatsapp_from.clone(),
        }
    }

    /// Sender address for `channel`, with the channel prefix applied.
    pub fn sender_for(&self, channel: Channel) -> Result<String, GatewayError> {
        let raw = match channel {
            Channel::Sms => self.sms_from.as_deref(),
            Channel::WhatsApp => self.whatsapp_from.as_deref(),
        }
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::Configuration {
            details: format!("no sender identity configured for {channel}"),
        })?;

        Ok(format!("{}{}", channel.address_prefix(), raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_is_prefixed_per_channel() {
        let senders = SenderIdentities {
            sms_from: Some("+15550001111".to_string()),
            whatsapp_from: Some("+15550002222".to_string()),
        };

        assert_eq!(senders.sender_for(Channel::Sms).unwrap(), "+15550001111");
        assert_eq!(
            senders.sender_for(Channel::WhatsApp).unwrap(),
            "whatsapp:+15550002222"
        );
    }

    #[test]
    fn missing_sender_is_a_configuration_error() {
        let senders = SenderIdentities {
            sms_from: Some("  ".to_string()),
            whatsapp_from: None,
        };

        assert_eq!(
            senders.sender_for(Channel::Sms).unwrap_err().kind(),
            "configuration"
        );
        assert!(senders.sender_for(Channel::WhatsApp).is_err());
    }

    #[test]
    fn provider_detail_includes_code() {
        let err = GatewayError::Provider {
            status: 400,
            code: Some(21608),
            message: "Unverified number".to_string(),
        };
        assert_eq!(err.detail(), "Unverified number (code 21608)");
        assert!(!GatewayError::Timeout { seconds: 10 }.detail().is_empty());
    }
}
