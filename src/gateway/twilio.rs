//! Twilio Messages API client
//!
//! `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json`, form encoded,
//! HTTP basic auth with the account SID and auth token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use super::{GatewayError, MessagingGateway, OutboundMessage, SendReceipt};
use crate::config::GatewayConfig;

// Provider codes that mean the destination itself is unusable
const INVALID_DESTINATION_CODES: &[i64] = &[21211, 21212, 21408, 21610, 21612, 21614, 63024];

/// Error body returned by the provider on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

struct Credentials {
    account_sid: String,
    auth_token: Zeroizing<String>,
}

pub struct TwilioGateway {
    client: reqwest::Client,
    api_base: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl std::fmt::Debug for TwilioGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioGateway")
            .field("api_base", &self.api_base)
            .field("configured", &self.credentials.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TwilioGateway {
    /// Build a client from configuration. Missing credentials are allowed here
    /// (local profile); every send then fails with a configuration error.
    pub fn from_config(config: &GatewayConfig, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Configuration {
                details: format!("failed to build http client: {e}"),
            })?;

        let credentials = match (&config.account_sid, &config.auth_token) {
            (Some(sid), Some(token)) if !sid.trim().is_empty() && !token.trim().is_empty() => {
                Some(Credentials {
                    account_sid: sid.trim().to_string(),
                    auth_token: Zeroizing::new(token.trim().to_string()),
                })
            }
            _ => None,
        };

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials,
            timeout,
        })
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, account_sid
        )
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            GatewayError::Network {
                details: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl MessagingGateway for TwilioGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, GatewayError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| GatewayError::Configuration {
                details: "gateway credentials are not set".to_string(),
            })?;

        let form = [
            ("To", message.to.as_str()),
            ("From", message.from.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url(&credentials.account_sid))
            .basic_auth(&credentials.account_sid, Some(credentials.auth_token.as_str()))
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if status.is_success() {
            let resource: MessageResource =
                serde_json::from_str(&body).map_err(|e| GatewayError::MalformedResponse {
                    details: e.to_string(),
                })?;
            let message_sid = resource.sid.filter(|sid| !sid.trim().is_empty());
            debug!(channel = %message.channel, ?message_sid, "gateway accepted message");
            return Ok(SendReceipt { message_sid });
        }

        let parsed: Option<ProviderErrorBody> = serde_json::from_str(&body).ok();
        let code = parsed.as_ref().and_then(|b| b.code);
        let provider_message = parsed
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown provider error")
                    .to_string()
            });

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
                details: provider_message,
            },
            StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited {
                retry_after_secs: retry_after,
            },
            _ if code.is_some_and(|c| INVALID_DESTINATION_CODES.contains(&c)) => {
                GatewayError::InvalidDestination {
                    to: message.to.clone(),
                    details: provider_message,
                }
            }
            _ => GatewayError::Provider {
                status: status.as_u16(),
                code,
                message: provider_message,
            },
        })
    }
}
