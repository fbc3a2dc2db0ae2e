//! Messaging gateway tests against a mocked provider API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reminders::config::GatewayConfig;
use reminders::gateway::{GatewayError, MessagingGateway, OutboundMessage, TwilioGateway};
use reminders::models::Channel;

const ACCOUNT_SID: &str = "ACtest0000000000000000000000000000";
const AUTH_TOKEN: &str = "test-auth-token";
const MESSAGES_PATH: &str = "/2010-04-01/Accounts/ACtest0000000000000000000000000000/Messages.json";

fn gateway_for(server: &MockServer, timeout: Duration) -> TwilioGateway {
    let config = GatewayConfig {
        api_base: server.uri(),
        account_sid: Some(ACCOUNT_SID.to_string()),
        auth_token: Some(AUTH_TOKEN.to_string()),
        ..Default::default()
    };
    TwilioGateway::from_config(&config, timeout).unwrap()
}

fn whatsapp_message() -> OutboundMessage {
    OutboundMessage {
        channel: Channel::WhatsApp,
        from: "whatsapp:+15550000002".to_string(),
        to: "whatsapp:+447700900000".to_string(),
        body: "Happy birthday Ana".to_string(),
    }
}

#[tokio::test]
async fn accepted_message_returns_sid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(basic_auth(ACCOUNT_SID, AUTH_TOKEN))
        .and(body_string_contains("To=whatsapp%3A%2B447700900000"))
        .and(body_string_contains("From=whatsapp%3A%2B15550000002"))
        .and(body_string_contains("Body=Happy+birthday+Ana"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM0123456789abcdef0123456789abcdef",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let receipt = gateway.send(&whatsapp_message()).await.unwrap();

    assert_eq!(
        receipt.message_sid.as_deref(),
        Some("SM0123456789abcdef0123456789abcdef")
    );
}

#[tokio::test]
async fn accepted_message_without_sid_is_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "status": "queued" })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let receipt = gateway.send(&whatsapp_message()).await.unwrap();

    assert!(receipt.message_sid.is_none());
}

#[tokio::test]
async fn invalid_number_maps_to_invalid_destination() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number whatsapp:+447700900000 is not a valid phone number.",
            "status": 400
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    match err {
        GatewayError::InvalidDestination { to, details } => {
            assert_eq!(to, "whatsapp:+447700900000");
            assert!(details.contains("not a valid phone number"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_credentials_map_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 20003,
            "message": "Authenticate",
            "status": 401
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Unauthorized { ref details } if details == "Authenticate"));
    assert_eq!(err.kind(), "unauthorized");
}

#[tokio::test]
async fn throttling_carries_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .append_header("Retry-After", "30")
                .set_body_json(json!({ "code": 20429, "message": "Too Many Requests" })),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::RateLimited {
            retry_after_secs: Some(30)
        }
    );
    assert!(err.detail().contains("retry after 30s"));
}

#[tokio::test]
async fn server_error_keeps_status_and_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "code": 20500,
            "message": "Service temporarily unavailable"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::Provider {
            status: 503,
            code: Some(20500),
            message: "Service temporarily unavailable".to_string(),
        }
    );
    assert_eq!(err.detail(), "Service temporarily unavailable (code 20500)");
}

#[tokio::test]
async fn error_without_body_falls_back_to_status_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::Provider {
            status: 502,
            code: None,
            message: "Bad Gateway".to_string(),
        }
    );
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(5));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert!(matches!(err, GatewayError::MalformedResponse { .. }));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "sid": "SMslow" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(1));
    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert_eq!(err, GatewayError::Timeout { seconds: 1 });
}

#[tokio::test]
async fn unreachable_provider_is_network_error() {
    let config = GatewayConfig {
        api_base: "http://127.0.0.1:9".to_string(),
        account_sid: Some(ACCOUNT_SID.to_string()),
        auth_token: Some(AUTH_TOKEN.to_string()),
        ..Default::default()
    };
    let gateway = TwilioGateway::from_config(&config, Duration::from_secs(2)).unwrap();

    let err = gateway.send(&whatsapp_message()).await.unwrap_err();

    assert_eq!(err.kind(), "network");
}
