//! # Authentication
//!
//! Operator bearer authentication for every `/reminders` route, plus the
//! `X-Tenant-Id` header that scopes template and ledger routes to one salon.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized, validation_error};
use crate::server::AppState;

pub const TENANT_HEADER: &str = "X-Tenant-Id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantId(pub Uuid);

/// Marker inserted once the bearer token has been verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorAuth;

/// Tenant scope taken from `X-Tenant-Id`
#[derive(Debug, Clone, Copy)]
pub struct TenantExtension(pub TenantId);

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Validate the operator bearer token. A present `X-Tenant-Id` must be a
/// UUID; whether it is required is decided by the [`TenantExtension`]
/// extractor on each route.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();

    let token = extract_bearer_token(headers)?;
    validate_token(&config, token)?;

    let tenant = extract_tenant_id(headers)?;

    if let Some(tenant) = tenant {
        tracing::debug!(tenant_id = %tenant.0, "Authenticated operator request");
        request.extensions_mut().insert(TenantExtension(tenant));
    } else {
        tracing::debug!("Authenticated operator request without tenant scope");
    }
    request.extensions_mut().insert(OperatorAuth);

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

fn extract_tenant_id(headers: &HeaderMap) -> Result<Option<TenantId>, ApiError> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        validation_error(
            "Invalid tenant header",
            serde_json::json!({ TENANT_HEADER: "Header must be valid UTF-8" }),
        )
    })?;

    value.trim().parse::<Uuid>().map(|id| Some(TenantId(id))).map_err(|_| {
        validation_error(
            "Invalid tenant ID",
            serde_json::json!({ TENANT_HEADER: "Must be a valid UUID" }),
        )
    })
}

/// OpenAPI header parameter for X-Tenant-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct TenantHeader {
    /// Salon (tenant) identifier scoping the request
    #[serde(rename = "X-Tenant-Id")]
    #[param(rename = "X-Tenant-Id", value_type = String)]
    pub tenant_id: String,
}

impl<S> FromRequestParts<S> for TenantExtension
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantExtension>()
            .copied()
            .ok_or_else(|| {
                validation_error(
                    "Missing required header",
                    serde_json::json!({ TENANT_HEADER: "Required header is missing" }),
                )
            })
    }
}

impl<S> FromRequestParts<S> for OperatorAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Operator authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    fn config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            operator_tokens: vec!["test-token-123".to_string()],
            ..Default::default()
        })
    }

    async fn scoped(TenantExtension(tenant): TenantExtension, _auth: OperatorAuth) -> String {
        tenant.0.to_string()
    }

    async fn unscoped(_auth: OperatorAuth) -> &'static str {
        "OK"
    }

    fn app() -> Router {
        Router::new()
            .route("/scoped", get(scoped))
            .route("/unscoped", get(unscoped))
            .layer(axum::middleware::from_fn_with_state(config(), auth_middleware))
    }

    fn request(uri: &str, token: Option<&str>, tenant: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_or_wrong_token_is_unauthorized() {
        let response = app()
            .oneshot(request("/unscoped", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(request("/unscoped", Some("nope"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unscoped_route_accepts_token_alone() {
        let response = app()
            .oneshot(request("/unscoped", Some("test-token-123"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scoped_route_requires_tenant_header() {
        let response = app()
            .oneshot(request("/scoped", Some("test-token-123"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app()
            .oneshot(request("/scoped", Some("test-token-123"), Some("not-a-uuid")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let tenant = Uuid::new_v4().to_string();
        let response = app()
            .oneshot(request("/scoped", Some("test-token-123"), Some(&tenant)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
