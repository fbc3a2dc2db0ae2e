//! # Server Configuration
//!
//! Router, shared state, OpenAPI document and the serve loop.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::get,
    routing::post,
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::reminders::ReminderService;
use crate::telemetry::{self, TRACE_ID_HEADER, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub reminder_service: Arc<ReminderService>,
}

/// Scope each request in a trace context and echo the id back.
async fn trace_id_middleware(request: Request, next: Next) -> Response {
    let context = TraceContext::from_header(
        request
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let trace_id = context.trace_id.clone();

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/reminders/templates",
            get(handlers::reminders::list_templates).post(handlers::reminders::create_template),
        )
        .route(
            "/reminders/templates/{id}",
            get(handlers::reminders::get_template)
                .patch(handlers::reminders::update_template)
                .delete(handlers::reminders::delete_template),
        )
        .route("/reminders/logs", get(handlers::reminders::list_logs))
        .route("/reminders/run", post(handlers::reminders::run_cycle))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` fires, then drain in-flight requests.
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.config.bind_addr()?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::reminders::list_templates,
        crate::handlers::reminders::create_template,
        crate::handlers::reminders::get_template,
        crate::handlers::reminders::update_template,
        crate::handlers::reminders::delete_template,
        crate::handlers::reminders::list_logs,
        crate::handlers::reminders::run_cycle,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::OccasionType,
            crate::models::Channel,
            crate::models::DeliveryStatus,
            crate::models::reminder_template::ReminderTemplateResponse,
            crate::models::reminder_log::ReminderLogResponse,
            crate::handlers::HealthResponse,
            crate::handlers::reminders::CreateTemplateBody,
            crate::handlers::reminders::UpdateTemplateBody,
            crate::handlers::reminders::TemplatesResponse,
            crate::handlers::reminders::LogsResponse,
            crate::handlers::reminders::RunCycleResponse,
            crate::error::ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service info and probes"),
        (name = "reminders", description = "Occasion reminder templates, ledger and trigger")
    ),
    info(
        title = "Salon Reminders API",
        description = "Birthday and anniversary reminder notifications for salons",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
