//! # Reminder API Handlers
//!
//! Template management and ledger inspection for one salon, plus the
//! administrative trigger for a reminder cycle.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{OperatorAuth, TenantExtension};
use crate::error::{ApiError, validation_error};
use crate::models::OccasionType;
use crate::models::reminder_log::ReminderLogResponse;
use crate::models::reminder_template::{Model as TemplateModel, ReminderTemplateResponse};
use crate::reminders::{CycleError, CycleSummary};
use crate::repositories::reminder_template::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::repositories::{ReminderLogRepository, ReminderTemplateRepository};
use crate::server::AppState;

const DEFAULT_LOG_LIMIT: u64 = 50;
const MAX_LOG_LIMIT: u64 = 200;

/// Body for creating a template
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTemplateBody {
    #[schema(example = "birthday")]
    pub occasion_type: String,
    #[schema(example = "Happy birthday [CustomerName]! Enjoy 20% off this week.")]
    pub message: String,
    /// Defaults to true
    pub is_active: Option<bool>,
}

/// Partial template update
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTemplateBody {
    pub occasion_type: Option<String>,
    pub message: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplatesResponse {
    pub templates: Vec<ReminderTemplateResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Maximum number of entries (default 50, max 200)
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogsResponse {
    pub logs: Vec<ReminderLogResponse>,
}

/// Acknowledgement for a completed cycle. Per-customer outcomes are in the ledger.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunCycleResponse {
    #[schema(example = "completed")]
    pub status: String,
    #[schema(example = "2025-03-07")]
    pub as_of: String,
    pub started_at: String,
    pub finished_at: String,
    pub tenants_processed: u64,
    pub tenants_failed: u64,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub ledger_errors: u64,
}

impl From<CycleSummary> for RunCycleResponse {
    fn from(summary: CycleSummary) -> Self {
        Self {
            status: "completed".to_string(),
            as_of: summary.as_of.to_string(),
            started_at: summary.started_at.to_rfc3339(),
            finished_at: summary.finished_at.to_rfc3339(),
            tenants_processed: summary.tenants_processed,
            tenants_failed: summary.tenants_failed,
            sent: summary.sent,
            failed: summary.failed,
            skipped: summary.skipped,
            ledger_errors: summary.ledger_errors,
        }
    }
}

fn parse_occasion(raw: &str) -> Result<OccasionType, ApiError> {
    raw.parse::<OccasionType>().map_err(|_| {
        validation_error(
            "Invalid occasion_type",
            serde_json::json!({ "occasion_type": "Must be one of: birthday, anniversary" }),
        )
    })
}

fn parse_template_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        validation_error(
            "Invalid template id",
            serde_json::json!({ "id": "Must be a valid UUID" }),
        )
    })
}

fn to_response(model: TemplateModel) -> Result<ReminderTemplateResponse, ApiError> {
    ReminderTemplateResponse::try_from(model).map_err(|err| anyhow::anyhow!(err).into())
}

/// List the tenant's templates
#[utoipa::path(
    get,
    path = "/reminders/templates",
    security(("bearer_auth" = [])),
    params(crate::auth::TenantHeader),
    responses(
        (status = 200, description = "Templates for the tenant", body = TemplatesResponse),
        (status = 400, description = "Missing or invalid tenant header", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<TemplatesResponse>, ApiError> {
    let repo = ReminderTemplateRepository::new(state.db.clone());
    let templates = repo
        .list(tenant.0)
        .await?
        .into_iter()
        .map(to_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(TemplatesResponse { templates }))
}

/// Create a template; one per occasion type
#[utoipa::path(
    post,
    path = "/reminders/templates",
    security(("bearer_auth" = [])),
    params(crate::auth::TenantHeader),
    request_body = CreateTemplateBody,
    responses(
        (status = 201, description = "Template created", body = ReminderTemplateResponse),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "Template for this type already exists", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn create_template(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
    body: Result<Json<CreateTemplateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ReminderTemplateResponse>), ApiError> {
    let Json(body) = body?;
    let occasion_type = parse_occasion(&body.occasion_type)?;

    let repo = ReminderTemplateRepository::new(state.db.clone());
    let created = repo
        .create(
            tenant.0,
            CreateTemplateRequest {
                occasion_type,
                message: body.message,
                is_active: body.is_active.unwrap_or(true),
            },
        )
        .await?;

    tracing::info!(
        tenant_id = %tenant.0,
        template_id = %created.id,
        occasion = %occasion_type,
        "Reminder template created"
    );

    Ok((StatusCode::CREATED, Json(to_response(created)?)))
}

#[utoipa::path(
    get,
    path = "/reminders/templates/{id}",
    security(("bearer_auth" = [])),
    params(
        crate::auth::TenantHeader,
        ("id" = String, Path, description = "Template id (UUID)")
    ),
    responses(
        (status = 200, description = "Template", body = ReminderTemplateResponse),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn get_template(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
) -> Result<Json<ReminderTemplateResponse>, ApiError> {
    let template_id = parse_template_id(&id)?;
    let repo = ReminderTemplateRepository::new(state.db.clone());

    let template = repo.get(tenant.0, template_id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Template not found")
    })?;

    Ok(Json(to_response(template)?))
}

#[utoipa::path(
    patch,
    path = "/reminders/templates/{id}",
    security(("bearer_auth" = [])),
    params(
        crate::auth::TenantHeader,
        ("id" = String, Path, description = "Template id (UUID)")
    ),
    request_body = UpdateTemplateBody,
    responses(
        (status = 200, description = "Updated template", body = ReminderTemplateResponse),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 404, description = "Template not found", body = ApiError),
        (status = 409, description = "Template for this type already exists", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn update_template(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
    body: Result<Json<UpdateTemplateBody>, JsonRejection>,
) -> Result<Json<ReminderTemplateResponse>, ApiError> {
    let Json(body) = body?;
    let template_id = parse_template_id(&id)?;
    let occasion_type = body.occasion_type.as_deref().map(parse_occasion).transpose()?;

    let repo = ReminderTemplateRepository::new(state.db.clone());
    let updated = repo
        .update(
            tenant.0,
            template_id,
            UpdateTemplateRequest {
                occasion_type,
                message: body.message,
                is_active: body.is_active,
            },
        )
        .await?;

    Ok(Json(to_response(updated)?))
}

#[utoipa::path(
    delete,
    path = "/reminders/templates/{id}",
    security(("bearer_auth" = [])),
    params(
        crate::auth::TenantHeader,
        ("id" = String, Path, description = "Template id (UUID)")
    ),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let template_id = parse_template_id(&id)?;
    let repo = ReminderTemplateRepository::new(state.db.clone());
    repo.delete(tenant.0, template_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Ledger entries for the tenant, newest first
#[utoipa::path(
    get,
    path = "/reminders/logs",
    security(("bearer_auth" = [])),
    params(crate::auth::TenantHeader, LogsQuery),
    responses(
        (status = 200, description = "Ledger entries", body = LogsResponse),
        (status = 400, description = "Invalid limit", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    TenantExtension(tenant): TenantExtension,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = match query.limit {
        None => DEFAULT_LOG_LIMIT,
        Some(0) => {
            return Err(validation_error(
                "Invalid limit",
                serde_json::json!({ "limit": "Minimum allowed limit is 1" }),
            ));
        }
        Some(limit) if limit > MAX_LOG_LIMIT => {
            return Err(validation_error(
                "Invalid limit",
                serde_json::json!({ "limit": format!("Maximum allowed limit is {MAX_LOG_LIMIT}") }),
            ));
        }
        Some(limit) => limit,
    };

    let repo = ReminderLogRepository::new(state.db.clone());
    let logs = repo
        .list_by_tenant(tenant.0, limit)
        .await?
        .into_iter()
        .map(ReminderLogResponse::from)
        .collect();

    Ok(Json(LogsResponse { logs }))
}

/// Run a reminder cycle now, across all active tenants
#[utoipa::path(
    post,
    path = "/reminders/run",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cycle completed", body = RunCycleResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "A cycle is already running", body = ApiError),
        (status = 500, description = "Cycle task ended abnormally", body = ApiError),
        (status = 503, description = "Tenants could not be listed", body = ApiError)
    ),
    tag = "reminders"
)]
pub async fn run_cycle(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<RunCycleResponse>, ApiError> {
    tracing::info!("Reminder cycle requested by operator");

    match state.reminder_service.run_daily_cycle().await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(CycleError::AlreadyRunning) => Err(ApiError::new(
            StatusCode::CONFLICT,
            "CYCLE_IN_PROGRESS",
            "A reminder cycle is already running",
        )),
        Err(CycleError::TenantListing(err)) => {
            tracing::error!(error = %err, "Reminder cycle could not list tenants");
            Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Reminder cycle could not start",
            ))
        }
        Err(err @ CycleError::Interrupted(_)) => {
            tracing::error!(error = %err, "Reminder cycle did not finish");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Reminder cycle did not finish",
            ))
        }
    }
}
