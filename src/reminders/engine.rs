//! # Reminder Engine
//!
//! One cycle walks every active tenant, finds customers with an occasion
//! inside the look-ahead window, renders the tenant's active template, picks a
//! channel, sends through the gateway and appends the outcome to the ledger.
//!
//! Failures stay contained: a lookup error ends that tenant's cycle, a gateway
//! error produces a `failed` ledger entry, and a ledger write error is only
//! logged. Only one cycle runs at a time, and the run guard is held by the
//! cycle task itself rather than by whoever awaits it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::catalog::TemplateCatalog;
use super::channel::{ChannelRejection, select_channel_with_preferences};
use super::ledger::DeliveryLedger;
use super::render::render;
use super::window::{OccasionFinder, UpcomingOccasion};
use crate::config::ReminderConfig;
use crate::error::RepositoryError;
use crate::gateway::{GatewayError, MessagingGateway, OutboundMessage, SenderIdentities};
use crate::models::reminder_template::Model as TemplateModel;
use crate::models::tenant::{Model as TenantModel, NotificationPreferences};
use crate::models::{DeliveryStatus, OccasionType};
use crate::repositories::reminder_log::NewReminderLog;
use crate::repositories::{
    CustomerRepository, ReminderLogRepository, ReminderTemplateRepository, TenantRepository,
};
use crate::telemetry::{self, TraceContext};

/// Cycle tuning resolved from configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub window_days: u32,
    pub tenant_concurrency: usize,
    pub dispatch_concurrency: usize,
    pub send_timeout: Duration,
    pub dedup_enabled: bool,
    pub max_cycle_duration: Option<Duration>,
}

impl From<&ReminderConfig> for CycleSettings {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            window_days: config.window_days,
            tenant_concurrency: config.tenant_concurrency.max(1),
            dispatch_concurrency: config.dispatch_concurrency.max(1),
            send_timeout: Duration::from_secs(config.send_timeout_seconds),
            dedup_enabled: config.dedup_enabled,
            max_cycle_duration: config.max_cycle_duration_seconds.map(Duration::from_secs),
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from(&ReminderConfig::default())
    }
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("a reminder cycle is already running")]
    AlreadyRunning,
    #[error("failed to list active tenants: {0}")]
    TenantListing(#[source] RepositoryError),
    #[error("reminder cycle task ended abnormally: {0}")]
    Interrupted(String),
}

/// Aggregate outcome of one cycle. Per-customer detail lives in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub as_of: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tenants_processed: u64,
    pub tenants_failed: u64,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub ledger_errors: u64,
}

/// Why a unit ended without a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OccasionDisabled,
    TemplateMissing,
    AlreadySent,
    DedupUnavailable,
    ChannelDisabled,
    NoAddress,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OccasionDisabled => "occasion_disabled",
            SkipReason::TemplateMissing => "template_missing",
            SkipReason::AlreadySent => "already_sent",
            SkipReason::DedupUnavailable => "dedup_unavailable",
            SkipReason::ChannelDisabled => "channel_disabled",
            SkipReason::NoAddress => "no_address",
        }
    }
}

/// Terminal state of one customer/occasion unit.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UnitOutcome {
    Skipped(SkipReason),
    Logged {
        status: DeliveryStatus,
        recorded: bool,
    },
}

#[derive(Debug, Default, Clone, Copy)]
struct TenantStats {
    sent: u64,
    failed: u64,
    skipped: u64,
    ledger_errors: u64,
}

/// A tenant whose processing stopped early, with what it dispatched before.
#[derive(Debug)]
struct TenantFailure {
    stats: TenantStats,
    error: RepositoryError,
}

impl CycleSummary {
    fn absorb(&mut self, stats: &TenantStats) {
        self.sent += stats.sent;
        self.failed += stats.failed;
        self.skipped += stats.skipped;
        self.ledger_errors += stats.ledger_errors;
    }
}

impl TenantStats {
    fn absorb(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Skipped(_) => self.skipped += 1,
            UnitOutcome::Logged { status, recorded } => {
                match status {
                    DeliveryStatus::Sent => self.sent += 1,
                    DeliveryStatus::Failed => self.failed += 1,
                }
                if !recorded {
                    self.ledger_errors += 1;
                }
            }
        }
    }
}

/// Orchestrates reminder cycles. Cheap to clone; clones share the run guard.
#[derive(Clone)]
pub struct ReminderService {
    tenants: TenantRepository,
    finder: OccasionFinder,
    templates: Arc<dyn TemplateCatalog>,
    ledger: Arc<dyn DeliveryLedger>,
    gateway: Arc<dyn MessagingGateway>,
    senders: SenderIdentities,
    settings: CycleSettings,
    running: Arc<Mutex<()>>,
}

impl ReminderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn MessagingGateway>,
        senders: SenderIdentities,
        settings: CycleSettings,
    ) -> Self {
        Self {
            tenants: TenantRepository::new(db.clone()),
            finder: OccasionFinder::new(CustomerRepository::new(db.clone())),
            templates: Arc::new(ReminderTemplateRepository::new(db.clone())),
            ledger: Arc::new(ReminderLogRepository::new(db)),
            gateway,
            senders,
            settings,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Replace the ledger (tests inject failing ledgers here).
    pub fn with_ledger(mut self, ledger: Arc<dyn DeliveryLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Replace the template source.
    pub fn with_templates(mut self, templates: Arc<dyn TemplateCatalog>) -> Self {
        self.templates = templates;
        self
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run one cycle for today's local date. Both the daily timer and the
    /// administrative trigger call this.
    pub async fn run_daily_cycle(&self) -> Result<CycleSummary, CycleError> {
        self.run_cycle_as_of(Local::now().date_naive()).await
    }

    /// Run one cycle treating `as_of` as "today".
    ///
    /// The cycle runs on its own task which owns the run guard, so dropping
    /// the returned future (for example a disconnected HTTP caller) neither
    /// stops in-flight sends nor lets another cycle start beside them.
    pub async fn run_cycle_as_of(&self, as_of: NaiveDate) -> Result<CycleSummary, CycleError> {
        let guard = self
            .running
            .clone()
            .try_lock_owned()
            .map_err(|_| CycleError::AlreadyRunning)?;

        let context = telemetry::current_trace_id()
            .map(|trace_id| TraceContext { trace_id })
            .unwrap_or_else(TraceContext::for_cycle);

        let service = self.clone();
        let cycle = tokio::spawn(telemetry::with_trace_context(context, async move {
            let _guard = guard;
            service.execute_cycle(as_of).await
        }));

        match cycle.await {
            Ok(result) => result,
            Err(err) => {
                error!(as_of = %as_of, error = ?err, "Reminder cycle task panicked");
                Err(CycleError::Interrupted(err.to_string()))
            }
        }
    }

    #[instrument(skip_all, fields(as_of = %as_of))]
    async fn execute_cycle(&self, as_of: NaiveDate) -> Result<CycleSummary, CycleError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let watchdog = self.spawn_watchdog(as_of);
        let result = self.process_all_tenants(as_of, started_at).await;
        watchdog.cancel();

        histogram!("reminder_cycle_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        let outcome = if result.is_ok() { "completed" } else { "failed" };
        counter!("reminder_cycles_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(summary) => info!(
                tenants_processed = summary.tenants_processed,
                tenants_failed = summary.tenants_failed,
                sent = summary.sent,
                failed = summary.failed,
                skipped = summary.skipped,
                ledger_errors = summary.ledger_errors,
                duration_ms = started.elapsed().as_millis() as u64,
                "Reminder cycle completed"
            ),
            Err(err) => error!(error = %err, "Reminder cycle failed"),
        }

        result
    }

    async fn process_all_tenants(
        &self,
        as_of: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Result<CycleSummary, CycleError> {
        let tenants = self
            .tenants
            .list_active()
            .await
            .map_err(CycleError::TenantListing)?;

        info!(
            tenants = tenants.len(),
            window_days = self.settings.window_days,
            "Starting reminder cycle"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.tenant_concurrency));
        let trace = telemetry::current_trace_id();
        let mut handles = Vec::with_capacity(tenants.len());

        for tenant in tenants {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let service = self.clone();
            let tenant_id = tenant.id;
            let context = TraceContext {
                trace_id: trace.clone().unwrap_or_default(),
            };

            let handle = tokio::spawn(telemetry::with_trace_context(context, async move {
                let _permit = permit;
                service.process_tenant(tenant, as_of).await
            }));
            handles.push((tenant_id, handle));
        }

        let mut summary = CycleSummary {
            as_of,
            started_at,
            finished_at: started_at,
            tenants_processed: 0,
            tenants_failed: 0,
            sent: 0,
            failed: 0,
            skipped: 0,
            ledger_errors: 0,
        };

        for (tenant_id, handle) in handles {
            match handle.await {
                Ok(Ok(stats)) => {
                    summary.tenants_processed += 1;
                    summary.absorb(&stats);
                }
                Ok(Err(failure)) => {
                    summary.tenants_failed += 1;
                    summary.absorb(&failure.stats);
                    error!(
                        tenant_id = %tenant_id,
                        error = %failure.error,
                        sent = failure.stats.sent,
                        failed = failure.stats.failed,
                        "Tenant reminder processing aborted"
                    );
                }
                Err(err) => {
                    summary.tenants_failed += 1;
                    error!(tenant_id = %tenant_id, error = ?err, "Tenant reminder task panicked or was cancelled");
                }
            }
        }

        summary.finished_at = Utc::now();
        Ok(summary)
    }

    #[instrument(skip_all, fields(tenant_id = %tenant.id))]
    async fn process_tenant(
        &self,
        tenant: TenantModel,
        as_of: NaiveDate,
    ) -> Result<TenantStats, TenantFailure> {
        let tenant_id = tenant.id;
        let preferences = tenant.preferences();
        let mut stats = TenantStats::default();

        for occasion in OccasionType::ALL {
            if !preferences.occasion_enabled(occasion) {
                info!(tenant_id = %tenant_id, occasion = %occasion, "Occasion disabled for tenant, skipping");
                counter!("reminder_skipped_total", "reason" => SkipReason::OccasionDisabled.as_str())
                    .increment(1);
                continue;
            }

            if let Err(error) = self
                .process_occasion(tenant_id, preferences, occasion, as_of, &mut stats)
                .await
            {
                return Err(TenantFailure { stats, error });
            }
        }

        debug!(
            tenant_id = %tenant_id,
            sent = stats.sent,
            failed = stats.failed,
            skipped = stats.skipped,
            ledger_errors = stats.ledger_errors,
            "Tenant reminders processed"
        );

        Ok(stats)
    }

    async fn process_occasion(
        &self,
        tenant_id: Uuid,
        preferences: NotificationPreferences,
        occasion: OccasionType,
        as_of: NaiveDate,
        stats: &mut TenantStats,
    ) -> Result<(), RepositoryError> {
        let upcoming = self
            .finder
            .find_upcoming(tenant_id, occasion, as_of, self.settings.window_days)
            .await?;
        if upcoming.is_empty() {
            debug!(tenant_id = %tenant_id, occasion = %occasion, "No upcoming occasions");
            return Ok(());
        }

        let Some(template) = self.templates.active_template(tenant_id, occasion).await? else {
            info!(
                tenant_id = %tenant_id,
                occasion = %occasion,
                customers = upcoming.len(),
                "No active template, skipping occasion"
            );
            for _ in &upcoming {
                stats.absorb(&UnitOutcome::Skipped(SkipReason::TemplateMissing));
            }
            counter!("reminder_skipped_total", "reason" => SkipReason::TemplateMissing.as_str())
                .increment(upcoming.len() as u64);
            return Ok(());
        };

        let template = Arc::new(template);
        let semaphore = Arc::new(Semaphore::new(self.settings.dispatch_concurrency));
        let trace = telemetry::current_trace_id();
        let mut handles = Vec::with_capacity(upcoming.len());

        for unit in upcoming {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let service = self.clone();
            let template = template.clone();
            let context = TraceContext {
                trace_id: trace.clone().unwrap_or_default(),
            };

            handles.push(tokio::spawn(telemetry::with_trace_context(
                context,
                async move {
                    let _permit = permit;
                    service
                        .process_unit(tenant_id, preferences, &template, unit)
                        .await
                },
            )));
        }

        for handle in handles {
            match handle.await {
                Ok(outcome) => stats.absorb(&outcome),
                Err(err) => {
                    // The unit may have dispatched before dying; count it as unrecorded
                    stats.failed += 1;
                    stats.ledger_errors += 1;
                    error!(tenant_id = %tenant_id, error = ?err, "Reminder dispatch task panicked");
                }
            }
        }

        Ok(())
    }

    #[instrument(
        skip_all,
        fields(customer_id = %unit.customer.id, occasion = %unit.occasion)
    )]
    async fn process_unit(
        &self,
        tenant_id: Uuid,
        preferences: NotificationPreferences,
        template: &TemplateModel,
        unit: UpcomingOccasion,
    ) -> UnitOutcome {
        let customer = &unit.customer;

        if self.settings.dedup_enabled {
            match self
                .ledger
                .has_sent(tenant_id, customer.id, unit.occasion, unit.occurs_on)
                .await
            {
                Ok(true) => return skip(tenant_id, &unit, SkipReason::AlreadySent),
                Ok(false) => {}
                Err(err) => {
                    error!(
                        tenant_id = %tenant_id,
                        customer_id = %customer.id,
                        error = %err,
                        "Ledger lookup failed, not sending"
                    );
                    return skip(tenant_id, &unit, SkipReason::DedupUnavailable);
                }
            }
        }

        let selection = match select_channel_with_preferences(&customer.phone, &preferences) {
            Ok(selection) => selection,
            Err(ChannelRejection::NoAddress) => {
                return skip(tenant_id, &unit, SkipReason::NoAddress);
            }
            Err(ChannelRejection::ChannelDisabled) => {
                return skip(tenant_id, &unit, SkipReason::ChannelDisabled);
            }
        };

        let body = render(&template.message, customer);
        let result = match self.senders.sender_for(selection.channel) {
            Ok(from) => {
                let message = OutboundMessage {
                    channel: selection.channel,
                    from,
                    to: selection.address.clone(),
                    body: body.clone(),
                };
                self.send_with_timeout(&message).await
            }
            Err(err) => Err(err),
        };

        let (status, error_message, message_sid) = match result {
            Ok(receipt) => {
                match receipt.message_sid.as_deref() {
                    Some(sid) => info!(
                        tenant_id = %tenant_id,
                        customer_id = %customer.id,
                        occasion = %unit.occasion,
                        channel = %selection.channel,
                        status = "sent",
                        message_sid = sid,
                        "Reminder sent"
                    ),
                    None => warn!(
                        tenant_id = %tenant_id,
                        customer_id = %customer.id,
                        occasion = %unit.occasion,
                        channel = %selection.channel,
                        status = "sent",
                        "Reminder sent, but gateway returned no message SID"
                    ),
                }
                (DeliveryStatus::Sent, None, receipt.message_sid)
            }
            Err(err) => {
                warn!(
                    tenant_id = %tenant_id,
                    customer_id = %customer.id,
                    occasion = %unit.occasion,
                    channel = %selection.channel,
                    status = "failed",
                    error_kind = err.kind(),
                    error = %err,
                    "Reminder send failed"
                );
                (DeliveryStatus::Failed, Some(err.detail()), None)
            }
        };

        counter!(
            "reminder_dispatch_total",
            "channel" => selection.channel.as_str(),
            "status" => status.as_str()
        )
        .increment(1);

        let entry = NewReminderLog {
            tenant_id,
            customer_id: customer.id,
            template_id: template.id,
            occasion_type: unit.occasion,
            occasion_date: unit.occurs_on,
            message: body,
            channel: selection.channel,
            status,
            error_message,
            message_sid,
            sent_at: Utc::now(),
        };

        let recorded = match self.ledger.record(entry).await {
            Ok(()) => true,
            Err(err) => {
                counter!("reminder_ledger_failures_total").increment(1);
                error!(
                    tenant_id = %tenant_id,
                    customer_id = %customer.id,
                    occasion = %unit.occasion,
                    status = status.as_str(),
                    error = %err,
                    "Failed to record reminder in ledger"
                );
                false
            }
        };

        UnitOutcome::Logged { status, recorded }
    }

    async fn send_with_timeout(
        &self,
        message: &OutboundMessage,
    ) -> Result<crate::gateway::SendReceipt, GatewayError> {
        let limit = self.settings.send_timeout;
        match tokio::time::timeout(limit, self.gateway.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                seconds: limit.as_secs(),
            }),
        }
    }

    // Warn-only: a long cycle is reported, never cancelled.
    fn spawn_watchdog(&self, as_of: NaiveDate) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(limit) = self.settings.max_cycle_duration {
            let child = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = child.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!(
                            as_of = %as_of,
                            limit_seconds = limit.as_secs(),
                            "Reminder cycle exceeded its expected duration"
                        );
                    }
                }
            });
        }
        token
    }
}

fn skip(tenant_id: Uuid, unit: &UpcomingOccasion, reason: SkipReason) -> UnitOutcome {
    info!(
        tenant_id = %tenant_id,
        customer_id = %unit.customer.id,
        occasion = %unit.occasion,
        reason = reason.as_str(),
        "Reminder skipped"
    );
    counter!("reminder_skipped_total", "reason" => reason.as_str()).increment(1);
    UnitOutcome::Skipped(reason)
}
