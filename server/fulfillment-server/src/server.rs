use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use database_layer::{DatabaseConfig, DatabasePool};
use fulfillment_service::store::{
    postgres::ensure_schema, AssignmentStore, BackendStore, FallbackLogSink, FileAssignmentStore,
    InMemoryAssignmentStore, InMemoryBackendStore, InMemoryDirectory, InMemoryPrescriptionStore,
    InMemorySystemLogSink, InMemoryTierStore, ParticipantDirectory, PgAssignmentStore,
    PgBackendStore, PgDirectory, PgPrescriptionStore, PgSystemLogSink, PgTierStore,
    PrescriptionStore, Resilient, SystemLogSink, TierStore,
};
use fulfillment_service::{
    AuditTrail, FileSystemDocumentStore, HttpPharmacyClient, PharmacyBackendRegistry,
    PricingResolver, StatusWebhookProcessor, SubmissionCoordinator, TierCatalog,
};
use logger_redacted::PiiRedactor;
use tracing::{info, warn};

use crate::config::{ServerConfig, StorageMode};

/// System log entries held in process while the database is unreachable
const DEGRADED_LOG_CAPACITY: usize = 10_000;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct FulfillmentServer {
    pub config: Arc<ServerConfig>,
    pub catalog: TierCatalog,
    pub pricing: PricingResolver,
    pub backends: PharmacyBackendRegistry,
    pub submissions: Arc<SubmissionCoordinator>,
    pub webhooks: Arc<StatusWebhookProcessor>,
    pub prescriptions: Arc<dyn PrescriptionStore>,
    /// `None` in memory storage mode
    pub database: Option<DatabasePool>,
    started_at: Instant,
}

struct Stores {
    tiers: Arc<dyn TierStore>,
    assignments: Arc<dyn AssignmentStore>,
    prescriptions: Arc<dyn PrescriptionStore>,
    backends: Arc<dyn BackendStore>,
    directory: Arc<dyn ParticipantDirectory>,
}

impl FulfillmentServer {
    /// Build the server for the configured storage mode
    ///
    /// # Errors
    ///
    /// Fails on a malformed database URL or when the pharmacy HTTP client
    /// cannot be built. An unreachable database is not an error.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        match config.storage {
            StorageMode::Memory => Self::in_memory(config),
            StorageMode::Postgres => Self::with_postgres(config).await,
        }
    }

    /// Every store in process. Participants are not checked in this mode.
    ///
    /// # Errors
    ///
    /// Fails when the pharmacy HTTP client cannot be built.
    pub fn in_memory(config: ServerConfig) -> Result<Self> {
        let audit = AuditTrail::new(Arc::new(InMemorySystemLogSink::new()), redactor(&config));
        let stores = Stores {
            tiers: Arc::new(InMemoryTierStore::new()),
            assignments: Arc::new(InMemoryAssignmentStore::new()),
            prescriptions: Arc::new(InMemoryPrescriptionStore::new()),
            backends: Arc::new(InMemoryBackendStore::new()),
            directory: Arc::new(InMemoryDirectory::accepting_all()),
        };
        info!("Using in-memory storage");
        Self::assemble(config, stores, audit, None)
    }

    /// PostgreSQL primary. Tiers fall back to process memory and provider
    /// tier assignments to a JSON file while the database is unreachable.
    ///
    /// # Errors
    ///
    /// Fails on a malformed database URL or when the pharmacy HTTP client
    /// cannot be built.
    pub async fn with_postgres(config: ServerConfig) -> Result<Self> {
        let database = DatabasePool::connect_lazy(
            &DatabaseConfig::new(config.database_url.clone())
                .with_max_connections(config.database_max_connections),
        )
        .context("invalid DATABASE_URL")?;
        let pool = database.pool().clone();

        match ensure_schema(&pool).await {
            Ok(()) => info!("Database schema ready"),
            Err(e) => warn!(error = %e, "Database unavailable at startup, tier stores will serve from fallback"),
        }

        let degraded_log: Arc<dyn SystemLogSink> =
            Arc::new(InMemorySystemLogSink::bounded(DEGRADED_LOG_CAPACITY));
        let sink: Arc<dyn SystemLogSink> = Arc::new(FallbackLogSink::new(
            Arc::new(PgSystemLogSink::new(pool.clone())),
            degraded_log.clone(),
        ));
        let audit = AuditTrail::new(sink, redactor(&config));
        // Fallback events happen while the database is down, so they skip it
        let degraded_audit = AuditTrail::new(degraded_log, redactor(&config));

        let tiers = Resilient::<dyn TierStore>::new(
            "tiers",
            Arc::new(PgTierStore::new(pool.clone())),
            Arc::new(InMemoryTierStore::new()),
            degraded_audit.clone(),
        );
        let assignments = Resilient::<dyn AssignmentStore>::new(
            "provider_tiers",
            Arc::new(PgAssignmentStore::new(pool.clone())),
            Arc::new(FileAssignmentStore::new(&config.provider_tier_fallback_path)),
            degraded_audit,
        );
        info!(
            fallback_path = %config.provider_tier_fallback_path.display(),
            "Using PostgreSQL storage"
        );

        let stores = Stores {
            tiers: Arc::new(tiers),
            assignments: Arc::new(assignments),
            prescriptions: Arc::new(PgPrescriptionStore::new(pool.clone())),
            backends: Arc::new(PgBackendStore::new(pool.clone())),
            directory: Arc::new(PgDirectory::new(pool)),
        };
        Self::assemble(config, stores, audit, Some(database))
    }

    fn assemble(
        config: ServerConfig,
        stores: Stores,
        audit: AuditTrail,
        database: Option<DatabasePool>,
    ) -> Result<Self> {
        let pharmacy = HttpPharmacyClient::new(
            config.pharmacy_api_base_url.clone(),
            config.pharmacy_api_timeout,
        )?;

        let catalog = TierCatalog::new(stores.tiers.clone(), stores.assignments.clone(), audit.clone());
        let pricing = PricingResolver::new(stores.assignments, stores.tiers);
        let backends = PharmacyBackendRegistry::new(stores.backends, audit.clone());

        let submissions = SubmissionCoordinator::new(
            stores.directory,
            pricing.clone(),
            backends.clone(),
            Arc::new(pharmacy),
            stores.prescriptions.clone(),
            Arc::new(FileSystemDocumentStore::new(&config.document_storage_path)),
            audit.clone(),
            config.pharmacy_system_type.clone(),
        );
        let webhooks = StatusWebhookProcessor::new(
            stores.prescriptions.clone(),
            audit,
            config.webhook_enforce_monotonic,
        );

        Ok(Self {
            config: Arc::new(config),
            catalog,
            pricing,
            backends,
            submissions: Arc::new(submissions),
            webhooks: Arc::new(webhooks),
            prescriptions: stores.prescriptions,
            database,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn redactor(config: &ServerConfig) -> PiiRedactor {
    if config.redact_audit_details {
        PiiRedactor::default()
    } else {
        PiiRedactor::disabled()
    }
}

impl std::fmt::Debug for FulfillmentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentServer")
            .field("storage", &self.config.storage)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}
