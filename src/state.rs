use crate::config::AppConfig;
use crate::error::FatalRunError;
use crate::ledger::RunLedger;
use crate::platform::{BackupService, InventoryService, NotificationSink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Explicit per-run session: collaborator handles, config, RNG, and the
/// failure ledger. Constructed once at run start and passed by reference —
/// never ambient state.
pub struct RunContext {
    pub inventory: Arc<dyn InventoryService>,
    pub backup: Arc<dyn BackupService>,
    pub notifier: Arc<dyn NotificationSink>,
    pub config: AppConfig,
    pub rng: Mutex<StdRng>,
    pub ledger: Mutex<RunLedger>,
}

impl RunContext {
    pub fn new(
        inventory: Arc<dyn InventoryService>,
        backup: Arc<dyn BackupService>,
        notifier: Arc<dyn NotificationSink>,
        config: AppConfig,
    ) -> Result<Self, FatalRunError> {
        let ledger = RunLedger::new(&config.ledger_dir)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            inventory,
            backup,
            notifier,
            config,
            rng: Mutex::new(rng),
            ledger: Mutex::new(ledger),
        })
    }

    /// Deliver a notification, logging (not propagating) sink failures.
    pub async fn notify(&self, machine: &str, reason: &str) {
        if let Err(e) = self.notifier.notify(machine, reason).await {
            tracing::warn!(machine = %machine, error = %e, "Notification delivery failed");
        }
    }
}
