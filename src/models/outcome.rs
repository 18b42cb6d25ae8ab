use serde::Serialize;

/// How application-aware processing was settled on the create path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AwarenessOutcome {
    /// VSS processing enabled with the credential for the matched domain.
    Enabled { domain: String },
    /// Windows guest whose hostname matched no configured domain; awareness
    /// left disabled, job creation still succeeds.
    SkippedDomainUnmatched,
    /// Non-Windows guest; awareness not applicable.
    NotWindows,
    /// Non-Windows guest that had integration on from a previous life; turned off.
    Disabled,
}

/// Per-machine result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created {
        defaulted_retention: bool,
        awareness: AwarenessOutcome,
    },
    NoChange,
    RetentionUpdated,
    EncryptionUpdated,
    RetentionAndEncryptionUpdated,
    SkippedNoBackup,
    Failed(String),
}

impl ReconcileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ReconcileOutcome::Failed(_))
    }
}

/// Aggregate result of one run: outcomes in processing order plus the
/// names that landed in the failure ledger.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub scope: String,
    pub outcomes: Vec<(String, ReconcileOutcome)>,
    pub failed: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: String, scope: String) -> Self {
        Self {
            run_id,
            scope,
            outcomes: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, machine: &str, outcome: ReconcileOutcome) {
        if outcome.is_failed() {
            self.failed.push(machine.to_string());
        }
        self.outcomes.push((machine.to_string(), outcome));
    }

    pub fn outcome_for(&self, machine: &str) -> Option<&ReconcileOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == machine)
            .map(|(_, o)| o)
    }
}
