//! Append-only failure records for one reconciliation run.
//!
//! Two artifacts per run: a batch ledger (`failures-<run_id>.log`, one
//! tab-separated line per failed machine) and a per-incident detail file
//! under `incidents/`. Both are plain text; failures are discovered after
//! the fact, never surfaced synchronously.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub struct RunLedger {
    run_id: String,
    ledger_path: PathBuf,
    incidents_dir: PathBuf,
    entries: u32,
}

impl RunLedger {
    /// Prepare the ledger directories for a new run. The batch file itself
    /// is only created on the first failure, so a clean run leaves no ledger.
    pub fn new(dir: &std::path::Path) -> std::io::Result<Self> {
        let incidents_dir = dir.join("incidents");
        std::fs::create_dir_all(&incidents_dir)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        Ok(Self {
            ledger_path: dir.join(format!("failures-{run_id}.log")),
            incidents_dir,
            run_id,
            entries: 0,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn entry_count(&self) -> u32 {
        self.entries
    }

    /// Record one machine failure: a batch line plus an incident detail file.
    pub fn record_failure(&mut self, machine: &str, detail: &str) -> std::io::Result<()> {
        let now = chrono::Utc::now();
        let stamp = now.to_rfc3339();

        let mut ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        writeln!(ledger, "{stamp}\t{machine}\t{detail}")?;

        let incident_name = format!("{machine}-{}.log", now.format("%Y-%m-%d_%H-%M-%S"));
        let mut incident = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.incidents_dir.join(incident_name))?;
        writeln!(incident, "run: {}", self.run_id)?;
        writeln!(incident, "machine: {machine}")?;
        writeln!(incident, "time: {stamp}")?;
        writeln!(incident, "detail: {detail}")?;

        self.entries += 1;
        Ok(())
    }
}
