/// Run-level failure: nothing was (or will be) processed.
#[derive(thiserror::Error, Debug)]
pub enum FatalRunError {
    #[error("could not resolve datacenter scope for local host '{host}': {detail}")]
    ScopeResolution { host: String, detail: String },

    /// Raised by live site wiring when authenticating to the platforms
    /// fails; the engine itself never connects, so nothing in this crate
    /// constructs it.
    #[error("session bootstrap failed: {0}")]
    SessionBootstrap(String),

    #[error("inventory query failed before processing began: {0}")]
    Inventory(anyhow::Error),

    #[error("failure ledger unavailable: {0}")]
    Ledger(#[from] std::io::Error),
}

/// Per-machine failure, caught at the machine boundary.
///
/// The batch continues past these; they end up in the failure ledger.
/// "Not found" results from the platform are ordinary data (`Option`), not
/// errors — only genuinely exceptional conditions land here.
#[derive(thiserror::Error, Debug)]
pub enum MachineError {
    #[error("repository '{name}' could not be created or confirmed")]
    RepositoryCreate { name: String },

    #[error("encryption key '{label}' not found in backup service")]
    EncryptionKeyMissing { label: String },

    #[error("job option write failed for '{job}': {detail}")]
    JobOptionWrite { job: String, detail: String },

    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_error_from_anyhow() {
        let err: MachineError = anyhow::anyhow!("backing service unreachable").into();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_scope_error_names_host() {
        let err = FatalRunError::ScopeResolution {
            host: "recon01".into(),
            detail: "no root-adjacent ancestor".into(),
        };
        assert!(err.to_string().contains("recon01"));
    }
}
