use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory for the failure ledger and per-incident logs.
    pub ledger_dir: PathBuf,
    /// Wait after creating a repository before re-fetching it (the backing
    /// service is eventually consistent).
    pub settle_wait: Duration,
    /// Pause after a per-machine failure before the next machine.
    pub failure_backoff: Duration,
    /// Overall run deadline; machines not reached by then are left for the
    /// next scheduled run.
    pub run_deadline: Duration,
    /// Descriptive label of the pre-provisioned encryption key.
    pub encryption_key_label: String,
    /// Inventory name of the VM this reconciler runs on; anchors the
    /// datacenter scope walk.
    pub local_host: String,
    /// Site whose repository server is picked at random from the pool.
    pub random_pool_site: String,
    pub random_pool_servers: Vec<String>,
    /// Suffix appended to the site code everywhere else.
    pub derived_key_suffix: String,
    /// Guest domain suffix -> credential name, for VSS processing.
    pub domain_credentials: Vec<(String, String)>,
    /// Fixed RNG seed; unset means entropy.
    pub seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            ledger_dir: PathBuf::from(
                std::env::var("RECONCILER_LEDGER_DIR").unwrap_or_else(|_| "./ledger".into()),
            ),
            settle_wait: Duration::from_secs(env_u64("RECONCILER_SETTLE_WAIT_SECS", 20)),
            failure_backoff: Duration::from_secs(env_u64("RECONCILER_FAILURE_BACKOFF_SECS", 5)),
            run_deadline: Duration::from_secs(env_u64("RECONCILER_RUN_DEADLINE_SECS", 3600)),
            encryption_key_label: std::env::var("RECONCILER_ENCRYPTION_KEY_LABEL")
                .unwrap_or_else(|_| "Fleet backup encryption".into()),
            local_host: std::env::var("RECONCILER_LOCAL_HOST").unwrap_or_else(|_| "recon01".into()),
            random_pool_site: std::env::var("RECONCILER_RANDOM_POOL_SITE")
                .unwrap_or_else(|_| "hq".into()),
            random_pool_servers: env_list(
                "RECONCILER_RANDOM_POOL_SERVERS",
                "hq-bck01,hq-bck02,hq-bck03",
            ),
            derived_key_suffix: std::env::var("RECONCILER_DERIVED_KEY_SUFFIX")
                .unwrap_or_else(|_| "-bck01".into()),
            domain_credentials: env_pairs(
                "RECONCILER_DOMAINS",
                "corp.example.com=svc-backup-corp,dmz.example.com=svc-backup-dmz",
            ),
            seed: std::env::var("RECONCILER_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_pairs(key: &str, default: &str) -> Vec<(String, String)> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_pairs_parses_table() {
        let pairs = env_pairs("RECONCILER_TEST_UNSET_DOMAINS", "a.example=cred-a,b.example=cred-b");
        assert_eq!(
            pairs,
            vec![
                ("a.example".to_string(), "cred-a".to_string()),
                ("b.example".to_string(), "cred-b".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_list_skips_empty_entries() {
        let list = env_list("RECONCILER_TEST_UNSET_SERVERS", "one, two,,three ");
        assert_eq!(list, vec!["one", "two", "three"]);
    }
}
