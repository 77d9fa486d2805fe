// Shell configuration, read from the environment.
//
// Responsibilities
// - One place that knows the variable names; the library itself never reads
//   the environment.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Base URL of the brew-log backend.
    pub backend_url: String,
    /// Where the draft queue document lives.
    pub drafts_path: PathBuf,
    /// How often the reachability probe runs.
    pub probe_interval: Duration,
    /// Per-request timeout for the HTTP adapter.
    pub http_timeout: Duration,
}

impl ShellConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine; real environments set variables directly.
        let _ = dotenvy::dotenv();

        Ok(Self {
            backend_url: std::env::var("BREW_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            drafts_path: std::env::var("BREW_DRAFTS_PATH")
                .unwrap_or_else(|_| "brew_drafts.json".to_string())
                .into(),
            probe_interval: Duration::from_secs(parse_var("BREW_PROBE_INTERVAL_SECS", 30)?),
            http_timeout: Duration::from_secs(parse_var("BREW_HTTP_TIMEOUT_SECS", 10)?),
        })
    }
}

fn parse_var(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} must be a number of seconds: {e}")),
        Err(_) => Ok(default),
    }
}
