use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Reads one setting by key. `Settings::load` uses the process environment;
/// tests pass a map instead.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn get_env(lookup: Lookup, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_env_bool(lookup: Lookup, key: &str, default: bool) -> bool {
    match get_env(lookup, key) {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
    }
}

fn get_env_u16(lookup: Lookup, key: &str, default: u16) -> Result<u16> {
    match get_env(lookup, key) {
        None => Ok(default),
        Some(v) => Ok(v
            .parse::<u16>()
            .map_err(|e| anyhow!("{key} invalid port: {e}"))?),
    }
}

fn get_env_string(lookup: Lookup, key: &str, default: &str) -> String {
    get_env(lookup, key).unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub run_mode: String, // serve|summary

    // Artifacts
    pub repo_root: PathBuf,

    // Dashboard
    pub dashboard_host: String,
    pub dashboard_port: u16,
    pub dashboard_open_browser: bool,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let s = Self {
            run_mode: get_env_string(lookup, "RUN_MODE", "serve").to_lowercase(),
            repo_root: PathBuf::from(get_env_string(lookup, "REPO_ROOT", ".")),
            dashboard_host: get_env_string(lookup, "DASHBOARD_HOST", "127.0.0.1"),
            dashboard_port: get_env_u16(lookup, "DASHBOARD_PORT", 3000)?,
            dashboard_open_browser: get_env_bool(lookup, "DASHBOARD_OPEN_BROWSER", false),
        };

        s.validate()?;
        Ok(s)
    }

    pub fn dashboard_url(&self) -> String {
        format!("http://{}:{}/", self.dashboard_host, self.dashboard_port)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.run_mode.as_str(), "serve" | "summary") {
            return Err(anyhow!("RUN_MODE must be serve|summary (got {})", self.run_mode));
        }
        if self.repo_root.as_os_str().is_empty() {
            return Err(anyhow!("REPO_ROOT is empty"));
        }
        if self.dashboard_host.trim().is_empty() {
            return Err(anyhow!("DASHBOARD_HOST is empty"));
        }
        if self.dashboard_port == 0 {
            return Err(anyhow!("DASHBOARD_PORT must be >= 1 (got 0)"));
        }
        Ok(())
    }
}
