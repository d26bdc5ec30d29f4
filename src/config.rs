//! Runtime configuration, read from the environment once at startup

use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};
use crate::signature::WebhookSecret;
use crate::webhook::BranchFilter;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_DEPLOY_SCRIPT: &str = "deploy.sh";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_host: String,
    pub port: u16,
    pub webhook_secret: WebhookSecret,
    pub deploy_script: PathBuf,
    pub deploy_branches: BranchFilter,
}

impl RelayConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_secret = lookup("WEBHOOK_SECRET")
            .filter(|s| !s.is_empty())
            .map(WebhookSecret::new)
            .ok_or_else(|| {
                RelayError::ConfigError("WEBHOOK_SECRET environment variable not set".to_string())
            })?;

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                RelayError::ConfigError(format!("Invalid PORT '{}': {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let bind_host = lookup("BIND_HOST").unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let deploy_script = match lookup("DEPLOY_SCRIPT") {
            Some(path) => PathBuf::from(path),
            None => default_deploy_script()?,
        };

        let deploy_branches = lookup("DEPLOY_BRANCHES")
            .map(|list| BranchFilter::parse(&list))
            .unwrap_or_default();

        Ok(Self {
            bind_host,
            port,
            webhook_secret,
            deploy_script,
            deploy_branches,
        })
    }

    /// Address the HTTP listener binds to, e.g. `0.0.0.0:3000`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// `deploy.sh` in the directory of the running executable
fn default_deploy_script() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(DEFAULT_DEPLOY_SCRIPT))
}
