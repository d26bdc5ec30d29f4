pub mod api;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod signature;
pub mod webhook;

use std::sync::Arc;

pub use api::create_router;
pub use config::RelayConfig;
use deploy::DeploymentRunner;

pub struct AppState {
    pub config: RelayConfig,
    pub runner: Arc<dyn DeploymentRunner>,
}

impl AppState {
    pub fn new(config: RelayConfig, runner: Arc<dyn DeploymentRunner>) -> Self {
        Self { config, runner }
    }
}

pub type SharedState = Arc<AppState>;
