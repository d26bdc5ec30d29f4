use std::path::PathBuf;
use std::sync::Arc;

use deploy_hook::deploy::ScriptRunner;
use deploy_hook::logging::{FileLogger, setup_logging};
use deploy_hook::{AppState, RelayConfig, create_router};
use tracing::{self, error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = std::env::var_os("LOG_DIR").map(|dir| FileLogger::new(PathBuf::from(dir)));
    // Held until exit so buffered file logs get flushed
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let listen_address = config.listen_address();
    let runner = Arc::new(ScriptRunner::new(config.deploy_script.clone()));
    info!("Using deployment script at {:?}", runner.script());
    if !config.deploy_branches.branches().is_empty() {
        info!("Deploying only branches {:?}", config.deploy_branches.branches());
    }

    let state = Arc::new(AppState::new(config, runner));
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&listen_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", listen_address, e);
            std::process::exit(1);
        }
    };
    info!("Webhook listener running on {}", listen_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
