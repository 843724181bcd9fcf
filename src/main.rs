use tracing::{info, warn};

use cabinet::{Cabinet, Config, UserRepository};

#[tokio::main]
async fn main() -> cabinet::Result<()> {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = cabinet::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        cabinet::logging::init_console_only(&config.logging.level);
    }

    info!("Cabinet - multi-tenant file store");

    let cabinet = Cabinet::open(config).await?;
    let files = cabinet.files();
    let admin_capability = &cabinet.config().admin.capability;

    let users = UserRepository::new(cabinet.db().pool()).count().await?;
    if users == 0 {
        warn!("No users registered yet");
    }

    info!(
        schema_version = cabinet.db().schema_version().await?,
        users,
        max_file_size = files.max_file_size(),
        admin_capability = %admin_capability,
        top_users_limit = cabinet.config().admin.top_users_limit,
        "Cabinet ready"
    );

    cabinet.close().await;
    Ok(())
}
