use std::path::Path;

use anyhow::Context;
use exam_utils::ContentBundle;
use prep_backend::{AppState, config::Config, db::Db, router, shutdown_signal};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Ok(path) = dotenv {
        log::info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;

    log::info!("Opening database at {}", config.database_path);
    let db = Db::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path))?;

    if let Some(path) = &config.seed_file {
        seed(&db, path).await?;
    }

    let address = format!("0.0.0.0:{}", config.port);
    let app = router(AppState::new(db, config));

    log::info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    log::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn seed(db: &Db, path: &Path) -> anyhow::Result<()> {
    log::info!("Importing content from {}", path.display());
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let bundle: ContentBundle = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a content bundle", path.display()))?;
    bundle.validate()?;
    db.import(bundle).await?;
    Ok(())
}
