use std::sync::Arc;

use flowroute::config::AppConfig;
use flowroute::db::init_pool;
use flowroute::error::AppError;
use flowroute::realtime::{Broadcaster, TripRegistry};
use flowroute::routes::create_router;
use flowroute::services::{mailer::MailerService, storage::StorageService};
use flowroute::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(AppError::Other(err.into()));
    }

    let storage = StorageService::new(config.avatar_root.clone());
    storage.ensure_structure().await?;

    let mailer = MailerService::new();
    let registry = Arc::new(TripRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new());

    let state = AppState::new(config, db, storage, mailer, registry, broadcaster);

    let app = create_router(state.clone());

    let listener = TcpListener::bind(state.config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,flowroute=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
