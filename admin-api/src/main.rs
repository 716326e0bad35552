use std::sync::Arc;

use access_control::{MemorySessionStore, RedisSessionStore, SessionBackendKind, SessionStore};
use admin_api::config::Config;
use admin_api::db::{Database, PgUserDirectory};
use admin_api::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "admin_api=debug,access_control=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection
    let db = Database::connect(&config).await?;
    let directory = Arc::new(PgUserDirectory::new(&db));

    // Session backend
    let idle_timeout = config.session.idle_timeout();
    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackendKind::Memory => {
            let store = Arc::new(MemorySessionStore::new(idle_timeout));
            spawn_session_reaper(store.clone(), idle_timeout);
            store
        }
        SessionBackendKind::Redis => {
            Arc::new(RedisSessionStore::connect(&config.redis.url, idle_timeout).await?)
        }
    };
    tracing::info!(backend = ?config.session.backend, "Session store ready");

    let state = AppState::new(config.clone(), sessions, directory);
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_reaper(store: Arc<MemorySessionStore>, idle_timeout: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(idle_timeout);
        loop {
            interval.tick().await;
            store.purge_expired();
        }
    });
}
