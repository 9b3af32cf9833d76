use anyhow::{Context, Result};
use paystrata::{
    build_router,
    config::Config,
    handlers::AppState,
    services::*,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting Paystrata API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    let store = connect_store(&config).await?;
    let cache = Arc::new(CacheService::new(&config.redis_url, config.price_cache_ttl_secs).await?);
    let biller = Arc::new(BillerClient::new(
        &config.biller_base_url,
        config.biller_user_id.clone(),
        config.biller_api_key.clone(),
    )?);
    let prices = Arc::new(PriceService::new(
        &config.price_api_url,
        config.price_api_key.clone(),
        cache.clone(),
        config.price_cache_ttl_secs,
    )?);
    let auth = Arc::new(AuthService::new(
        store.clone(),
        &config.jwt_secret,
        config.jwt_expiry_hours,
    ));
    let analytics = Arc::new(AnalyticsService::new(store.clone(), config.profit_margin));

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        auth.ensure_admin(email, password)
            .await
            .context("Failed to provision admin account")?;
    }

    let state = AppState {
        store: store.clone(),
        cache,
        biller,
        prices,
        auth,
        analytics,
        settlement: Settlement::new(store),
    };

    let app = build_router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Admin dashboard socket: ws://{}/ws/admin/dashboard", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn connect_store(config: &Config) -> Result<Arc<dyn Store>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data will not persist");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PgStore::connect(url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    if config.run_migrations {
        store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    tracing::info!("Database connected");
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}
