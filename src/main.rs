use std::sync::Arc;

use supplier_api::core::auth::{
    AppState, AuthService, PasswordHasher, TokenManager, api_router,
};
use supplier_api::core::config::Config;
use supplier_api::core::db::{
    InMemoryUserStore, PgUserStore, UserStore, create_pool_with_migrations, health_check,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env()?;

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, jwt_secret={}, bootstrap_admin={}",
        config.has_database(),
        config.has_jwt_secret(),
        config.has_bootstrap_admin()
    );

    let token_config = config.token_config()?;

    let store: Arc<dyn UserStore> = match config.db_config() {
        Some(db_config) => {
            let pool = create_pool_with_migrations(&db_config).await?;
            health_check(&pool).await?;
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory and lost on restart");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let auth = AuthService::new(
        store,
        TokenManager::new(token_config),
        PasswordHasher::new(config.bcrypt_cost)?,
    )
    .with_store_timeout(config.store_timeout);

    if let (Some(email), Some(password)) = (
        &config.bootstrap_admin_email,
        &config.bootstrap_admin_password,
    ) {
        auth.ensure_bootstrap_admin(email, password).await?;
    }

    let app = api_router(AppState::new(auth));

    tracing::info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
