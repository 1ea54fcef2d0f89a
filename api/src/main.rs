use std::{net::SocketAddr, sync::Arc};

use gadget_shop::{
    auth::JwtKeys, config::Config, rest, store::mongo::MongoStore, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "gadget_shop=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let store = Arc::new(MongoStore::connect(&config.mongodb_uri, &config.db_name).await?);

    // Requests that do not touch the database keep working if this fails.
    let prepare = store.clone();
    tokio::spawn(async move {
        match prepare.prepare().await {
            Ok(()) => tracing::info!("database connected successfully"),
            Err(e) => tracing::error!("database setup failed: {}", e),
        }
    });

    let app_state = AppState {
        users: store.clone(),
        products: store,
        keys: JwtKeys::from_secret(config.token_secret.as_bytes()),
        page_size: config.page_size,
    };

    let app = rest::app(app_state, &config.cors_origins);
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("gadget shop is running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
