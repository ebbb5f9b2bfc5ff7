use drawsync::config::ServerConfig;
use drawsync::routes;
use drawsync::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Missing .env is fine; the process environment still applies.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env loaded");
    }

    let config = ServerConfig::from_env().expect("invalid server configuration");
    let bind_addr = config.bind_addr;
    tracing::info!(
        %bind_addr,
        default_room = %config.default_room,
        client_channel_capacity = config.client_channel_capacity,
        "configuration loaded"
    );

    let app = routes::app(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("failed to bind");

    tracing::info!(%bind_addr, "drawsync listening");
    axum::serve(listener, app).await.expect("server failed");
}
