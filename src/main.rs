use scim_sync::{api, config::Config, forward, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting SCIM sync service...");

    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    let forwarder = forward::from_config(&config.forward)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, forwarder);

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("SCIM sync listening on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  - GET|POST /scim/v2/Users, /scim/v2/Groups");
    tracing::info!("  - GET|PUT|PATCH|DELETE /scim/v2/Users/:id, /scim/v2/Groups/:id");
    tracing::info!("  - GET /health");

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scim_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
