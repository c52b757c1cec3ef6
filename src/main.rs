use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use gateway_bridge as bridge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = bridge::config::load_config().context("failed to load configuration")?;
    bridge::config::init_tracing(cfg.log_level(), cfg.log_json);
    bridge::handlers::health::init_start_time();

    if cfg.webhook_secret.is_none() {
        warn!("APP__WEBHOOK_SECRET not set; webhook signatures will not be verified");
    }

    let processor = bridge::processor::HttpProcessorClient::from_config(&cfg)
        .context("failed to build payment processor client")?;
    let store = Arc::new(bridge::store::InMemoryStore::new());
    let app_state = bridge::AppState::new(cfg.clone(), store, Arc::new(processor));

    let cors_layer = if cfg.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    let app = bridge::handlers::app_router(app_state).layer(cors_layer);

    let host: std::net::IpAddr = cfg
        .host
        .parse()
        .with_context(|| format!("invalid host address '{}'", cfg.host))?;
    let addr = SocketAddr::from((host, cfg.port));
    info!("gateway-bridge listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
