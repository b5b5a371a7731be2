use anyhow::Context;

use pinledger_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pinledger_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = pinledger_api::app::services::build_services(&config)
        .await
        .context("failed to initialise stores")?;

    let app = pinledger_api::app::build_app(services.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.close().await;
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
