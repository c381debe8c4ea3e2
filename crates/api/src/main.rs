use anyhow::Context;

use gadgetbazar_api::app;
use gadgetbazar_infra::{services, AppConfig, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gadgetbazar_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = services::build_store(&config)
        .await
        .context("failed to open store")?;

    let app = app::build_app(Services::new(store), app::verifier_from_config(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
