use doorman_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    doorman_observability::init();

    // Missing JWT_SECRET outside development is a startup failure, not a
    // silent fallback.
    let config = AppConfig::from_env()?;

    let app = doorman_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
