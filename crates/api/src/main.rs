use adportal_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    adportal_observability::init();

    let config = AppConfig::from_env()?;
    let bind = config.bind;
    let app = adportal_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
