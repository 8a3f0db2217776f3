use anyhow::Result;
use tracing::info;
use tress_core::load_config;
use tress_core::tracing::init_tracing_from_config;
use tress_fleet::service::FleetBootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("TRESS_CONFIG").ok();
    let app_config = load_config(config_path.as_deref());
    init_tracing_from_config(Some(&app_config.logging));

    info!(
        service = %app_config.service.name,
        version = %app_config.service.version,
        "Loaded configuration"
    );

    FleetBootstrap::run(app_config).await
}
