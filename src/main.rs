use anyhow::Result;
use tracing_subscriber::EnvFilter;

use qcm_engine::app::App;
use qcm_engine::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Chargement de la configuration
    let config = Config::from_env();

    // Initialisation des journaux, RUST_LOG prioritaire
    let niveau_defaut = if config.verbose_logging { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(niveau_defaut)),
        )
        .init();

    // Initialisation et exécution de l'application
    App::initialize(config)?.run().await?;

    Ok(())
}
