use anyhow::{Context, Result};

use shopmate_core::config::{AppConfig, LoadOptions};
use shopmate_db::{connect_with_settings, migrations};

pub fn run(options: LoadOptions) -> Result<()> {
    let config = AppConfig::load(options).context("loading configuration")?;
    super::init_logging(&config);

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .context("connecting to database")?;

        migrations::run_pending(&pool).await.context("applying migrations")?;
        tracing::info!(event_name = "cli.migrations_applied", url = %config.database.url, "migrations applied");
        println!("migrations applied to {}", config.database.url);
        Ok(())
    })
}
