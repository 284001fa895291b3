pub mod chat;
pub mod migrate;

use std::path::PathBuf;

use shopmate_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

pub fn load_options(
    config_path: Option<PathBuf>,
    database_url: Option<String>,
    log_level: Option<String>,
) -> LoadOptions {
    LoadOptions {
        config_path,
        require_file: false,
        overrides: ConfigOverrides { database_url, log_level, ..ConfigOverrides::default() },
    }
}

pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
